use serde::{Deserialize, Serialize};

/// What kind of element the combobox is attached to. Arrow keys only open the panel from a
/// single-line input; in a text area they keep moving the caret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    #[default]
    Input,
    TextArea,
}

/// The combobox's copy of the text input: its value and selection. Positions count chars.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    value: String,
    selection_start: usize,
    selection_end: usize,
}

impl TextField {
    pub fn new(value: &str) -> TextField {
        let mut field = TextField::default();
        field.set_value(value);
        field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.selection_start, self.selection_end)
    }

    pub fn has_selection(&self) -> bool {
        self.selection_start != self.selection_end
    }

    /// Like assigning to a DOM input's value, this leaves the caret at the end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        let len = self.len();
        self.set_selection(len, len);
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.len();
        self.selection_end = end.min(len);
        self.selection_start = start.min(self.selection_end);
    }

    pub fn collapse_to_start(&mut self) {
        self.selection_end = self.selection_start;
    }

    pub fn collapse_to_end(&mut self) {
        let len = self.len();
        self.set_selection(len, len);
    }

    /// The text before `pos`
    pub fn prefix(&self, pos: usize) -> String {
        self.value.chars().take(pos).collect()
    }

    /// Deletes the selected text. The caret ends up at the end of what's left.
    pub fn remove_selection(&mut self) {
        let value: String = self
            .value
            .chars()
            .enumerate()
            .filter(|(idx, _)| *idx < self.selection_start || *idx >= self.selection_end)
            .map(|(_, ch)| ch)
            .collect();
        self.set_value(&value);
    }
}
