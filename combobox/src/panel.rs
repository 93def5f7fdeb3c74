use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::Suggestion;

const DEFAULT_ROW_HEIGHT: f64 = 24.0;

/// A bounding box in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Identifies the combobox that put a panel up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerID(pub usize);

/// The floating list of options. There's at most one, living in the `Container`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub owner: OwnerID,
    pub class: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub options: Vec<PanelOption>,
    next_key: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanelOption {
    /// The host should reuse the element drawn for this key
    pub key: usize,
    pub value: String,
    pub label: String,
    pub title: Option<String>,
    pub selected: bool,
}

impl Panel {
    fn new(owner: OwnerID, class: String) -> Panel {
        Panel {
            owner,
            class,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            options: Vec::new(),
            next_key: 0,
        }
    }

    pub fn selected(&self) -> Option<&PanelOption> {
        self.options.iter().find(|x| x.selected)
    }

    // Options with the same value as before keep their key
    fn update_options(&mut self, suggestions: &[Suggestion], selected: Option<&str>) {
        let mut options = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let key = match self.options.iter().find(|x| x.value == suggestion.value) {
                Some(existing) => existing.key,
                None => {
                    self.next_key += 1;
                    self.next_key - 1
                }
            };
            options.push(PanelOption {
                key,
                value: suggestion.value.clone(),
                label: suggestion.label().to_string(),
                title: suggestion.title.clone(),
                selected: Some(suggestion.value.as_str()) == selected,
            });
        }
        self.options = options;
    }

    fn move_under(&mut self, anchor: Rect) {
        self.left = anchor.left + 5.0;
        self.width = anchor.width - 10.0;
        self.top = anchor.top + anchor.height;
    }
}

/// The element every combobox draws its panel into. Clones share the same state, so hand one to
/// each combobox. Only one panel is up at a time; showing a new one replaces the old.
#[derive(Clone)]
pub struct Container {
    shared: Rc<RefCell<Shared>>,
}

struct Shared {
    bounds: Rect,
    row_height: f64,
    panel: Option<Panel>,
    hide_at: Option<u64>,
    // Primary mousedowns across all comboboxes, to tell a double click from two single clicks
    mouse_downs: u64,
    next_owner: usize,
}

impl Container {
    pub fn new(bounds: Rect) -> Container {
        Container {
            shared: Rc::new(RefCell::new(Shared {
                bounds,
                row_height: DEFAULT_ROW_HEIGHT,
                panel: None,
                hide_at: None,
                mouse_downs: 0,
                next_owner: 0,
            })),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.shared.borrow().bounds
    }

    pub fn set_bounds(&self, bounds: Rect) {
        self.shared.borrow_mut().bounds = bounds;
    }

    /// How tall one option is drawn, to know when the panel overflows
    pub fn set_row_height(&self, row_height: f64) {
        self.shared.borrow_mut().row_height = row_height;
    }

    /// A copy of the panel to draw, if one is up
    pub fn panel(&self) -> Option<Panel> {
        self.shared.borrow().panel.clone()
    }

    pub fn is_showing(&self) -> bool {
        self.shared.borrow().panel.is_some()
    }

    /// Fires the delayed hide after a blur. True if the panel went away.
    pub fn tick(&self, now: u64) -> bool {
        let due = matches!(self.shared.borrow().hide_at, Some(at) if at <= now);
        if due {
            let had_panel = self.is_showing();
            self.hide();
            return had_panel;
        }
        false
    }

    /// Takes down the panel, no matter who owns it, and forgets any pending hide.
    pub fn hide(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.hide_at = None;
        shared.panel = None;
    }

    pub(crate) fn new_owner(&self) -> OwnerID {
        let mut shared = self.shared.borrow_mut();
        shared.next_owner += 1;
        OwnerID(shared.next_owner - 1)
    }

    pub(crate) fn owner(&self) -> Option<OwnerID> {
        self.shared.borrow().panel.as_ref().map(|x| x.owner)
    }

    pub(crate) fn show(&self, owner: OwnerID, class: String) {
        self.hide();
        self.shared.borrow_mut().panel = Some(Panel::new(owner, class));
    }

    /// Redraws the panel if `owner` has it
    pub(crate) fn render(
        &self,
        owner: OwnerID,
        suggestions: &[Suggestion],
        selected: Option<&str>,
        anchor: Rect,
    ) {
        let mut shared = self.shared.borrow_mut();
        if let Some(panel) = shared.panel.as_mut().filter(|x| x.owner == owner) {
            panel.update_options(suggestions, selected);
            panel.move_under(anchor);
        }
    }

    /// True if the panel reaches past the bottom of the container
    pub(crate) fn overflows(&self) -> bool {
        let shared = self.shared.borrow();
        let Some(panel) = &shared.panel else {
            return false;
        };
        let bottom = panel.top + panel.options.len() as f64 * shared.row_height;
        bottom > shared.bounds.bottom()
    }

    pub(crate) fn schedule_hide(&self, at: u64) {
        self.shared.borrow_mut().hide_at = Some(at);
    }

    pub(crate) fn mouse_downs(&self) -> u64 {
        self.shared.borrow().mouse_downs
    }

    pub(crate) fn record_mouse_down(&self) {
        self.shared.borrow_mut().mouse_downs += 1;
    }
}
