//! An autocompleting combobox for text inputs, without any rendering. The host forwards the
//! input's events, draws the panel described by the shared `Container`, and carries out the
//! queued `Effect`s.

mod fetch;
mod field;
mod panel;

use std::collections::{BTreeMap, HashMap};

use keyboard_types::{Key, NamedKey};

pub use fetch::{FetchRequest, Fetcher, FilterData, RequestID, Suggestion};
pub use field::{FieldKind, TextField};
pub use panel::{Container, OwnerID, Panel, PanelOption, Rect};

/// Clicks and blurs wait this long, so a double click or a click on an option can land first.
const DELAY_MS: u64 = 75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Auxiliary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Accept,
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComboEvent {
    /// `datum` is the fetched suggestion matching `value`, if there is one
    Accept {
        datum: Option<Suggestion>,
        value: String,
    },
    Cancel,
}

impl ComboEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ComboEvent::Accept { .. } => EventKind::Accept,
            ComboEvent::Cancel => EventKind::Cancel,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerID(usize);

/// Things only the host can do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Move keyboard focus to the input
    Focus,
    /// The input's value was replaced; fire a `change` event on it
    Change,
    /// The panel runs past the container; scroll the input (or alternate anchor) into the middle
    ScrollAnchorIntoView,
    /// Scroll the option with this value into view within the panel
    ScrollOptionIntoView(String),
}

/// How the host should treat the key event it just forwarded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyResponse {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

// What to do once a fetch's results show up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterFetch {
    Nothing,
    ShowAndRender,
    Change,
}

#[derive(Clone, Copy, Debug)]
struct Reopen {
    at: u64,
    // The shared mousedown count when this was scheduled
    mouse_downs: u64,
}

type Handler = Box<dyn FnMut(&ComboEvent)>;

pub struct Combobox {
    container: Container,
    owner: OwnerID,
    klass: Option<String>,
    kind: FieldKind,
    field: TextField,
    focused: bool,
    anchor: Rect,
    attach_to: Option<Rect>,

    suggestions: Vec<Suggestion>,
    // Every suggestion ever fetched, by value
    fetched: HashMap<String, Suggestion>,
    selected: Option<String>,

    can_autocomplete: bool,
    case_sensitive: bool,
    data: Vec<Suggestion>,
    fetcher: Box<dyn Fetcher>,
    min_items: usize,

    cancel_fetch: bool,
    next_request: usize,
    // Only requests since the latest fetch, so at most one
    pending: BTreeMap<RequestID, AfterFetch>,
    latest_request: Option<RequestID>,

    // After Backspace or Delete, the next input event only collapses the selection
    skip_next_input: bool,
    awaiting_mouse_up: bool,
    reopen: Option<Reopen>,

    listeners: Vec<(ListenerID, EventKind, Handler)>,
    next_listener: usize,
    effects: Vec<Effect>,
}

impl Combobox {
    pub fn new(container: &Container, kind: FieldKind) -> Combobox {
        Combobox {
            container: container.clone(),
            owner: container.new_owner(),
            klass: None,
            kind,
            field: TextField::default(),
            focused: false,
            anchor: Rect::default(),
            attach_to: None,

            suggestions: Vec::new(),
            fetched: HashMap::new(),
            selected: None,

            can_autocomplete: true,
            case_sensitive: false,
            data: Vec::new(),
            fetcher: Box::new(FilterData),
            min_items: 2,

            cancel_fetch: false,
            next_request: 0,
            pending: BTreeMap::new(),
            latest_request: None,

            skip_next_input: false,
            awaiting_mouse_up: false,
            reopen: None,

            listeners: Vec::new(),
            next_listener: 0,
            effects: Vec::new(),
        }
    }

    // Configuration

    pub fn can_autocomplete(&self) -> bool {
        self.can_autocomplete
    }

    pub fn set_can_autocomplete(&mut self, value: bool) -> &mut Self {
        self.can_autocomplete = value;
        self
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, value: bool) -> &mut Self {
        self.case_sensitive = value;
        self
    }

    /// The options `FilterData` picks from
    pub fn data(&self) -> &[Suggestion] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<Suggestion>) -> &mut Self {
        self.data = data;
        self
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn set_fetcher(&mut self, fetcher: impl Fetcher + 'static) -> &mut Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// With fewer suggestions than this, the panel stays hidden.
    pub fn min_items(&self) -> usize {
        self.min_items
    }

    pub fn set_min_items(&mut self, value: usize) -> &mut Self {
        self.min_items = value;
        self
    }

    pub fn class(&self) -> Option<&str> {
        self.klass.as_deref()
    }

    /// Adds `combobox-<klass>` to the panel's class
    pub fn set_class(&mut self, klass: impl Into<String>) -> &mut Self {
        self.klass = Some(klass.into());
        self
    }

    /// Where the input is on screen
    pub fn set_anchor(&mut self, rect: Rect) -> &mut Self {
        self.anchor = rect;
        self
    }

    /// Line the panel up under something other than the input
    pub fn set_attach_to(&mut self, rect: Option<Rect>) -> &mut Self {
        self.attach_to = rect;
        self
    }

    // State

    pub fn field(&self) -> &TextField {
        &self.field
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// The panel, if this combobox is the one showing it
    pub fn panel(&self) -> Option<Panel> {
        self.container.panel().filter(|x| x.owner == self.owner)
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // Subscriptions

    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&ComboEvent) + 'static,
    ) -> ListenerID {
        let id = ListenerID(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, kind, Box::new(handler)));
        id
    }

    /// True if the listener was there
    pub fn off(&mut self, id: ListenerID) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(x, _, _)| *x != id);
        self.listeners.len() != before
    }

    /// Stops handling the input, taking down the panel if this combobox put it up.
    pub fn detach(self) {}

    // Events from the input

    pub fn on_focus(&mut self) {
        self.focused = true;
        // Warm up the cache
        self.fetch(String::new(), AfterFetch::Nothing);
    }

    pub fn on_blur(&mut self, now: u64) {
        self.focused = false;
        // This might not accept anything; see `accept`
        self.accept(None, true);
        self.container.schedule_hide(now + DELAY_MS);
    }

    pub fn on_mouse_down(&mut self, button: MouseButton) {
        // Deselecting text doesn't count
        if button != MouseButton::Primary || self.field.has_selection() {
            return;
        }
        self.container.record_mouse_down();
        self.awaiting_mouse_up = true;
    }

    pub fn on_mouse_up(&mut self, button: MouseButton, now: u64) {
        if !self.awaiting_mouse_up {
            return;
        }
        self.awaiting_mouse_up = false;
        if button != MouseButton::Primary || self.field.has_selection() {
            return;
        }

        if self.container.is_showing() {
            self.hide();
        } else {
            self.reopen = Some(Reopen {
                at: now + DELAY_MS,
                mouse_downs: self.container.mouse_downs(),
            });
        }
    }

    /// The input's value changed, from typing or pasting. `selection` is where the selection is
    /// afterwards, in chars.
    pub fn on_input(&mut self, value: &str, selection: (usize, usize)) {
        self.field.set_value(value);
        self.field.set_selection(selection.0, selection.1);

        if self.skip_next_input {
            self.skip_next_input = false;
            self.field.collapse_to_start();
            return;
        }
        self.fetch(self.query(), AfterFetch::Change);
    }

    pub fn on_key_down(&mut self, key: &Key) -> KeyResponse {
        let mut response = KeyResponse::default();
        let Key::Named(key) = key else {
            return response;
        };
        match key {
            NamedKey::Backspace | NamedKey::Delete => {
                response.stop_propagation = true;
                self.selected = None;
                self.render();
                self.skip_next_input = true;
            }
            NamedKey::Tab => {
                response.stop_propagation = true;
                self.accept(None, false);
            }
            NamedKey::Enter => {
                response.prevent_default = true;
                response.stop_propagation = true;
            }
            NamedKey::ArrowUp | NamedKey::ArrowDown => {
                let shown = self.is_mine();
                if self.kind == FieldKind::TextArea && !shown {
                    return response;
                }
                response.prevent_default = true;
                if self.kind == FieldKind::Input && !shown {
                    self.show();
                }
                self.nav(if *key == NamedKey::ArrowUp { -1 } else { 1 });
            }
            _ => {}
        }
        response
    }

    pub fn on_key_up(&mut self, key: &Key) -> KeyResponse {
        match key {
            Key::Named(NamedKey::Escape) => self.cancel(),
            Key::Named(NamedKey::Enter) => self.accept(None, false),
            _ => {}
        }
        KeyResponse::default()
    }

    /// The user clicked an option in the panel
    pub fn on_option_click(&mut self, value: &str) {
        let Some(datum) = self.suggestions.iter().find(|x| x.value == value).cloned() else {
            log::warn!("Clicked on {value}, which isn't a current suggestion");
            return;
        };
        self.accept(Some(datum), false);
    }

    /// The page scrolled, so the panel has to follow the input
    pub fn on_scroll(&mut self) {
        if self.is_mine() {
            self.render();
        }
    }

    /// Fires timers that are due. `Container::tick` handles the delayed hide.
    pub fn tick(&mut self, now: u64) {
        if let Some(reopen) = self.reopen.filter(|x| x.at <= now) {
            self.reopen = None;
            // A newer mousedown means a double click, which shouldn't open anything
            if reopen.mouse_downs == self.container.mouse_downs() {
                self.focused = true;
                self.effects.push(Effect::Focus);
                self.fetch(String::new(), AfterFetch::ShowAndRender);
            }
        }
        self.container.tick(now);
    }

    /// Results for a request the fetcher didn't answer right away. Returns false if they were
    /// thrown out, because something was accepted or cancelled since, or because a newer request
    /// was made.
    pub fn deliver(&mut self, id: RequestID, results: Vec<Suggestion>) -> bool {
        let Some(after) = self.pending.remove(&id) else {
            log::warn!("Got results for {id:?}, which isn't pending");
            return false;
        };
        self.receive(id, after, results)
    }
}

impl Combobox {
    fn is_mine(&self) -> bool {
        self.container.owner() == Some(self.owner)
    }

    // The query, ignoring anything from the start of the selection on
    fn query(&self) -> String {
        let (start, end) = self.field.selection();
        if start > 0 && end > 0 {
            self.field.prefix(start)
        } else {
            self.field.value().to_string()
        }
    }

    fn fetch(&mut self, query: String, after: AfterFetch) {
        self.cancel_fetch = false;
        let request = FetchRequest {
            id: RequestID(self.next_request),
            query,
        };
        self.next_request += 1;
        // Anything still outstanding is stale now
        self.pending.clear();
        self.latest_request = Some(request.id);

        match self.fetcher.fetch(&request, &self.data) {
            Some(results) => {
                self.receive(request.id, after, results);
            }
            None => {
                self.pending.insert(request.id, after);
            }
        }
    }

    fn receive(&mut self, id: RequestID, after: AfterFetch, results: Vec<Suggestion>) -> bool {
        // Already chose a value, don't overwrite or autocomplete it
        if self.cancel_fetch {
            log::debug!("Dropping results for {id:?}, the fetch was cancelled");
            return false;
        }
        if self.latest_request != Some(id) {
            log::debug!("Dropping results for {id:?}, a newer request was made");
            return false;
        }

        for suggestion in &results {
            self.fetched
                .insert(suggestion.value.clone(), suggestion.clone());
        }
        self.suggestions = results;

        match after {
            AfterFetch::Nothing => {}
            AfterFetch::ShowAndRender => {
                self.show();
                self.render();
            }
            AfterFetch::Change => self.after_change(),
        }
        true
    }

    fn after_change(&mut self) {
        self.selected = None;
        if !self.suggestions.is_empty() {
            if self.field.selection().1 == self.field.len() {
                self.selected = self.try_autocomplete();
            }
            if self.selected.is_none() {
                self.selected = Some(self.field.value().to_string());
            }
        }

        if self.field.is_empty() {
            self.hide();
        } else if !self.is_mine() {
            self.show();
        }
        self.render();
    }

    fn try_autocomplete(&mut self) -> Option<String> {
        if !self.can_autocomplete {
            return None;
        }
        let query = self.query();
        let typed = if self.case_sensitive {
            query.clone()
        } else {
            query.to_lowercase()
        };
        if typed.is_empty() {
            return None;
        }
        // Don't clobber someone typing a number
        if typed.trim().parse::<f64>().is_ok_and(|x| x.is_finite()) {
            return None;
        }

        let mut best = None;
        for suggestion in &self.suggestions {
            let compare = if self.case_sensitive {
                suggestion.value.clone()
            } else {
                suggestion.value.to_lowercase()
            };
            if compare == typed {
                best = Some(suggestion);
                break;
            } else if best.is_none() && compare.starts_with(&typed) {
                best = Some(suggestion);
            }
        }

        let value = best?.value.clone();
        self.field.set_value(&value);
        // Highlight the completed part, so typing replaces it
        self.field
            .set_selection(query.chars().count(), value.chars().count());
        Some(value)
    }

    fn nav(&mut self, dir: isize) {
        if !self.suggestions.is_empty() {
            let current = self
                .suggestions
                .iter()
                .position(|x| Some(&x.value) == self.selected.as_ref())
                .map_or(-1, |idx| idx as isize);
            let idx = (current + dir).clamp(0, self.suggestions.len() as isize - 1) as usize;
            let value = self.suggestions[idx].value.clone();
            self.field.set_value(&value);
            self.selected = Some(value);
        }
        self.render();
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        if !self.is_mine() {
            return;
        }
        if self.container.overflows() {
            self.effects.push(Effect::ScrollAnchorIntoView);
            self.render();
        }
        if let Some(option) = self.panel().as_ref().and_then(|x| x.selected()) {
            self.effects
                .push(Effect::ScrollOptionIntoView(option.value.clone()));
        }
    }

    fn show(&mut self) {
        let class = match &self.klass {
            Some(klass) => format!("combobox combobox-{klass}"),
            None => "combobox".to_string(),
        };
        self.container.show(self.owner, class);
    }

    fn hide(&mut self) {
        self.container.hide();
    }

    fn render(&mut self) {
        if self.suggestions.len() < self.min_items || !self.focused {
            self.hide();
            return;
        }
        self.container.render(
            self.owner,
            &self.suggestions,
            self.selected.as_deref(),
            self.attach_to.unwrap_or(self.anchor),
        );
    }

    /// With a `datum`, the user picked it. Otherwise the current value is accepted, but from a
    /// blur only if it matches something fetched, since the combobox might be brand new and not
    /// know anything yet.
    fn accept(&mut self, datum: Option<Suggestion>, on_blur: bool) {
        self.cancel_fetch = true;

        if let Some(datum) = datum {
            self.field.set_value(&datum.value);
            self.effects.push(Effect::Change);
        }
        self.field.collapse_to_end();

        let value = self.field.value().to_string();
        let datum = self.fetched.get(&value).cloned();
        if on_blur && datum.is_none() {
            return;
        }

        self.emit(ComboEvent::Accept { datum, value });
        self.hide();
    }

    fn cancel(&mut self) {
        self.cancel_fetch = true;
        self.field.remove_selection();
        self.emit(ComboEvent::Cancel);
        self.hide();
    }

    fn emit(&mut self, event: ComboEvent) {
        let kind = event.kind();
        for (_, listens_for, handler) in &mut self.listeners {
            if *listens_for == kind {
                handler(&event);
            }
        }
    }
}

impl Drop for Combobox {
    fn drop(&mut self) {
        if self.is_mine() {
            self.container.hide();
        }
    }
}
