//! In-memory document.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use tabshell_nav::TabId;

use crate::document::{Document, Handler, Selector};

/// Observable change made to a [`HeadlessDocument`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomEvent {
    LoadingShown,
    LoadingHidden,
    PanelCleared(TabId),
    PanelMounted(TabId),
    PanelActivated(TabId),
    PanelDeactivated(TabId),
    IndicatorActivated(TabId),
    ErrorShown(String),
    ErrorCleared,
    Scrolled(String),
    Focused(Selector),
}

/// Where an element lives: the static page chrome or a tab panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Chrome,
    Panel(TabId),
}

struct Listener {
    selector: Selector,
    event: String,
    key: String,
    scope: Scope,
    handler: Handler,
}

#[derive(Default)]
struct Panel {
    markup: String,
    active: bool,
}

#[derive(Default)]
struct State {
    loading: bool,
    panels: BTreeMap<TabId, Panel>,
    indicators: BTreeSet<TabId>,
    error: Option<String>,
    texts: HashMap<String, String>,
    hidden: HashSet<String>,
    focused: Option<Selector>,
    listeners: Vec<Listener>,
    events: Vec<DomEvent>,
}

/// Document kept entirely in memory.
///
/// Elements are found by scanning markup for `id="…"`, `class="…"` and
/// `data-tab-id="…"` attributes, which is enough to drive the shell without a
/// browser. Every mutation is recorded as a [`DomEvent`] so ordering can be
/// asserted.
pub struct HeadlessDocument {
    chrome: String,
    state: RefCell<State>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDocument {
    /// Create a document whose chrome holds a tab menu entry for every tab.
    #[must_use]
    pub fn new() -> Self {
        let mut chrome = String::from("<nav id=\"tab-menu\">");
        for tab in TabId::ALL {
            let _ = write!(
                chrome,
                "<a class=\"tab-menu-option\" data-tab-id=\"{tab}\" tabindex=\"0\">{tab}</a>"
            );
        }
        chrome.push_str("</nav><div id=\"loading\" class=\"hidden\"></div>");
        Self::with_chrome(chrome)
    }

    /// Create a document with custom chrome markup (everything outside panels).
    #[must_use]
    pub fn with_chrome(chrome: impl Into<String>) -> Self {
        Self {
            chrome: chrome.into(),
            state: RefCell::new(State::default()),
        }
    }

    /// Whether the loading overlay is visible.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Tabs whose panel carries the `active` class.
    #[must_use]
    pub fn active_panels(&self) -> Vec<TabId> {
        self.state
            .borrow()
            .panels
            .iter()
            .filter(|(_, panel)| panel.active)
            .map(|(tab, _)| *tab)
            .collect()
    }

    /// Current markup of a panel, `None` if empty.
    #[must_use]
    pub fn panel_markup(&self, tab: TabId) -> Option<String> {
        self.state
            .borrow()
            .panels
            .get(&tab)
            .map(|panel| panel.markup.clone())
            .filter(|markup| !markup.is_empty())
    }

    /// Tabs whose indicators carry the `active` class.
    #[must_use]
    pub fn active_indicators(&self) -> Vec<TabId> {
        self.state.borrow().indicators.iter().copied().collect()
    }

    /// Message of the visible error banner.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    #[must_use]
    pub fn focused(&self) -> Option<Selector> {
        self.state.borrow().focused.clone()
    }

    /// Text content set on an element that still exists.
    #[must_use]
    pub fn text(&self, element_id: &str) -> Option<String> {
        if !self.contains(&Selector::id(element_id)) {
            return None;
        }
        self.state.borrow().texts.get(element_id).cloned()
    }

    /// Whether an element exists and has not been hidden.
    #[must_use]
    pub fn is_visible(&self, element_id: &str) -> bool {
        self.contains(&Selector::id(element_id)) && !self.state.borrow().hidden.contains(element_id)
    }

    /// Number of live listeners bound under `key`.
    #[must_use]
    pub fn listener_count(&self, key: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.key == key)
            .count()
    }

    /// All recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DomEvent> {
        self.state.borrow().events.clone()
    }

    /// Drain recorded events.
    pub fn take_events(&self) -> Vec<DomEvent> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }

    /// Fire `event` on every element matching `selector`.
    ///
    /// Returns the number of handlers invoked. Handlers run after the internal
    /// state is released, so they may call back into the document.
    pub fn dispatch(&self, selector: &Selector, event: &str) -> usize {
        let handlers: Vec<Handler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.selector == *selector && l.event == event)
            .map(|l| Rc::clone(&l.handler))
            .collect();

        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    /// Fire a click on every element matching `selector`.
    pub fn click(&self, selector: &Selector) -> usize {
        self.dispatch(selector, "click")
    }

    /// Whether any element matches `selector`.
    #[must_use]
    pub fn contains(&self, selector: &Selector) -> bool {
        !self.matching_scopes(selector).is_empty()
    }

    fn matching_scopes(&self, selector: &Selector) -> Vec<Scope> {
        let mut scopes = Vec::new();
        if markup_matches(&self.chrome, selector) {
            scopes.push(Scope::Chrome);
        }
        if !matches!(selector, Selector::MenuItem(_)) {
            let state = self.state.borrow();
            scopes.extend(
                state
                    .panels
                    .iter()
                    .filter(|(_, panel)| markup_matches(&panel.markup, selector))
                    .map(|(tab, _)| Scope::Panel(*tab)),
            );
        }
        scopes
    }

    fn record(&self, event: DomEvent) {
        self.state.borrow_mut().events.push(event);
    }

    fn drop_panel_listeners(state: &mut State, tab: TabId) {
        state.listeners.retain(|l| l.scope != Scope::Panel(tab));
    }
}

/// Whether `markup` contains an element matching `selector`.
fn markup_matches(markup: &str, selector: &Selector) -> bool {
    match selector {
        Selector::Id(id) => markup.contains(&format!("id=\"{id}\"")),
        Selector::Class(class) => has_class(markup, class),
        Selector::MenuItem(tab) => {
            has_class(markup, "tab-menu-option") && markup.contains(&format!("data-tab-id=\"{tab}\""))
        }
    }
}

fn has_class(markup: &str, class: &str) -> bool {
    markup
        .split("class=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .any(|classes| classes.split_whitespace().any(|c| c == class))
}

impl Document for HeadlessDocument {
    fn set_loading_visible(&self, visible: bool) {
        let mut state = self.state.borrow_mut();
        if state.loading == visible {
            return;
        }
        state.loading = visible;
        state.events.push(if visible {
            DomEvent::LoadingShown
        } else {
            DomEvent::LoadingHidden
        });
    }

    fn clear_panel(&self, tab: TabId) {
        let mut state = self.state.borrow_mut();
        state.panels.entry(tab).or_default().markup.clear();
        Self::drop_panel_listeners(&mut state, tab);
        state.events.push(DomEvent::PanelCleared(tab));
    }

    fn mount_panel(&self, tab: TabId, markup: &str) {
        let mut state = self.state.borrow_mut();
        markup.clone_into(&mut state.panels.entry(tab).or_default().markup);
        Self::drop_panel_listeners(&mut state, tab);
        state.events.push(DomEvent::PanelMounted(tab));
    }

    fn set_panel_active(&self, tab: TabId, active: bool) {
        let mut state = self.state.borrow_mut();
        state.panels.entry(tab).or_default().active = active;
        state.events.push(if active {
            DomEvent::PanelActivated(tab)
        } else {
            DomEvent::PanelDeactivated(tab)
        });
    }

    fn clear_indicators(&self) {
        self.state.borrow_mut().indicators.clear();
    }

    fn set_indicator_active(&self, tab: TabId) {
        let mut state = self.state.borrow_mut();
        state.indicators.insert(tab);
        state.events.push(DomEvent::IndicatorActivated(tab));
    }

    fn show_error(&self, message: &str) {
        let mut state = self.state.borrow_mut();
        state.error = Some(message.to_owned());
        state.events.push(DomEvent::ErrorShown(message.to_owned()));
    }

    fn clear_error(&self) {
        let mut state = self.state.borrow_mut();
        if state.error.take().is_some() {
            state.events.push(DomEvent::ErrorCleared);
        }
    }

    fn scroll_into_view(&self, element_id: &str) -> bool {
        if !self.contains(&Selector::id(element_id)) {
            return false;
        }
        self.record(DomEvent::Scrolled(element_id.to_owned()));
        true
    }

    fn focus(&self, selector: &Selector) -> bool {
        if !self.contains(selector) {
            return false;
        }
        let mut state = self.state.borrow_mut();
        state.focused = Some(selector.clone());
        state.events.push(DomEvent::Focused(selector.clone()));
        true
    }

    fn set_text(&self, element_id: &str, text: &str) -> bool {
        if !self.contains(&Selector::id(element_id)) {
            return false;
        }
        self.state
            .borrow_mut()
            .texts
            .insert(element_id.to_owned(), text.to_owned());
        true
    }

    fn append_text(&self, element_id: &str, text: &str) -> bool {
        if !self.contains(&Selector::id(element_id)) {
            return false;
        }
        self.state
            .borrow_mut()
            .texts
            .entry(element_id.to_owned())
            .or_default()
            .push_str(text);
        true
    }

    fn set_visible(&self, element_id: &str, visible: bool) -> bool {
        if !self.contains(&Selector::id(element_id)) {
            return false;
        }
        let mut state = self.state.borrow_mut();
        if visible {
            state.hidden.remove(element_id);
        } else {
            state.hidden.insert(element_id.to_owned());
        }
        true
    }

    fn add_listener(&self, selector: &Selector, event: &str, key: &str, handler: Handler) -> usize {
        let scopes = self.matching_scopes(selector);
        let mut state = self.state.borrow_mut();

        for &scope in &scopes {
            let existing = state.listeners.iter_mut().find(|l| {
                l.scope == scope && l.key == key && l.event == event && l.selector == *selector
            });
            match existing {
                Some(listener) => listener.handler = Rc::clone(&handler),
                None => state.listeners.push(Listener {
                    selector: selector.clone(),
                    event: event.to_owned(),
                    key: key.to_owned(),
                    scope,
                    handler: Rc::clone(&handler),
                }),
            }
        }
        scopes.len()
    }

    fn remove_listeners(&self, key: &str) {
        self.state.borrow_mut().listeners.retain(|l| l.key != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, Handler) {
        let count = Rc::new(Cell::new(0));
        let handler_count = Rc::clone(&count);
        let handler: Handler = Rc::new(move || handler_count.set(handler_count.get() + 1));
        (count, handler)
    }

    #[test]
    fn test_new_document_has_menu_items() {
        let doc = HeadlessDocument::new();
        for tab in TabId::ALL {
            assert!(doc.contains(&Selector::MenuItem(tab)));
        }
        assert!(doc.contains(&Selector::class("tab-menu-option")));
        assert!(!doc.contains(&Selector::id("js-search-input")));
    }

    #[test]
    fn test_mount_and_clear_panel() {
        let doc = HeadlessDocument::new();
        doc.mount_panel(TabId::Math, "<input id=\"js-search-input\">");
        assert!(doc.contains(&Selector::id("js-search-input")));

        doc.clear_panel(TabId::Math);
        assert!(!doc.contains(&Selector::id("js-search-input")));
        assert_eq!(doc.panel_markup(TabId::Math), None);
        assert_eq!(
            doc.events(),
            vec![DomEvent::PanelMounted(TabId::Math), DomEvent::PanelCleared(TabId::Math)]
        );
    }

    #[test]
    fn test_class_matching_uses_whole_tokens() {
        let doc = HeadlessDocument::with_chrome("<a class=\"toc-link active\">x</a>");
        assert!(doc.contains(&Selector::class("toc-link")));
        assert!(doc.contains(&Selector::class("active")));
        assert!(!doc.contains(&Selector::class("toc")));
    }

    #[test]
    fn test_listener_rebinding_same_key_is_deduplicated() {
        let doc = HeadlessDocument::new();
        doc.mount_panel(TabId::Programming, "<button class=\"run\">Run</button>");
        let selector = Selector::class("run");
        let (count, handler) = counter();

        assert_eq!(doc.add_listener(&selector, "click", "run", Rc::clone(&handler)), 1);
        assert_eq!(doc.add_listener(&selector, "click", "run", handler), 1);
        assert_eq!(doc.click(&selector), 1);

        assert_eq!(count.get(), 1);
        assert_eq!(doc.listener_count("run"), 1);
    }

    #[test]
    fn test_listener_dropped_with_panel() {
        let doc = HeadlessDocument::new();
        doc.mount_panel(TabId::Programming, "<button class=\"run\">Run</button>");
        let (count, handler) = counter();
        doc.add_listener(&Selector::class("run"), "click", "run", handler);

        doc.clear_panel(TabId::Programming);

        assert_eq!(doc.click(&Selector::class("run")), 0);
        assert_eq!(count.get(), 0);
        assert_eq!(doc.listener_count("run"), 0);
    }

    #[test]
    fn test_listener_without_target_binds_nothing() {
        let doc = HeadlessDocument::new();
        let (_, handler) = counter();
        assert_eq!(doc.add_listener(&Selector::id("missing"), "click", "k", handler), 0);
        assert_eq!(doc.listener_count("k"), 0);
    }

    #[test]
    fn test_remove_listeners_by_key() {
        let doc = HeadlessDocument::new();
        let (count, handler) = counter();
        doc.add_listener(&Selector::MenuItem(TabId::Maps), "click", "menu", handler);

        doc.remove_listeners("menu");

        assert_eq!(doc.click(&Selector::MenuItem(TabId::Maps)), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_focus_missing_element_returns_false() {
        let doc = HeadlessDocument::new();
        assert!(!doc.focus(&Selector::id("js-search-input")));
        assert_eq!(doc.focused(), None);
        assert!(doc.focus(&Selector::class("tab-menu-option")));
        assert_eq!(doc.focused(), Some(Selector::class("tab-menu-option")));
    }

    #[test]
    fn test_text_requires_existing_element() {
        let doc = HeadlessDocument::new();
        assert!(!doc.set_text("code-output", "x"));

        doc.mount_panel(TabId::Programming, "<pre id=\"code-output\"></pre>");
        assert!(doc.set_text("code-output", "a"));
        assert!(doc.append_text("code-output", "b"));
        assert_eq!(doc.text("code-output").as_deref(), Some("ab"));

        doc.clear_panel(TabId::Programming);
        assert_eq!(doc.text("code-output"), None);
    }

    #[test]
    fn test_visibility() {
        let doc = HeadlessDocument::new();
        doc.mount_panel(TabId::Programming, "<pre id=\"code-error\"></pre>");
        assert!(doc.is_visible("code-error"));
        doc.set_visible("code-error", false);
        assert!(!doc.is_visible("code-error"));
    }

    #[test]
    fn test_loading_events_only_on_change() {
        let doc = HeadlessDocument::new();
        doc.set_loading_visible(true);
        doc.set_loading_visible(true);
        doc.set_loading_visible(false);
        assert_eq!(doc.events(), vec![DomEvent::LoadingShown, DomEvent::LoadingHidden]);
    }
}
