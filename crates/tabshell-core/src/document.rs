//! Document surface used by the shell.
//!
//! The controller, widgets and input router never touch a concrete DOM. They
//! go through [`Document`], which a browser binding implements on top of the
//! real page and [`HeadlessDocument`](crate::HeadlessDocument) implements in
//! memory.

use std::fmt;
use std::rc::Rc;

use tabshell_nav::TabId;

/// Event handler bound through [`Document::add_listener`].
pub type Handler = Rc<dyn Fn()>;

/// Element selector understood by every [`Document`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element with this `id`.
    Id(String),
    /// Elements carrying this class.
    Class(String),
    /// Tab menu entry (`#tab-menu .tab-menu-option[data-tab-id=…]`).
    MenuItem(TabId),
}

impl Selector {
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
            Self::MenuItem(tab) => write!(f, "#tab-menu .tab-menu-option[data-tab-id=\"{tab}\"]"),
        }
    }
}

/// Page operations needed by the tab shell.
///
/// All methods are synchronous; they run on the shell's single logical
/// thread and never suspend.
pub trait Document {
    /// Show or hide the blocking loading overlay.
    fn set_loading_visible(&self, visible: bool);

    /// Remove every child of a tab's panel container.
    fn clear_panel(&self, tab: TabId);

    /// Replace the content of a tab's panel container.
    fn mount_panel(&self, tab: TabId, markup: &str);

    /// Toggle the `active` class on a tab's panel container.
    fn set_panel_active(&self, tab: TabId, active: bool);

    /// Remove the `active` class from every element carrying a `data-tab-id`.
    fn clear_indicators(&self);

    /// Add the `active` class to every element whose `data-tab-id` is `tab`.
    fn set_indicator_active(&self, tab: TabId);

    /// Show a visible, non-blocking error banner.
    fn show_error(&self, message: &str);

    fn clear_error(&self);

    /// Scroll the element with `element_id` into view. Returns `false` if absent.
    fn scroll_into_view(&self, element_id: &str) -> bool;

    /// Focus the first element matching `selector`. Returns `false` if none matched.
    fn focus(&self, selector: &Selector) -> bool;

    /// Replace the text content of an element. Returns `false` if absent.
    fn set_text(&self, element_id: &str, text: &str) -> bool;

    /// Append to the text content of an element. Returns `false` if absent.
    fn append_text(&self, element_id: &str, text: &str) -> bool;

    /// Show or hide an element. Returns `false` if absent.
    fn set_visible(&self, element_id: &str, visible: bool) -> bool;

    /// Bind `handler` to `event` on every element matching `selector`.
    ///
    /// Binding is keyed by `key`: binding the same key to the same element and
    /// event again replaces the previous handler instead of adding a second
    /// one. Listeners on elements inside a panel are dropped when the panel is
    /// cleared or remounted. Returns the number of bindings made, 0 when
    /// nothing matched.
    fn add_listener(&self, selector: &Selector, event: &str, key: &str, handler: Handler) -> usize;

    /// Remove every listener bound under `key`.
    fn remove_listeners(&self, key: &str);
}
