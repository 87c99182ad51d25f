//! Widget registry.
//!
//! A widget is the stateful half of a tab: code editor, map viewer, audio
//! player. The controller initializes the destination tab's widget after its
//! markup is mounted and tears the previous one down first.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tabshell_nav::TabId;

/// Error raised while initializing a widget.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// Initialization was requested for a tab without a registered widget.
    #[error("No widget registered for tab {0}")]
    NotRegistered(TabId),
    /// The widget reported a failure.
    #[error("{0}")]
    Init(String),
}

impl WidgetError {
    #[must_use]
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }
}

/// Per-tab lifecycle capability.
///
/// `initialize` must be idempotent: calling it twice without a `teardown` in
/// between must not create a second set of resources or listeners.
pub trait Widget {
    /// Set the widget up against the freshly mounted panel.
    ///
    /// May suspend while external resources become ready.
    fn initialize(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>>;

    /// Release DOM-bound resources. Defaults to a no-op.
    fn teardown(&self) {}
}

type InitFn = Box<dyn Fn() -> Result<(), WidgetError>>;
type TeardownFn = Box<dyn Fn()>;

/// Widget assembled from plain closures.
pub struct CallbackWidget {
    init: InitFn,
    teardown: Option<TeardownFn>,
}

impl CallbackWidget {
    /// Widget whose initialize runs `init` and has no teardown.
    pub fn new(init: impl Fn() -> Result<(), WidgetError> + 'static) -> Self {
        Self {
            init: Box::new(init),
            teardown: None,
        }
    }

    /// Add a teardown callback.
    #[must_use]
    pub fn with_teardown(mut self, teardown: impl Fn() + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }
}

impl Widget for CallbackWidget {
    fn initialize(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        let result = (self.init)();
        async move { result }.boxed_local()
    }

    fn teardown(&self) {
        if let Some(teardown) = &self.teardown {
            teardown();
        }
    }
}

/// Widgets keyed by tab.
///
/// Tracks which tab's widget is live so teardown always targets the widget
/// that was actually initialized.
#[derive(Default)]
pub struct WidgetRegistry {
    widgets: RefCell<HashMap<TabId, Rc<dyn Widget>>>,
    live: Cell<Option<TabId>>,
}

impl WidgetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the widget of a tab. A later registration replaces an earlier one.
    pub fn register(&self, tab: TabId, widget: Rc<dyn Widget>) {
        if self.widgets.borrow_mut().insert(tab, widget).is_some() {
            tracing::debug!(tab = %tab, "Replaced widget registration");
        }
    }

    /// Whether `tab` has a widget.
    #[must_use]
    pub fn contains(&self, tab: TabId) -> bool {
        self.widgets.borrow().contains_key(&tab)
    }

    /// Tab whose widget was initialized last and not torn down since.
    #[must_use]
    pub fn live_tab(&self) -> Option<TabId> {
        self.live.get()
    }

    /// Initialize the widget of `tab`.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::NotRegistered`] if `tab` has no widget, or the
    /// widget's own error.
    pub async fn initialize_for(&self, tab: TabId) -> Result<(), WidgetError> {
        // Clone out so the map is not borrowed across the await.
        let widget = self.widgets.borrow().get(&tab).cloned();
        let Some(widget) = widget else {
            tracing::error!(tab = %tab, "Initialize requested for unregistered widget");
            return Err(WidgetError::NotRegistered(tab));
        };

        self.live.set(Some(tab));
        widget.initialize().await
    }

    /// Tear down the widget of `tab`. Missing widgets are a no-op.
    pub fn teardown_for(&self, tab: TabId) {
        let widget = self.widgets.borrow().get(&tab).cloned();
        if let Some(widget) = widget {
            widget.teardown();
        }
        if self.live.get() == Some(tab) {
            self.live.set(None);
        }
    }

    /// Tear down whichever widget is live.
    pub fn teardown_live(&self) {
        if let Some(tab) = self.live.get() {
            self.teardown_for(tab);
        }
    }
}
