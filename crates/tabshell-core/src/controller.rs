//! Tab lifecycle controller.
//!
//! Owns the committed [`NavigationState`] and serializes transitions between
//! tabs. A transition runs as a local task:
//!
//! 1. yield once so the loading overlay paints
//! 2. clear and deactivate the mounted panel
//! 3. fetch the destination fragment (the only network wait)
//! 4. mount and activate it, tear down the old widget, initialize the new one
//! 5. run post-load hooks, sync indicators, commit state and history
//!
//! # Coalescing
//!
//! At most one transition is in flight. A request arriving meanwhile either
//! targets the pending destination (same tab, anchor and language) and is
//! dropped, or replaces whatever is queued. Every accepted request takes a fresh version token; a run whose
//! token is no longer current declines to mount or commit, so a slow early
//! fetch can never clobber a later destination.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tabshell_fragments::{FetchError, FragmentLoader, fragment_name};
use tabshell_nav::{
    LanguageId, Location, NavigationState, RouteCodec, TabId, TransitionOrigin, TransitionRequest,
};
use tokio::sync::Notify;

use crate::document::Document;
use crate::error::TransitionError;
use crate::history::{History, HistoryBinding};
use crate::hooks::PageHooks;
use crate::indicator::sync_active_indicators;
use crate::widget::WidgetRegistry;

/// What to show when a fragment cannot be fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Re-mount the committed tab from its cached markup.
    #[default]
    Rollback,
    /// Leave the committed tab's panel empty under the error banner.
    ErrorBanner,
}

/// Tunables of a [`TabController`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Abort fragment fetches after this long. `None` waits forever.
    pub fetch_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

type Observer = Rc<dyn Fn(&NavigationState)>;

#[derive(Default)]
struct Queue {
    next_token: u64,
    current: u64,
    /// Whether a drive loop is running.
    busy: bool,
    /// Running request, until its fetch has failed or it has committed.
    in_flight: Option<TransitionRequest>,
    queued: Option<(TransitionRequest, u64)>,
}

impl Queue {
    /// Request the UI is heading to, if a transition is pending.
    fn pending(&self) -> Option<&TransitionRequest> {
        self.queued
            .as_ref()
            .map(|(request, _)| request)
            .or(self.in_flight.as_ref())
    }
}

/// Whether `next` would land where `pending` already leads.
fn same_destination(pending: &TransitionRequest, next: &TransitionRequest) -> bool {
    pending.to == next.to
        && pending.target_hash == next.target_hash
        && (next.language.is_none() || pending.language == next.language)
}

struct Inner {
    document: Rc<dyn Document>,
    loader: Rc<dyn FragmentLoader>,
    history: Rc<dyn History>,
    binding: HistoryBinding,
    widgets: Rc<WidgetRegistry>,
    hooks: PageHooks,
    options: ControllerOptions,

    state: RefCell<NavigationState>,
    queue: RefCell<Queue>,
    /// Tab whose panel currently holds markup.
    mounted: Cell<Option<TabId>>,
    /// Whether the committed tab's panel shows its content.
    committed_visible: Cell<bool>,
    /// Markup of the committed tab, kept for rollback.
    committed_markup: RefCell<Option<String>>,
    last_error: RefCell<Option<TransitionError>>,
    idle: Notify,
    observers: RefCell<Vec<Observer>>,
}

/// Builder for [`TabController`].
pub struct TabControllerBuilder {
    document: Rc<dyn Document>,
    loader: Rc<dyn FragmentLoader>,
    history: Rc<dyn History>,
    codec: RouteCodec,
    widgets: Rc<WidgetRegistry>,
    hooks: PageHooks,
    options: ControllerOptions,
}

impl TabControllerBuilder {
    #[must_use]
    pub fn codec(mut self, codec: RouteCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn widgets(mut self, widgets: Rc<WidgetRegistry>) -> Self {
        self.widgets = widgets;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: PageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(self) -> TabController {
        let language = self.hooks.language().current();
        TabController {
            inner: Rc::new(Inner {
                document: self.document,
                loader: self.loader,
                history: self.history,
                binding: HistoryBinding::new(self.codec),
                widgets: self.widgets,
                hooks: self.hooks,
                options: self.options,
                state: RefCell::new(NavigationState::new(TabId::DEFAULT, language, None)),
                queue: RefCell::new(Queue::default()),
                mounted: Cell::new(None),
                committed_visible: Cell::new(false),
                committed_markup: RefCell::new(None),
                last_error: RefCell::new(None),
                idle: Notify::new(),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }
}

/// The tab lifecycle state machine.
///
/// Cheap to clone; clones share the same state. Transitions run on
/// [`tokio::task::spawn_local`], so requests must be made from inside a
/// [`tokio::task::LocalSet`].
#[derive(Clone)]
pub struct TabController {
    inner: Rc<Inner>,
}

/// Non-owning handle to a [`TabController`], for use inside event handlers.
#[derive(Clone)]
pub struct WeakTabController {
    inner: Weak<Inner>,
}

impl WeakTabController {
    #[must_use]
    pub fn upgrade(&self) -> Option<TabController> {
        self.inner.upgrade().map(|inner| TabController { inner })
    }
}

impl TabController {
    /// Start building a controller over its collaborators.
    #[must_use]
    pub fn builder(
        document: Rc<dyn Document>,
        loader: Rc<dyn FragmentLoader>,
        history: Rc<dyn History>,
    ) -> TabControllerBuilder {
        TabControllerBuilder {
            document,
            loader,
            history,
            codec: RouteCodec::default(),
            widgets: Rc::new(WidgetRegistry::new()),
            hooks: PageHooks::default(),
            options: ControllerOptions::default(),
        }
    }

    /// Bind to history and load the tab named by the current location.
    ///
    /// The decoded language is applied first. The decoded tab is always
    /// loaded, even when it is the default tab, since nothing is mounted yet.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn start(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.history.on_pop(Box::new(move |location| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_pop(&location);
            }
        }));

        let decoded = self.inner.binding.current(self.inner.history.as_ref());
        tracing::info!(state = %decoded, "Starting tab shell");
        self.inner.change_language(&decoded.language);
        self.inner.request(
            decoded.tab,
            decoded.hash,
            Some(decoded.language),
            TransitionOrigin::Startup,
        );
    }

    /// Navigate to `to`, optionally scrolling to `target_hash` once mounted.
    ///
    /// Returns immediately; the result is observable through [`Self::state`]
    /// once the transition commits. Requesting the committed tab is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn request_transition(&self, to: TabId, target_hash: Option<String>) {
        self.inner
            .request(to, target_hash, None, TransitionOrigin::User);
    }

    /// Committed tab. Never reflects a transition in progress.
    #[must_use]
    pub fn current_tab(&self) -> TabId {
        self.inner.state.borrow().tab
    }

    /// Committed navigation state.
    #[must_use]
    pub fn state(&self) -> NavigationState {
        self.inner.state.borrow().clone()
    }

    /// Canonical location of the committed state.
    #[must_use]
    pub fn location(&self) -> Location {
        self.inner.binding.codec().encode(&self.inner.state.borrow())
    }

    /// Error of the most recent transition, cleared by a clean commit.
    #[must_use]
    pub fn last_error(&self) -> Option<TransitionError> {
        self.inner.last_error.borrow().clone()
    }

    /// Whether no transition is in flight or queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.inner.queue.borrow().busy
    }

    /// Wait until no transition is in flight or queued.
    pub async fn settle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Call `observer` with the new state after every commit.
    pub fn subscribe(&self, observer: impl Fn(&NavigationState) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    #[must_use]
    pub fn widgets(&self) -> &Rc<WidgetRegistry> {
        &self.inner.widgets
    }

    #[must_use]
    pub fn document(&self) -> &Rc<dyn Document> {
        &self.inner.document
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakTabController {
        WeakTabController {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Inner {
    fn request(
        self: &Rc<Self>,
        to: TabId,
        target_hash: Option<String>,
        language: Option<LanguageId>,
        origin: TransitionOrigin,
    ) {
        let (from, committed_language) = {
            let state = self.state.borrow();
            (state.tab, state.language.clone())
        };
        let request =
            TransitionRequest::new(from, to, target_hash, origin).with_language(language);

        let token = {
            let mut queue = self.queue.borrow_mut();
            let pending = queue.pending();
            let settled = pending.is_none();
            let duplicate = pending.is_some_and(|pending| same_destination(pending, &request));

            if settled && to == from && self.committed_visible.get() {
                drop(queue);
                match request.language {
                    Some(language) if language != committed_language => {
                        self.commit_language(language, origin);
                    }
                    _ => tracing::debug!(tab = %to, ?origin, "Already on requested tab"),
                }
                return;
            }
            if duplicate {
                tracing::debug!(tab = %to, ?origin, "Dropping request for pending tab");
                return;
            }

            queue.next_token += 1;
            queue.current = queue.next_token;
            queue.current
        };

        // Visible before any suspension.
        self.document.set_loading_visible(true);
        self.hooks.clear_search();

        let mut queue = self.queue.borrow_mut();
        if queue.busy {
            if let Some((superseded, _)) = queue.queued.replace((request, token)) {
                tracing::debug!(tab = %superseded.to, by = %to, "Coalesced queued request");
            } else {
                tracing::debug!(tab = %to, token, "Queued request");
            }
            return;
        }

        queue.busy = true;
        queue.in_flight = Some(request.clone());
        drop(queue);
        tokio::task::spawn_local(Rc::clone(self).drive(request, token));
    }

    /// Run `request` and then every request queued behind it.
    async fn drive(self: Rc<Self>, mut request: TransitionRequest, mut token: u64) {
        loop {
            self.run(&request, token).await;

            let next = {
                let mut queue = self.queue.borrow_mut();
                let next = queue.queued.take();
                queue.in_flight = next.as_ref().map(|(request, _)| request.clone());
                queue.busy = next.is_some();
                next
            };
            match next {
                Some((next_request, next_token)) => {
                    request = next_request;
                    token = next_token;
                }
                None => break,
            }
        }

        self.document.set_loading_visible(false);
        self.idle.notify_waiters();
    }

    fn is_stale(&self, token: u64) -> bool {
        self.queue.borrow().current != token
    }

    async fn run(self: &Rc<Self>, request: &TransitionRequest, token: u64) {
        let start = Instant::now();
        tokio::task::yield_now().await;

        if self.is_stale(token) {
            tracing::debug!(tab = %request.to, token, "Superseded before start");
            return;
        }

        self.document.clear_error();
        if let Some(old) = self.mounted.take() {
            self.document.clear_panel(old);
            self.document.set_panel_active(old, false);
            if old == self.state.borrow().tab {
                self.committed_visible.set(false);
            }
        }

        let result = self.fetch(request.to).await;
        if self.is_stale(token) {
            tracing::debug!(tab = %request.to, token, "Superseded during fetch");
            return;
        }

        match result {
            Ok(markup) => self.complete(request, token, markup, start).await,
            Err(err) => self.fail(request, err).await,
        }
    }

    async fn fetch(&self, tab: TabId) -> Result<String, FetchError> {
        let load = self.loader.load_tab(tab);
        match self.options.fetch_timeout {
            Some(after) => tokio::time::timeout(after, load)
                .await
                .unwrap_or_else(|_| {
                    Err(FetchError::Timeout {
                        name: fragment_name(tab),
                        after,
                    })
                }),
            None => load.await,
        }
    }

    async fn complete(
        self: &Rc<Self>,
        request: &TransitionRequest,
        token: u64,
        markup: String,
        start: Instant,
    ) {
        let tab = request.to;
        self.document.mount_panel(tab, &markup);
        self.document.set_panel_active(tab, true);
        self.mounted.set(Some(tab));

        self.widgets.teardown_live();
        let widget_error = if self.widgets.contains(tab) {
            self.widgets.initialize_for(tab).await.err()
        } else {
            None
        };

        if self.is_stale(token) {
            tracing::debug!(tab = %tab, token, "Superseded during widget initialization");
            return;
        }

        self.hooks.after_mount();

        let error = widget_error.map(|source| {
            tracing::warn!(tab = %tab, error = %source, "Widget initialization failed");
            TransitionError::Widget { tab, source }
        });
        if let Some(error) = &error {
            self.document.show_error(&error.banner_message());
        }
        *self.last_error.borrow_mut() = error;

        let language = request
            .language
            .clone()
            .unwrap_or_else(|| self.hooks.language().current());
        let state = NavigationState::new(tab, language, request.target_hash.clone());
        *self.state.borrow_mut() = state.clone();
        *self.committed_markup.borrow_mut() = Some(markup);
        self.committed_visible.set(true);

        sync_active_indicators(self.document.as_ref(), tab);
        self.hooks.after_commit();
        let write = self
            .binding
            .sync(self.history.as_ref(), &state, request.origin);

        if let Some(hash) = &state.hash
            && !self.document.scroll_into_view(hash)
        {
            tracing::debug!(hash = %hash, "Anchor not found in mounted tab");
        }

        self.notify(&state);

        tracing::info!(
            from = %request.from,
            to = %tab,
            token,
            ?write,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Committed transition"
        );
    }

    async fn fail(self: &Rc<Self>, request: &TransitionRequest, err: FetchError) {
        tracing::warn!(tab = %request.to, error = %err, "Fragment fetch failed");
        // Settled: a new request for the same tab is a retry, not a duplicate.
        self.queue.borrow_mut().in_flight = None;

        let error = TransitionError::Fetch(err);
        self.document.show_error(&error.banner_message());
        *self.last_error.borrow_mut() = Some(error);

        let (committed, committed_language) = {
            let state = self.state.borrow();
            (state.tab, state.language.clone())
        };
        let binding = self.hooks.language();
        if request.language.is_some() && binding.current() != committed_language {
            tracing::debug!(language = %committed_language, "Restoring page language");
            binding.change(&committed_language);
        }
        let cached = match self.options.failure_policy {
            FailurePolicy::Rollback => self.committed_markup.borrow().clone(),
            FailurePolicy::ErrorBanner => None,
        };

        // The old widget's markup is gone either way.
        self.widgets.teardown_live();
        self.document.set_panel_active(committed, true);
        self.mounted.set(Some(committed));
        sync_active_indicators(self.document.as_ref(), committed);

        let Some(markup) = cached else {
            return;
        };

        tracing::warn!(tab = %committed, "Rolling back to committed tab");
        self.document.mount_panel(committed, &markup);
        self.committed_visible.set(true);
        if self.widgets.contains(committed)
            && let Err(source) = self.widgets.initialize_for(committed).await
        {
            tracing::warn!(tab = %committed, error = %source, "Widget re-initialization failed");
        }
        self.hooks.after_mount();
        self.hooks.after_commit();
    }

    /// Commit a language change on the committed tab. Needs no fetch.
    fn commit_language(&self, language: LanguageId, origin: TransitionOrigin) {
        let state = {
            let mut state = self.state.borrow_mut();
            state.language = language;
            state.clone()
        };
        let write = self.binding.sync(self.history.as_ref(), &state, origin);
        self.notify(&state);
        tracing::info!(state = %state, ?write, "Committed language change");
    }

    fn notify(&self, state: &NavigationState) {
        let observers = self.observers.borrow().clone();
        for observer in &observers {
            observer(state);
        }
    }

    /// Switch the page language. The committed state follows when the
    /// request carrying it commits.
    fn change_language(&self, language: &LanguageId) {
        let binding = self.hooks.language();
        if binding.current() != *language {
            tracing::debug!(language = %language, "Changing page language");
            binding.change(language);
        }
    }

    fn handle_pop(self: &Rc<Self>, location: &Location) {
        let decoded = self.binding.codec().decode(location);
        tracing::debug!(state = %decoded, "Reconciling history entry");
        self.change_language(&decoded.language);
        self.request(
            decoded.tab,
            decoded.hash,
            Some(decoded.language),
            TransitionOrigin::History,
        );
    }
}
