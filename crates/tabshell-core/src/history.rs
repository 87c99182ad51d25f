//! Browser history collaborator and its binding to the codec.

use tabshell_nav::{Location, NavigationState, RouteCodec, TransitionOrigin};

/// Callback invoked with the new location on back/forward.
pub type PopHandler = Box<dyn Fn(Location)>;

/// Session history of the page.
pub trait History {
    /// Current location.
    fn location(&self) -> Location;

    /// Add an entry without reloading.
    fn push(&self, location: &Location);

    /// Overwrite the current entry without reloading.
    fn replace(&self, location: &Location);

    /// Register the back/forward callback, replacing any previous one.
    fn on_pop(&self, handler: PopHandler);
}

/// How a commit is written back to history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryWrite {
    Push,
    Replace,
    /// The location already matches.
    Skip,
}

/// Codec plus write policy between committed state and history.
#[derive(Clone, Debug)]
pub struct HistoryBinding {
    codec: RouteCodec,
}

impl HistoryBinding {
    #[must_use]
    pub fn new(codec: RouteCodec) -> Self {
        Self { codec }
    }

    #[must_use]
    pub fn codec(&self) -> &RouteCodec {
        &self.codec
    }

    /// Decode the current history location.
    #[must_use]
    pub fn current(&self, history: &dyn History) -> NavigationState {
        self.codec.decode(&history.location())
    }

    /// Write the canonical location of `state` to history.
    ///
    /// User gestures push, startup and back/forward replace. Nothing is written
    /// when the location is already canonical, so popping back never creates
    /// a new entry.
    pub fn sync(
        &self,
        history: &dyn History,
        state: &NavigationState,
        origin: TransitionOrigin,
    ) -> HistoryWrite {
        let target = self.codec.encode(state);
        let current = history.location();

        if current.path == target.path && current.hash == target.hash {
            return HistoryWrite::Skip;
        }

        // Keep the query string, it may carry unrelated parameters.
        let target = Location::new(target.path, current.query, target.hash);
        match origin {
            TransitionOrigin::User => {
                history.push(&target);
                HistoryWrite::Push
            }
            TransitionOrigin::Startup | TransitionOrigin::History => {
                history.replace(&target);
                HistoryWrite::Replace
            }
        }
    }
}
