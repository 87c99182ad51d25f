//! Transition error type.

use tabshell_fragments::FetchError;
use tabshell_nav::TabId;

use crate::widget::WidgetError;

/// Failure observed during a transition.
///
/// Neither variant aborts the shell: the controller logs it, shows an error
/// banner and keeps the last one available through
/// [`TabController::last_error`](crate::TabController::last_error).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The destination's fragment could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The destination's widget failed to initialize.
    #[error("Widget for {tab} failed to initialize: {source}")]
    Widget {
        tab: TabId,
        #[source]
        source: WidgetError,
    },
}

impl TransitionError {
    /// Message shown in the error banner.
    #[must_use]
    pub fn banner_message(&self) -> String {
        match self {
            Self::Fetch(FetchError::Status { status, status_text, .. }) => {
                format!("Could not load this tab ({status} {status_text}).")
            }
            Self::Fetch(FetchError::Timeout { .. }) => {
                "Loading this tab took too long. Please try again.".to_owned()
            }
            Self::Fetch(FetchError::Transport { .. }) => {
                "Could not load this tab. Check your connection and try again.".to_owned()
            }
            Self::Widget { tab, .. } => format!("Part of the {tab} tab failed to start."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_banner_message_for_status() {
        let err = TransitionError::from(FetchError::status("tab-maps.html", 500, "Internal Server Error"));
        assert_eq!(
            err.banner_message(),
            "Could not load this tab (500 Internal Server Error)."
        );
    }

    #[test]
    fn test_widget_error_display() {
        let err = TransitionError::Widget {
            tab: TabId::Programming,
            source: WidgetError::init("runtime failed"),
        };
        assert_eq!(
            err.to_string(),
            "Widget for programming failed to initialize: runtime failed"
        );
    }
}
