//! Fetch error type.

use std::time::Duration;

/// Failure to fetch a fragment.
///
/// Mirrors the `{status, statusText}` shape of a failed browser request so the
/// same error can describe HTTP, filesystem and timeout failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx response.
    #[error("Fetching {name} failed with {status} {status_text}")]
    Status {
        /// Fragment name.
        name: String,
        /// Response status code.
        status: u16,
        /// Response status text.
        status_text: String,
    },
    /// Network or I/O failure before any status was received.
    #[error("Fetching {name} failed: {message}")]
    Transport {
        /// Fragment name.
        name: String,
        /// Transport error message.
        message: String,
    },
    /// No response within the configured timeout.
    #[error("Fetching {name} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Fragment name.
        name: String,
        /// Elapsed timeout.
        after: Duration,
    },
}

impl FetchError {
    /// Create a status error.
    #[must_use]
    pub fn status(name: impl Into<String>, status: u16, status_text: impl Into<String>) -> Self {
        Self::Status {
            name: name.into(),
            status,
            status_text: status_text.into(),
        }
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::status(name, 404, "Not Found")
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Status code carried by the error, if a response was received.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Timeout { .. } => None,
        }
    }

    /// Name of the fragment that failed.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Status { name, .. } | Self::Transport { name, .. } | Self::Timeout { name, .. } => {
                name
            }
        }
    }
}
