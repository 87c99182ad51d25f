//! Mock fragment loader for testing.
//!
//! Provides [`MockFragmentLoader`] for exercising transitions without files,
//! including slow, failing and never-resolving fetches.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tabshell_nav::TabId;

use crate::error::FetchError;
use crate::loader::{FragmentLoader, fragment_name};

#[derive(Clone, Debug)]
enum Response {
    Markup(String),
    Failure(FetchError),
    Pending,
}

#[derive(Clone, Debug)]
struct Entry {
    response: Response,
    delay: Duration,
}

/// Mock loader for testing.
///
/// Stores responses in memory, keyed by fragment name. Use the builder
/// methods to configure responses; unknown names resolve to a 404.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tabshell_fragments::MockFragmentLoader;
/// use tabshell_nav::TabId;
///
/// let loader = MockFragmentLoader::new()
///     .with_tab(TabId::General, "<h1>General</h1>")
///     .with_tab(TabId::Maps, "<div id=\"map\"></div>")
///     .with_delay(TabId::Maps, Duration::from_millis(200));
/// ```
#[derive(Debug, Default)]
pub struct MockFragmentLoader {
    entries: RefCell<HashMap<String, Entry>>,
    calls: RefCell<Vec<String>>,
}

impl MockFragmentLoader {
    /// Create a new empty mock loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock loader serving `<h1>{tab}</h1>` for every tab.
    #[must_use]
    pub fn with_all_tabs() -> Self {
        TabId::ALL
            .into_iter()
            .fold(Self::new(), |loader, tab| {
                loader.with_tab(tab, format!("<h1 id=\"{tab}-title\">{tab}</h1>"))
            })
    }

    /// Serve markup for a tab.
    #[must_use]
    pub fn with_tab(self, tab: TabId, markup: impl Into<String>) -> Self {
        self.set_tab(tab, markup);
        self
    }

    /// Fail every fetch of a tab.
    #[must_use]
    pub fn with_failure(self, tab: TabId, status: u16, status_text: &str) -> Self {
        self.set_failure(tab, status, status_text);
        self
    }

    /// Delay every fetch of a tab.
    #[must_use]
    pub fn with_delay(self, tab: TabId, delay: Duration) -> Self {
        self.set_delay(tab, delay);
        self
    }

    /// Never resolve fetches of a tab.
    #[must_use]
    pub fn with_pending(self, tab: TabId) -> Self {
        self.update(tab, |entry| entry.response = Response::Pending);
        self
    }

    /// Replace the markup served for a tab.
    pub fn set_tab(&self, tab: TabId, markup: impl Into<String>) {
        let markup = markup.into();
        self.update(tab, |entry| entry.response = Response::Markup(markup));
    }

    /// Replace the response for a tab with a status failure.
    pub fn set_failure(&self, tab: TabId, status: u16, status_text: &str) {
        let error = FetchError::status(fragment_name(tab), status, status_text);
        self.update(tab, |entry| entry.response = Response::Failure(error));
    }

    /// Replace the delay for a tab.
    pub fn set_delay(&self, tab: TabId, delay: Duration) {
        self.update(tab, |entry| entry.delay = delay);
    }

    /// Fragment names fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of fetches of a tab's fragment.
    #[must_use]
    pub fn call_count(&self, tab: TabId) -> usize {
        let name = fragment_name(tab);
        self.calls.borrow().iter().filter(|c| **c == name).count()
    }

    fn update(&self, tab: TabId, apply: impl FnOnce(&mut Entry)) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(fragment_name(tab)).or_insert_with(|| Entry {
            response: Response::Failure(FetchError::not_found(fragment_name(tab))),
            delay: Duration::ZERO,
        });
        apply(entry);
    }
}

impl FragmentLoader for MockFragmentLoader {
    fn load(&self, name: &str) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        self.calls.borrow_mut().push(name.to_owned());
        let entry = self.entries.borrow().get(name).cloned();
        let name = name.to_owned();

        async move {
            let Some(entry) = entry else {
                return Err(FetchError::not_found(name));
            };
            if !entry.delay.is_zero() {
                tokio::time::sleep(entry.delay).await;
            }
            match entry.response {
                Response::Markup(markup) => Ok(markup),
                Response::Failure(err) => Err(err),
                Response::Pending => std::future::pending().await,
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_configured_markup() {
        let loader = MockFragmentLoader::new().with_tab(TabId::Math, "<p>sum</p>");
        assert_eq!(loader.load_tab(TabId::Math).await.unwrap(), "<p>sum</p>");
        assert_eq!(loader.call_count(TabId::Math), 1);
    }

    #[tokio::test]
    async fn test_unknown_fragment_is_404() {
        let loader = MockFragmentLoader::new();
        let err = loader.load("tab-keyboard.html").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(loader.calls(), vec!["tab-keyboard.html".to_owned()]);
    }

    #[tokio::test]
    async fn test_failure_then_recovery() {
        let loader = MockFragmentLoader::with_all_tabs().with_failure(TabId::Maps, 500, "Boom");
        assert_eq!(
            loader.load_tab(TabId::Maps).await.unwrap_err().status_code(),
            Some(500)
        );

        loader.set_tab(TabId::Maps, "<div>map</div>");
        assert_eq!(loader.load_tab(TabId::Maps).await.unwrap(), "<div>map</div>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_respected() {
        let loader = MockFragmentLoader::with_all_tabs()
            .with_delay(TabId::Physics, Duration::from_millis(300));

        let start = tokio::time::Instant::now();
        loader.load_tab(TabId::Physics).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_never_resolves() {
        let loader = MockFragmentLoader::with_all_tabs().with_pending(TabId::Chemistry);
        let result =
            tokio::time::timeout(Duration::from_secs(60), loader.load_tab(TabId::Chemistry)).await;
        assert!(result.is_err());
    }
}
