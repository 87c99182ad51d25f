//! Fragment loader trait.

use futures_util::future::LocalBoxFuture;
use tabshell_nav::TabId;

use crate::error::FetchError;

/// Asynchronous source of tab markup.
///
/// Loaders are driven from the shell's single logical thread, so the returned
/// futures are not required to be `Send`.
pub trait FragmentLoader {
    /// Fetch a fragment by file name (e.g. `tab-maps.html`).
    ///
    /// The returned future owns everything it needs; `name` is not borrowed
    /// past the call.
    ///
    /// # Errors
    ///
    /// Resolves to [`FetchError`] on a non-2xx status or transport failure.
    fn load(&self, name: &str) -> LocalBoxFuture<'_, Result<String, FetchError>>;

    /// Fetch the fragment of a tab.
    fn load_tab(&self, tab: TabId) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        self.load(&fragment_name(tab))
    }
}

/// Fragment file name of a tab.
#[must_use]
pub fn fragment_name(tab: TabId) -> String {
    format!("tab-{tab}.html")
}

/// Directory part of a page path with a trailing deployment segment removed.
///
/// `"/cheats/build/en/"` becomes `"/cheats/"`. Assets shared by all deployments
/// (fragments, runtime packages) are resolved relative to this path.
#[must_use]
pub fn asset_base_path<'a>(path: &'a str, deploy_prefix: &str) -> &'a str {
    let marker = format!("{}/", deploy_prefix.trim_matches('/'));
    if marker.len() > 1 {
        let mut search_from = 0;
        while let Some(idx) = path[search_from..].find(&marker) {
            let start = search_from + idx;
            if start == 0 || path.as_bytes()[start - 1] == b'/' {
                return &path[..start];
            }
            search_from = start + marker.len();
        }
    }
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}
