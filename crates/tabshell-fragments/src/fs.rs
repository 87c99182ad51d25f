//! Filesystem fragment loader.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;

use crate::error::FetchError;
use crate::loader::FragmentLoader;

/// Loads fragments from files in a directory.
///
/// I/O failures are reported with the status code an HTTP server would have
/// returned for the same condition (404, 403), so callers handle both
/// backends identically.
#[derive(Clone, Debug)]
pub struct FsFragmentLoader {
    root: PathBuf,
}

impl FsFragmentLoader {
    /// Create a loader reading from `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject names that would escape the fragment directory.
    fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != ".."
    }
}

impl FragmentLoader for FsFragmentLoader {
    fn load(&self, name: &str) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        let name = name.to_owned();
        async move {
            if !Self::is_valid_name(&name) {
                return Err(FetchError::status(name, 400, "Bad Request"));
            }

            let path = self.root.join(&name);
            let start = Instant::now();
            let result = tokio::fs::read_to_string(&path).await;

            match result {
                Ok(markup) => {
                    tracing::debug!(
                        path = %path.display(),
                        bytes = markup.len(),
                        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Loaded fragment"
                    );
                    Ok(markup)
                }
                Err(err) => Err(match err.kind() {
                    ErrorKind::NotFound => FetchError::not_found(name),
                    ErrorKind::PermissionDenied => FetchError::status(name, 403, "Forbidden"),
                    _ => FetchError::transport(name, err.to_string()),
                }),
            }
        }
        .boxed_local()
    }
}
