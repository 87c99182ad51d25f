//! Tab fragment loading for tabshell.
//!
//! Each tab's markup lives in its own fragment (`tab-{id}.html`) and is only
//! fetched when the tab is activated. This crate provides:
//!
//! - [`FragmentLoader`] trait, the single suspension point of a tab transition
//! - [`FetchError`] with the status/status-text shape of a failed HTTP fetch
//! - [`FsFragmentLoader`] reading fragments from a directory
//! - [`MockFragmentLoader`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use tabshell_fragments::{FragmentLoader, FsFragmentLoader};
//! use tabshell_nav::TabId;
//!
//! let loader = FsFragmentLoader::new("public");
//! let markup = loader.load_tab(TabId::Maps).await?;
//! ```

mod error;
mod fs;
mod loader;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use error::FetchError;
pub use fs::FsFragmentLoader;
pub use loader::{FragmentLoader, asset_base_path, fragment_name};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockFragmentLoader;
