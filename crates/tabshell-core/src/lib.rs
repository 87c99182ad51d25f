//! Tab lifecycle and navigation for tabshell.
//!
//! This crate owns everything that changes what the page shows:
//!
//! - [`TabController`]: serializes transitions between tabs behind a version
//!   token, fetches fragments, mounts markup, drives widgets and commits the
//!   [`NavigationState`](tabshell_nav::NavigationState)
//! - [`WidgetRegistry`]: per-tab [`Widget`] lifecycle
//! - [`InputRouter`]: keyboard chords and tab menu clicks
//! - [`HistoryBinding`]: writes committed state to [`History`] and decodes
//!   back/forward navigation
//! - [`PageHooks`]: search, language and other hooks re-run after each mount
//!
//! The page itself is reached through the [`Document`] and [`History`] traits.
//! [`HeadlessDocument`] and [`HeadlessHistory`] implement both in memory.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use tabshell_core::{HeadlessDocument, HeadlessHistory, TabController};
//! use tabshell_fragments::FsFragmentLoader;
//!
//! let controller = TabController::builder(
//!     Rc::new(HeadlessDocument::new()),
//!     Rc::new(FsFragmentLoader::new("fragments")),
//!     Rc::new(HeadlessHistory::new("/en/#maps")),
//! )
//! .build();
//!
//! tokio::task::LocalSet::new()
//!     .run_until(async {
//!         controller.start();
//!         controller.settle().await;
//!     })
//!     .await;
//! ```

mod controller;
mod document;
mod error;
mod headless;
mod history;
mod hooks;
mod indicator;
mod input;
mod widget;
pub mod widgets;

pub use controller::{
    ControllerOptions, FailurePolicy, TabController, TabControllerBuilder, WeakTabController,
};
pub use document::{Document, Handler, Selector};
pub use error::TransitionError;
pub use headless::{
    DomEvent, EchoRuntime, EchoRuntimeLoader, HeadlessDocument, HeadlessEditor, HeadlessHistory,
};
pub use history::{History, HistoryBinding, HistoryWrite, PopHandler};
pub use hooks::{LanguageBinding, NoopSearch, PageHooks, PostLoadHook, SearchIndex, StaticLanguage};
pub use indicator::sync_active_indicators;
pub use input::{ChordError, InputRouter, KeyAction, KeyChord, KeyDisposition, KeyEvent};
pub use widget::{CallbackWidget, Widget, WidgetError, WidgetRegistry};
