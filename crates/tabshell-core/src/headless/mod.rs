//! In-memory collaborators for driving the shell without a browser.

mod document;
mod history;
mod programming;

pub use document::{DomEvent, HeadlessDocument};
pub use history::HeadlessHistory;
pub use programming::{EchoRuntime, EchoRuntimeLoader, HeadlessEditor};
