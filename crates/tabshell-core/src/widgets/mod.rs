//! Built-in widgets.

pub mod maps;
pub mod programming;

pub use maps::MapWidget;
pub use programming::{
    CodeEditor, ProgrammingWidget, RuntimeLoader, ScriptRuntime, runtime_index_url,
};
