//! In-memory code editor and script runtime for the programming tab.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;

use crate::widget::WidgetError;
use crate::widgets::{CodeEditor, RuntimeLoader, ScriptRuntime};

/// Editor whose source lives in memory.
#[derive(Default)]
pub struct HeadlessEditor {
    source: RefCell<String>,
    mounts: Cell<usize>,
    disposals: Cell<usize>,
}

impl HeadlessEditor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the source text, as if typed by the user.
    pub fn set_code(&self, code: impl Into<String>) {
        *self.source.borrow_mut() = code.into();
    }

    #[must_use]
    pub fn mounts(&self) -> usize {
        self.mounts.get()
    }

    #[must_use]
    pub fn disposals(&self) -> usize {
        self.disposals.get()
    }
}

impl CodeEditor for HeadlessEditor {
    fn mount(&self, _container_id: &str) -> Result<(), WidgetError> {
        self.mounts.set(self.mounts.get() + 1);
        Ok(())
    }

    fn code(&self) -> String {
        self.source.borrow().clone()
    }

    fn dispose(&self) {
        self.disposals.set(self.disposals.get() + 1);
    }
}

/// Runtime that prints each line of the program.
///
/// A line of the form `raise <message>` stops the program with
/// `Error: <message>`.
#[derive(Default)]
pub struct EchoRuntime {
    runs: Cell<usize>,
}

impl EchoRuntime {
    /// Number of programs run so far.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl ScriptRuntime for EchoRuntime {
    fn run(&self, code: &str, stdout: &mut dyn FnMut(&str)) -> Result<(), String> {
        self.runs.set(self.runs.get() + 1);
        for line in code.lines() {
            if let Some(message) = line.strip_prefix("raise ") {
                return Err(format!("Error: {message}"));
            }
            stdout(line);
        }
        Ok(())
    }
}

/// Hands out a single shared [`EchoRuntime`] and records every index URL it
/// was asked to load from.
#[derive(Default)]
pub struct EchoRuntimeLoader {
    runtime: Rc<EchoRuntime>,
    requested: RefCell<Vec<String>>,
    failure: Option<String>,
}

impl EchoRuntimeLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader whose every load fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &Rc<EchoRuntime> {
        &self.runtime
    }

    /// Index URLs passed to `load`, in call order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl RuntimeLoader for EchoRuntimeLoader {
    fn load(&self, index_url: &str) -> LocalBoxFuture<'_, Result<Rc<dyn ScriptRuntime>, WidgetError>> {
        self.requested.borrow_mut().push(index_url.to_owned());
        let result = match &self.failure {
            Some(message) => Err(WidgetError::init(message.clone())),
            None => Ok(Rc::clone(&self.runtime) as Rc<dyn ScriptRuntime>),
        };
        async move { result }.boxed_local()
    }
}
