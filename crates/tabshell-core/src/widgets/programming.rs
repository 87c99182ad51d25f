//! Code editor and script runtime of the programming tab.
//!
//! The runtime is expensive to load, so it is created once on first
//! activation and reused across teardowns. The editor and the execute button
//! listener belong to the mounted markup and are recreated per activation.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tabshell_fragments::asset_base_path;
use tabshell_nav::Location;
use tokio::sync::OnceCell;

use crate::document::{Document, Handler, Selector};
use crate::widget::{Widget, WidgetError};

/// Element the editor mounts into.
pub const EDITOR_CONTAINER_ID: &str = "code-editor";
/// Element receiving the program's standard output.
pub const OUTPUT_ID: &str = "code-output";
/// Element receiving the program's error output.
pub const ERROR_ID: &str = "code-error";
/// Class of the button that runs the editor's code.
pub const EXECUTE_CLASS: &str = "code-editor-execute";

/// Runtime package index, relative to the site's asset base.
pub const RUNTIME_INDEX_DIR: &str = "common/pyodide/";

const EXECUTE_LISTENER_KEY: &str = "programming-execute";

/// Runtime package index for a page.
///
/// The index is shared by every deployment of the site, so a deployment
/// segment in the page path is stripped: `/cheats/build/en/` loads from
/// `/cheats/common/pyodide/`.
#[must_use]
pub fn runtime_index_url(page: &Location, deploy_prefix: &str) -> String {
    format!(
        "{}{RUNTIME_INDEX_DIR}",
        asset_base_path(&page.path, deploy_prefix)
    )
}

/// Embedded code editor.
pub trait CodeEditor {
    /// Create the editor inside the element with `container_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError`] if the editor cannot be created.
    fn mount(&self, container_id: &str) -> Result<(), WidgetError>;

    /// Current source text.
    fn code(&self) -> String;

    fn dispose(&self);
}

/// Loaded script interpreter.
pub trait ScriptRuntime {
    /// Run `code`, passing output chunks to `stdout` as they are produced.
    ///
    /// # Errors
    ///
    /// Returns the interpreter's error text if the program fails.
    fn run(&self, code: &str, stdout: &mut dyn FnMut(&str)) -> Result<(), String>;
}

/// Fetches and boots a [`ScriptRuntime`].
pub trait RuntimeLoader {
    fn load(&self, index_url: &str) -> LocalBoxFuture<'_, Result<Rc<dyn ScriptRuntime>, WidgetError>>;
}

/// Widget of the programming tab.
pub struct ProgrammingWidget {
    document: Rc<dyn Document>,
    editor: Rc<dyn CodeEditor>,
    loader: Rc<dyn RuntimeLoader>,
    index_url: String,
    runtime: OnceCell<Rc<dyn ScriptRuntime>>,
    editor_mounted: Cell<bool>,
}

impl ProgrammingWidget {
    /// # Arguments
    ///
    /// * `index_url` - Location of the runtime's package index
    #[must_use]
    pub fn new(
        document: Rc<dyn Document>,
        editor: Rc<dyn CodeEditor>,
        loader: Rc<dyn RuntimeLoader>,
        index_url: impl Into<String>,
    ) -> Self {
        Self {
            document,
            editor,
            loader,
            index_url: index_url.into(),
            runtime: OnceCell::new(),
            editor_mounted: Cell::new(false),
        }
    }

    /// Whether the runtime has been loaded.
    #[must_use]
    pub fn runtime_loaded(&self) -> bool {
        self.runtime.initialized()
    }

    async fn runtime(&self) -> Result<Rc<dyn ScriptRuntime>, WidgetError> {
        let runtime = self
            .runtime
            .get_or_try_init(|| async {
                tracing::info!(index_url = %self.index_url, "Loading script runtime");
                self.loader.load(&self.index_url).await
            })
            .await?;
        Ok(Rc::clone(runtime))
    }

    fn bind_execute(&self, runtime: Rc<dyn ScriptRuntime>) -> usize {
        let document = Rc::downgrade(&self.document);
        let editor = Rc::clone(&self.editor);
        let handler: Handler = Rc::new(move || execute(&document, editor.as_ref(), runtime.as_ref()));
        self.document.add_listener(
            &Selector::class(EXECUTE_CLASS),
            "click",
            EXECUTE_LISTENER_KEY,
            handler,
        )
    }
}

impl Widget for ProgrammingWidget {
    fn initialize(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        async move {
            if !self.editor_mounted.get() {
                self.editor.mount(EDITOR_CONTAINER_ID)?;
                self.editor_mounted.set(true);
            }

            let runtime = self.runtime().await?;
            self.document.set_visible(OUTPUT_ID, true);
            if self.bind_execute(runtime) == 0 {
                tracing::warn!("Execute button not found");
            }
            Ok(())
        }
        .boxed_local()
    }

    fn teardown(&self) {
        if self.editor_mounted.replace(false) {
            self.editor.dispose();
        }
        self.document.remove_listeners(EXECUTE_LISTENER_KEY);
    }
}

fn execute(document: &Weak<dyn Document>, editor: &dyn CodeEditor, runtime: &dyn ScriptRuntime) {
    let Some(document) = document.upgrade() else {
        return;
    };

    document.set_text(OUTPUT_ID, "");
    document.set_text(ERROR_ID, "");
    document.set_visible(ERROR_ID, false);

    let code = editor.code();
    let result = runtime.run(&code, &mut |chunk: &str| {
        document.append_text(OUTPUT_ID, &escape_markup(chunk));
    });

    if let Err(message) = result {
        tracing::debug!(error = %message, "Program failed");
        document.set_text(ERROR_ID, &escape_markup(&message));
        document.set_visible(ERROR_ID, true);
    }
}

fn escape_markup(text: &str) -> String {
    text.replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{EchoRuntimeLoader, HeadlessEditor};
    use crate::HeadlessDocument;
    use pretty_assertions::assert_eq;
    use tabshell_nav::TabId;

    const PANEL: &str = concat!(
        "<div id=\"code-editor\"></div>",
        "<button class=\"code-editor-execute\">Run</button>",
        "<pre id=\"code-output\"></pre>",
        "<pre id=\"code-error\"></pre>",
    );

    struct Fixture {
        doc: Rc<HeadlessDocument>,
        editor: Rc<HeadlessEditor>,
        loader: Rc<EchoRuntimeLoader>,
        widget: ProgrammingWidget,
    }

    fn fixture_with(loader: EchoRuntimeLoader, index_url: &str) -> Fixture {
        let doc = Rc::new(HeadlessDocument::new());
        doc.mount_panel(TabId::Programming, PANEL);
        let editor = Rc::new(HeadlessEditor::new());
        let loader = Rc::new(loader);
        let widget = ProgrammingWidget::new(
            Rc::clone(&doc) as Rc<dyn Document>,
            Rc::clone(&editor) as Rc<dyn CodeEditor>,
            Rc::clone(&loader) as Rc<dyn RuntimeLoader>,
            index_url,
        );
        Fixture {
            doc,
            editor,
            loader,
            widget,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(EchoRuntimeLoader::new(), "https://cdn.example.org/runtime/")
    }

    fn run_button() -> Selector {
        Selector::class(EXECUTE_CLASS)
    }

    #[tokio::test]
    async fn test_double_initialize_binds_once() {
        let f = fixture();

        f.widget.initialize().await.unwrap();
        f.widget.initialize().await.unwrap();

        assert_eq!(f.doc.click(&run_button()), 1);
        assert_eq!(f.loader.runtime().runs(), 1);
        assert_eq!(f.loader.requested().len(), 1);
        assert_eq!(f.editor.mounts(), 1);
    }

    #[tokio::test]
    async fn test_runtime_survives_teardown() {
        let f = fixture();

        f.widget.initialize().await.unwrap();
        f.widget.teardown();
        assert_eq!(f.doc.click(&run_button()), 0);
        assert!(f.widget.runtime_loaded());

        f.widget.initialize().await.unwrap();

        assert_eq!(f.loader.requested().len(), 1);
        assert_eq!(f.editor.mounts(), 2);
        assert_eq!(f.editor.disposals(), 1);
        assert_eq!(f.doc.click(&run_button()), 1);
    }

    #[tokio::test]
    async fn test_execute_writes_escaped_output() {
        let f = fixture();
        f.widget.initialize().await.unwrap();
        f.editor.set_code("<b>bold</b>\n");

        f.doc.click(&run_button());

        assert_eq!(f.doc.text(OUTPUT_ID).as_deref(), Some("&lt;b>bold&lt;/b>"));
        assert_eq!(f.doc.text(ERROR_ID).as_deref(), Some(""));
        assert!(f.doc.is_visible(OUTPUT_ID));
        assert!(!f.doc.is_visible(ERROR_ID));
    }

    #[tokio::test]
    async fn test_execute_shows_error() {
        let f = fixture();
        f.widget.initialize().await.unwrap();
        f.editor.set_code("ok\nraise <oops>");

        f.doc.click(&run_button());

        assert_eq!(f.doc.text(OUTPUT_ID).as_deref(), Some("ok"));
        assert_eq!(f.doc.text(ERROR_ID).as_deref(), Some("Error: &lt;oops>"));
        assert!(f.doc.is_visible(ERROR_ID));
    }

    #[tokio::test]
    async fn test_runtime_load_failure() {
        let f = fixture_with(
            EchoRuntimeLoader::failing("runtime download failed"),
            "https://cdn.example.org/runtime/",
        );

        let err = f.widget.initialize().await.unwrap_err();

        assert_eq!(err, WidgetError::init("runtime download failed"));
        assert!(!f.widget.runtime_loaded());
        assert_eq!(f.doc.listener_count(EXECUTE_LISTENER_KEY), 0);
    }

    #[test]
    fn test_runtime_index_url_strips_deploy_segment() {
        let page = Location::parse("https://example.org/cheats/build/de/#programming");
        assert_eq!(runtime_index_url(&page, "build"), "/cheats/common/pyodide/");

        let page = Location::parse("/cheats/en/index.html");
        assert_eq!(runtime_index_url(&page, "build"), "/cheats/en/common/pyodide/");
    }

    #[tokio::test]
    async fn test_runtime_loaded_from_page_index() {
        let page = Location::parse("/build/en/#programming");
        let f = fixture_with(EchoRuntimeLoader::new(), &runtime_index_url(&page, "build"));

        f.widget.initialize().await.unwrap();

        assert_eq!(f.loader.requested(), vec!["/common/pyodide/"]);
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(escape_markup("a < b <c>"), "a &lt; b &lt;c>");
    }
}
