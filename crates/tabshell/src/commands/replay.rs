//! `tabshell replay` command implementation.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use clap::{Args, ValueEnum};
use serde::Serialize;
use tabshell_config::{CliSettings, Config, FetchFailurePolicy};
use tabshell_core::widgets::programming::{EXECUTE_CLASS, OUTPUT_ID};
use tabshell_core::widgets::{
    CodeEditor, MapWidget, ProgrammingWidget, RuntimeLoader, runtime_index_url,
};
use tabshell_core::{
    ControllerOptions, Document, EchoRuntimeLoader, FailurePolicy, HeadlessDocument,
    HeadlessEditor, HeadlessHistory, History, InputRouter, KeyAction, KeyChord, KeyDisposition,
    NoopSearch, PageHooks, Selector, StaticLanguage, TabController, WidgetRegistry,
};
use tabshell_fragments::{FragmentLoader, FsFragmentLoader};
use tabshell_nav::{NavigationState, TabId};
use tokio::task::LocalSet;

use crate::error::CliError;
use crate::output::Output;

/// Fetch failure policy accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Rollback,
    ErrorBanner,
}

impl From<PolicyArg> for FetchFailurePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Rollback => Self::Rollback,
            PolicyArg::ErrorBanner => Self::ErrorBanner,
        }
    }
}

/// One replayed user or browser action.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    /// Click the tab menu entry of a tab.
    Click(TabId),
    /// Press a key chord.
    Key(KeyChord),
    /// Type a program into the code editor and press its run button.
    Run(String),
    Back,
    Forward,
    /// Wait until pending transitions have settled.
    Wait,
}

/// Error returned for malformed steps.
#[derive(Debug, thiserror::Error)]
#[error("Invalid step '{step}': {reason}")]
struct StepError {
    step: String,
    reason: String,
}

impl FromStr for Step {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| StepError {
            step: s.to_owned(),
            reason,
        };
        match s.split_once(':') {
            Some(("click", tab)) => tab
                .parse()
                .map(Self::Click)
                .map_err(|err: tabshell_nav::UnknownTab| invalid(err.to_string())),
            Some(("key", chord)) => chord
                .parse()
                .map(Self::Key)
                .map_err(|err: tabshell_core::ChordError| invalid(err.to_string())),
            Some(("run", code)) => Ok(Self::Run(code.replace("\\n", "\n"))),
            None if s == "back" => Ok(Self::Back),
            None if s == "forward" => Ok(Self::Forward),
            None if s == "wait" => Ok(Self::Wait),
            _ => Err(invalid(
                "expected click:<tab>, key:<chord>, run:<code>, back, forward or wait".to_owned(),
            )),
        }
    }
}

/// Arguments for the replay command.
#[derive(Args)]
pub(crate) struct ReplayArgs {
    /// Path to configuration file (default: auto-discover tabshell.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fragment directory (overrides config).
    #[arg(short, long)]
    fragments_dir: Option<PathBuf>,

    /// Fetch timeout in milliseconds, 0 disables (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Behavior when a fragment cannot be fetched (overrides config).
    #[arg(long, value_enum)]
    on_fetch_failure: Option<PolicyArg>,

    /// Initial URL (default: the default language's start page).
    #[arg(short, long)]
    url: Option<String>,

    /// Step to replay; repeatable. Steps run back to back unless separated
    /// by `wait`.
    #[arg(short, long = "step", value_name = "STEP")]
    steps: Vec<Step>,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable verbose output (transition timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Outcome of a key step.
#[derive(Debug, Serialize)]
struct KeyReport {
    chord: String,
    handled: bool,
}

/// Final state of a replay.
#[derive(Debug, Serialize)]
struct ReplayReport {
    state: NavigationState,
    url: String,
    active_panel: Option<TabId>,
    error: Option<String>,
    commits: usize,
    history_entries: usize,
    keys: Vec<KeyReport>,
    /// Index the script runtime was loaded from, once the programming tab ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime_index: Option<String>,
    /// Output area of the programming tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    program_output: Option<String>,
}

impl ReplayArgs {
    /// Execute the replay command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or a keybinding is invalid.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            fragments_dir: self.fragments_dir,
            timeout_ms: self.timeout_ms,
            on_fetch_failure: self.on_fetch_failure.map(Into::into),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if !self.json {
            output.info(&format!(
                "Fragments: {}",
                config.fragments_resolved.source_dir.display()
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let report = LocalSet::new().block_on(
            &runtime,
            replay(&config, self.url.as_deref(), &self.steps),
        )?;

        if self.json {
            output.data(&serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&output, &report);
        }
        Ok(())
    }
}

fn print_report(output: &Output, report: &ReplayReport) {
    output.field("state", &report.state.to_string());
    output.field("url", &report.url);
    output.field(
        "panel",
        report.active_panel.map_or("-", TabId::as_str),
    );
    output.field("commits", &report.commits.to_string());
    if let Some(index) = &report.runtime_index {
        output.field("runtime", index);
    }
    if let Some(text) = &report.program_output {
        output.field("output", text);
    }
    for key in &report.keys {
        let outcome = if key.handled { "handled" } else { "passed through" };
        output.field("key", &format!("{} {outcome}", key.chord));
    }
    match &report.error {
        Some(error) => output.warning(error),
        None => output.success("Done"),
    }
}

fn controller_options(config: &Config) -> ControllerOptions {
    ControllerOptions {
        fetch_timeout: config.fragments_resolved.timeout(),
        failure_policy: match config.transitions.on_fetch_failure {
            FetchFailurePolicy::Rollback => FailurePolicy::Rollback,
            FetchFailurePolicy::ErrorBanner => FailurePolicy::ErrorBanner,
        },
    }
}

/// Start a headless shell and apply `steps`. Must run inside a [`LocalSet`].
async fn replay(
    config: &Config,
    url: Option<&str>,
    steps: &[Step],
) -> Result<ReplayReport, CliError> {
    let codec = config.site.route_codec();
    let start_url = match url {
        Some(url) => url.to_owned(),
        None => {
            let state =
                NavigationState::new(TabId::DEFAULT, config.site.default_language.clone(), None);
            codec.encode(&state).path
        }
    };

    let document = Rc::new(HeadlessDocument::new());
    let history = Rc::new(HeadlessHistory::new(&start_url));
    let loader = Rc::new(FsFragmentLoader::new(&config.fragments_resolved.source_dir));

    let widgets = WidgetRegistry::new();
    widgets.register(
        TabId::Maps,
        Rc::new(MapWidget::new(
            Rc::clone(&document) as Rc<dyn Document>,
            config.widgets.map_tiles_url.clone(),
        )),
    );
    let editor = Rc::new(HeadlessEditor::new());
    let runtime_loader = Rc::new(EchoRuntimeLoader::new());
    widgets.register(
        TabId::Programming,
        Rc::new(ProgrammingWidget::new(
            Rc::clone(&document) as Rc<dyn Document>,
            Rc::clone(&editor) as Rc<dyn CodeEditor>,
            Rc::clone(&runtime_loader) as Rc<dyn RuntimeLoader>,
            runtime_index_url(&history.location(), &config.site.deploy_prefix),
        )),
    );

    let hooks = PageHooks::new(
        Rc::new(StaticLanguage::new(config.site.default_language.clone())),
        Rc::new(NoopSearch),
    );

    let controller = TabController::builder(
        Rc::clone(&document) as Rc<dyn Document>,
        loader as Rc<dyn FragmentLoader>,
        Rc::clone(&history) as Rc<dyn History>,
    )
    .codec(codec)
    .widgets(Rc::new(widgets))
    .hooks(hooks)
    .options(controller_options(config))
    .build();

    let keys = &config.keybindings;
    let router = InputRouter::with_bindings(
        Rc::clone(&document) as Rc<dyn Document>,
        [
            (keys.focus_tab_menu.as_str(), KeyAction::FocusTabMenu),
            (keys.focus_search.as_str(), KeyAction::FocusSearch),
            (keys.focus_toc.as_str(), KeyAction::FocusToc),
        ],
    )
    .map_err(|err| CliError::Validation(format!("Invalid keybinding: {err}")))?;
    router.bind_menu(&controller);

    let commits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&commits);
    controller.subscribe(move |_| counter.set(counter.get() + 1));

    controller.start();
    controller.settle().await;

    let mut key_reports = Vec::new();
    for step in steps {
        tracing::debug!(?step, "Replaying step");
        match step {
            Step::Click(tab) => {
                if document.click(&Selector::MenuItem(*tab)) == 0 {
                    tracing::warn!(tab = %tab, "No menu entry to click");
                }
            }
            Step::Key(chord) => key_reports.push(KeyReport {
                chord: chord.to_string(),
                handled: router.handle_key(chord) == KeyDisposition::Handled,
            }),
            Step::Run(code) => {
                editor.set_code(code.as_str());
                if document.click(&Selector::class(EXECUTE_CLASS)) == 0 {
                    tracing::warn!("No run button to press");
                }
            }
            Step::Back => {
                if !history.back() {
                    tracing::warn!("Already at the first history entry");
                }
            }
            Step::Forward => {
                if !history.forward() {
                    tracing::warn!("Already at the last history entry");
                }
            }
            Step::Wait => controller.settle().await,
        }
    }
    controller.settle().await;

    Ok(ReplayReport {
        state: controller.state(),
        url: history.location().to_string(),
        active_panel: document.active_panels().first().copied(),
        error: document.error(),
        commits: commits.get(),
        history_entries: history.len(),
        keys: key_reports,
        runtime_index: runtime_loader.requested().into_iter().next(),
        program_output: document.text(OUTPUT_ID),
    })
}
