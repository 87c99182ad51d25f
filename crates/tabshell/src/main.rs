//! Tab shell CLI.
//!
//! Provides commands for:
//! - `replay`: Drive a headless tab shell through clicks, keys and history steps
//! - `route`: Decode a URL into its navigation state

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ReplayArgs, RouteArgs};
use output::Output;

/// Tab shell - headless tab lifecycle driver.
#[derive(Parser)]
#[command(name = "tabshell", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a headless shell at a URL and replay navigation steps.
    Replay(ReplayArgs),
    /// Decode a URL and print its canonical form.
    Route(RouteArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Replay(args) => args.verbose,
        Commands::Route(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Replay(args) => args.execute(),
        Commands::Route(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
