//! `tabshell route` command implementation.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabshell_config::Config;
use tabshell_nav::{Location, NavigationState, RouteCodec};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the route command.
#[derive(Args)]
pub(crate) struct RouteArgs {
    /// URL or path to decode (e.g. `/de/#maps/berlin`).
    url: String,

    /// Path to configuration file (default: auto-discover tabshell.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Decoded route.
#[derive(Debug, Serialize)]
struct RouteReport {
    state: NavigationState,
    canonical: String,
    /// Why the location fell back to the default tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<String>,
}

fn decode(codec: &RouteCodec, url: &str) -> Result<RouteReport, CliError> {
    let location = Location::try_parse(url)
        .map_err(|err| CliError::Validation(format!("Invalid URL '{url}': {err}")))?;
    let state = codec.decode(&location);
    Ok(RouteReport {
        canonical: codec.encode(&state).to_string(),
        fallback: codec.try_decode(&location).err().map(|err| err.to_string()),
        state,
    })
}

impl RouteArgs {
    /// Execute the route command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails to load or the URL cannot be
    /// parsed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let report = decode(&config.site.route_codec(), &self.url)?;

        if self.json {
            output.data(&serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        output.field("tab", report.state.tab.as_str());
        output.field("language", report.state.language.as_str());
        output.field("hash", report.state.hash.as_deref().unwrap_or("-"));
        output.field("canonical", &report.canonical);
        if let Some(reason) = &report.fallback {
            output.warning(&format!("Fell back to the default tab: {reason}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabshell_nav::TabId;

    #[test]
    fn test_decode_report() {
        let report = decode(&RouteCodec::default(), "https://example.org/build/de/?tab=maps").unwrap();
        assert_eq!(report.state.tab, TabId::Maps);
        assert_eq!(report.canonical, "/de/#maps");
        assert_eq!(report.fallback, None);
    }

    #[test]
    fn test_decode_report_fallback() {
        let report = decode(&RouteCodec::default(), "/en/#nowhere").unwrap();
        assert_eq!(report.state.tab, TabId::General);
        assert_eq!(report.fallback.as_deref(), Some("Unknown tab: nowhere"));
    }

    #[test]
    fn test_decode_rejects_unparsable_url() {
        let err = decode(&RouteCodec::default(), "http://[::1/en/").unwrap_err();
        assert!(matches!(err, CliError::Validation(message) if message.starts_with("Invalid URL")));
    }

    #[test]
    fn test_report_json_omits_missing_parts() {
        let report = decode(&RouteCodec::default(), "/en/#math").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": {"tab": "math", "language": "en"},
                "canonical": "/en/#math",
            })
        );
    }
}
