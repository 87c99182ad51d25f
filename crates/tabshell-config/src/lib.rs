//! Configuration management for tabshell.
//!
//! Parses `tabshell.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.base_path`
//! - `fragments.source_dir`
//! - `widgets.map_tiles_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tabshell_nav::{LanguageId, RouteCodec};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override fragment source directory.
    pub fragments_dir: Option<PathBuf>,
    /// Override fetch timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Override the fetch failure policy.
    pub on_fetch_failure: Option<FetchFailurePolicy>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tabshell.toml";

/// Default fetch timeout.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Longest accepted fetch timeout (one hour).
const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL layout of the site.
    pub site: SiteConfig,
    /// Fragment loading configuration (paths are relative strings from TOML).
    fragments: FragmentsConfigRaw,
    /// Tab transition behavior.
    pub transitions: TransitionsConfig,
    /// Global key chords.
    pub keybindings: KeybindingsConfig,
    /// Per-tab widget settings.
    pub widgets: WidgetsConfig,

    /// Resolved fragments configuration (set after loading).
    #[serde(skip)]
    pub fragments_resolved: FragmentsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// URL layout configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Path prefix before the language segment.
    pub base_path: String,
    /// Deployment segment ignored when decoding URLs. Empty disables it.
    pub deploy_prefix: String,
    /// Language used when the URL carries none.
    pub default_language: LanguageId,
    /// Languages served by the site.
    pub languages: Vec<LanguageId>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let codec = RouteCodec::default();
        Self {
            base_path: "/".to_owned(),
            deploy_prefix: "build".to_owned(),
            default_language: codec.default_language().clone(),
            languages: codec.languages().to_vec(),
        }
    }
}

impl SiteConfig {
    /// Build the URL codec described by this section.
    #[must_use]
    pub fn route_codec(&self) -> RouteCodec {
        let deploy_prefix = Some(self.deploy_prefix.as_str()).filter(|p| !p.is_empty());
        RouteCodec::new(
            &self.base_path,
            deploy_prefix,
            self.default_language.clone(),
            self.languages.clone(),
        )
    }
}

/// Raw fragments configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FragmentsConfigRaw {
    source_dir: Option<String>,
    timeout_ms: Option<u64>,
}

/// Resolved fragments configuration with absolute paths.
#[derive(Debug, Default)]
pub struct FragmentsConfig {
    /// Directory containing `tab-*.html` fragments.
    pub source_dir: PathBuf,
    /// Fetch timeout in milliseconds (0 disables the timeout).
    pub timeout_ms: u64,
}

impl FragmentsConfig {
    /// Fetch timeout, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// What the shell shows when a tab's fragment cannot be fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchFailurePolicy {
    /// Re-mount the previous tab and show an error banner.
    #[default]
    Rollback,
    /// Leave the previous panel empty and show an error banner.
    ErrorBanner,
}

/// Transition configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransitionsConfig {
    pub on_fetch_failure: FetchFailurePolicy,
}

/// Key chord configuration (e.g. `Alt+KeyT`).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    /// Focus the first tab menu item.
    pub focus_tab_menu: String,
    /// Focus the search input.
    pub focus_search: String,
    /// Focus the first table of contents link.
    pub focus_toc: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            focus_tab_menu: "Alt+KeyT".to_owned(),
            focus_search: "Alt+KeyS".to_owned(),
            focus_toc: "Alt+KeyM".to_owned(),
        }
    }
}

/// Widget configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    /// Tile server for the maps tab. Empty means no tiles.
    pub map_tiles_url: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`widgets.map_tiles_url`").
        field: String,
        /// Error message (e.g., "${`MAP_TILES_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tabshell.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.fragments_dir {
            self.fragments_resolved.source_dir.clone_from(dir);
        }
        if let Some(timeout_ms) = settings.timeout_ms {
            self.fragments_resolved.timeout_ms = timeout_ms;
        }
        if let Some(policy) = settings.on_fetch_failure {
            self.transitions.on_fetch_failure = policy;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            fragments: FragmentsConfigRaw::default(),
            transitions: TransitionsConfig::default(),
            keybindings: KeybindingsConfig::default(),
            widgets: WidgetsConfig::default(),
            fragments_resolved: FragmentsConfig {
                source_dir: base.join("fragments"),
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_fragments()?;
        self.validate_keybindings()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        if !self.site.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "site.base_path must start with /".to_owned(),
            ));
        }
        if self.site.languages.is_empty() {
            return Err(ConfigError::Validation(
                "site.languages cannot be empty".to_owned(),
            ));
        }
        if !self.site.languages.contains(&self.site.default_language) {
            return Err(ConfigError::Validation(format!(
                "site.default_language '{}' must be listed in site.languages",
                self.site.default_language
            )));
        }
        Ok(())
    }

    fn validate_fragments(&self) -> Result<(), ConfigError> {
        if self.fragments_resolved.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "fragments.timeout_ms cannot exceed {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Chord syntax is checked when the input router is built; only emptiness here.
    fn validate_keybindings(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.keybindings.focus_tab_menu, "keybindings.focus_tab_menu")?;
        require_non_empty(&self.keybindings.focus_search, "keybindings.focus_search")?;
        require_non_empty(&self.keybindings.focus_toc, "keybindings.focus_toc")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.base_path = expand::expand_env(&self.site.base_path, "site.base_path")?;

        if let Some(ref dir) = self.fragments.source_dir {
            self.fragments.source_dir = Some(expand::expand_dir(dir, "fragments.source_dir")?);
        }

        if let Some(ref url) = self.widgets.map_tiles_url {
            let expanded = expand::expand_env(url, "widgets.map_tiles_url")?;
            self.widgets.map_tiles_url = Some(expanded).filter(|u| !u.is_empty());
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let source_dir = self.fragments.source_dir.as_deref().unwrap_or("fragments");

        self.fragments_resolved = FragmentsConfig {
            source_dir: config_dir.join(source_dir),
            timeout_ms: self.fragments.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lang(code: &str) -> LanguageId {
        LanguageId::new(code).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.site.base_path, "/");
        assert_eq!(config.site.deploy_prefix, "build");
        assert_eq!(config.site.default_language, lang("en"));
        assert_eq!(config.site.languages, vec![lang("en"), lang("de")]);
        assert_eq!(
            config.fragments_resolved.source_dir,
            PathBuf::from("/test/fragments")
        );
        assert_eq!(
            config.fragments_resolved.timeout(),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            config.transitions.on_fetch_failure,
            FetchFailurePolicy::Rollback
        );
        assert_eq!(config.keybindings.focus_search, "Alt+KeyS");
        assert!(config.widgets.map_tiles_url.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.site.base_path, "/");
        assert_eq!(config.keybindings.focus_toc, "Alt+KeyM");
    }

    #[test]
    fn test_parse_site_config() {
        let toml = r#"
[site]
base_path = "/cheats/"
deploy_prefix = ""
default_language = "de"
languages = ["de", "fr"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.site.base_path, "/cheats/");
        assert_eq!(config.site.default_language, lang("de"));
        assert_eq!(config.site.languages, vec![lang("de"), lang("fr")]);
    }

    #[test]
    fn test_parse_rejects_malformed_language() {
        let toml = r#"
[site]
languages = ["EN"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_failure_policy() {
        let toml = r#"
[transitions]
on_fetch_failure = "error-banner"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.transitions.on_fetch_failure,
            FetchFailurePolicy::ErrorBanner
        );
    }

    #[test]
    fn test_route_codec_from_site_config() {
        let toml = r#"
[site]
base_path = "/cheats"
deploy_prefix = "dist"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let codec = config.site.route_codec();
        let state = codec.decode(&tabshell_nav::Location::parse("/cheats/dist/de/#math"));
        assert_eq!(state.language, lang("de"));
        assert_eq!(codec.encode(&state).to_string(), "/cheats/de/#math");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[fragments]
source_dir = "public/fragments"
timeout_ms = 0
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.fragments_resolved.source_dir,
            PathBuf::from("/project/public/fragments")
        );
        assert_eq!(config.fragments_resolved.timeout(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[fragments]
source_dir = "html"

[keybindings]
focus_search = "Ctrl+KeyK"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.fragments_resolved.source_dir, dir.path().join("html"));
        assert_eq!(config.keybindings.focus_search, "Ctrl+KeyK");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = Config::load(Some(Path::new("/nonexistent/tabshell.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_expand_env_vars_map_tiles_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TABSHELL_TEST_MAP_TILES", "https://tiles.example.com/{z}");
        }

        let toml = r#"
[widgets]
map_tiles_url = "${TABSHELL_TEST_MAP_TILES}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.widgets.map_tiles_url.as_deref(),
            Some("https://tiles.example.com/{z}")
        );

        unsafe {
            std::env::remove_var("TABSHELL_TEST_MAP_TILES");
        }
    }

    #[test]
    fn test_expand_env_vars_empty_tiles_url_is_none() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("TABSHELL_TEST_NO_TILES");
        }

        let toml = r#"
[widgets]
map_tiles_url = "${TABSHELL_TEST_NO_TILES:-}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert!(config.widgets.map_tiles_url.is_none());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            fragments_dir: Some(PathBuf::from("/srv/html")),
            timeout_ms: Some(250),
            on_fetch_failure: Some(FetchFailurePolicy::ErrorBanner),
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.fragments_resolved.source_dir,
            PathBuf::from("/srv/html")
        );
        assert_eq!(config.fragments_resolved.timeout_ms, 250);
        assert_eq!(
            config.transitions.on_fetch_failure,
            FetchFailurePolicy::ErrorBanner
        );
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(
            config.fragments_resolved.source_dir,
            PathBuf::from("/test/fragments")
        );
        assert_eq!(config.fragments_resolved.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_default_language_not_listed() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.default_language = lang("fr");
        assert_validation_error(&config, &["site.default_language", "fr"]);
    }

    #[test]
    fn test_validate_empty_languages() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.languages.clear();
        assert_validation_error(&config, &["site.languages"]);
    }

    #[test]
    fn test_validate_relative_base_path() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.base_path = "cheats/".to_owned();
        assert_validation_error(&config, &["site.base_path"]);
    }

    #[test]
    fn test_validate_timeout_too_large() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.fragments_resolved.timeout_ms = MAX_TIMEOUT_MS + 1;
        assert_validation_error(&config, &["fragments.timeout_ms"]);
    }

    #[test]
    fn test_validate_empty_keybinding() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.keybindings.focus_toc = String::new();
        assert_validation_error(&config, &["keybindings.focus_toc"]);
    }
}
