//! `${VAR}` references in `tabshell.toml` values.
//!
//! Tile URL templates and fragment paths may carry a literal `$`, so only the
//! braced form is expanded. `${VAR}` must be set; `${VAR:-default}` falls back
//! to `default`. Fragment directories also expand a leading `~`.

use std::borrow::Cow;
use std::env::{self, VarError};

use crate::ConfigError;

/// Expand `${VAR}` references in the value of `field`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| env::var(var).map(Some))
        .map(Cow::into_owned)
        .map_err(|err| {
            let reason = match err.cause {
                VarError::NotPresent => "not set",
                VarError::NotUnicode(_) => "is not valid unicode",
            };
            ConfigError::EnvVar {
                field: field.to_owned(),
                message: format!("${{{}}} {reason}", err.var_name),
            }
        })
}

/// Expand `${VAR}` references and a leading `~` in a directory value.
pub(crate) fn expand_dir(value: &str, field: &str) -> Result<String, ConfigError> {
    let value = expand_env(value, field)?;
    Ok(shellexpand::tilde_with_context(&value, || env::var("HOME").ok()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tiles_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            env::set_var("TABSHELL_TEST_TILES", "https://tiles.example.com");
        }
        let result = expand_env(
            "${TABSHELL_TEST_TILES}/{z}/{x}/{y}.png",
            "widgets.map_tiles_url",
        )
        .unwrap();
        assert_eq!(result, "https://tiles.example.com/{z}/{x}/{y}.png");
        unsafe {
            env::remove_var("TABSHELL_TEST_TILES");
        }
    }

    #[test]
    fn test_expand_default_fragments_dir() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            env::remove_var("TABSHELL_UNSET_VAR");
        }
        let result = expand_env("${TABSHELL_UNSET_VAR:-/srv/fragments}", "fragments.source_dir")
            .unwrap();
        assert_eq!(result, "/srv/fragments");
    }

    #[test]
    fn test_expand_empty_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            env::remove_var("TABSHELL_UNSET_EMPTY");
        }
        let result = expand_env("${TABSHELL_UNSET_EMPTY:-}", "widgets.map_tiles_url").unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_unset_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            env::remove_var("TABSHELL_MISSING_VAR");
        }
        let err = expand_env("${TABSHELL_MISSING_VAR}", "site.base_path").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in site.base_path: ${TABSHELL_MISSING_VAR} not set"
        );
    }

    #[test]
    fn test_bare_dollar_kept() {
        let result = expand_env("https://tiles.example.com/$z", "widgets.map_tiles_url").unwrap();
        assert_eq!(result, "https://tiles.example.com/$z");
    }

    #[test]
    fn test_expand_dir_tilde() {
        let Ok(home) = env::var("HOME") else {
            return;
        };
        assert_eq!(
            expand_dir("~/fragments", "fragments.source_dir").unwrap(),
            format!("{home}/fragments")
        );
        assert_eq!(
            expand_dir("site/~/fragments", "fragments.source_dir").unwrap(),
            "site/~/fragments"
        );
    }
}
