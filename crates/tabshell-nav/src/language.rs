//! Language identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shortest accepted language code.
const MIN_LEN: usize = 2;

/// Longest accepted language code.
const MAX_LEN: usize = 8;

/// Language code carried in the trailing URL path segment (e.g. `en`, `de`).
///
/// Codes are 2 to 8 lowercase ASCII letters. Whether a code is actually served
/// is decided by the [`RouteCodec`](crate::RouteCodec) language list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageId(String);

/// Error returned for malformed language codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid language code '{0}': expected 2-8 lowercase ASCII letters")]
pub struct LanguageError(pub String);

impl LanguageId {
    /// Parse and validate a language code.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError`] if the code is not 2-8 lowercase ASCII letters.
    pub fn new(code: impl Into<String>) -> Result<Self, LanguageError> {
        let code = code.into();
        let valid = (MIN_LEN..=MAX_LEN).contains(&code.len())
            && code.bytes().all(|b| b.is_ascii_lowercase());
        if valid {
            Ok(Self(code))
        } else {
            Err(LanguageError(code))
        }
    }

    /// English, the fallback language.
    #[must_use]
    pub fn english() -> Self {
        Self("en".to_owned())
    }

    /// Wrap a code known to be valid at compile time.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(Self::new(code).is_ok(), "invalid static language code {code}");
        Self(code.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageId {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageId {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageId {
    type Error = LanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageId> for String {
    fn from(value: LanguageId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert_eq!(LanguageId::new("en").unwrap().as_str(), "en");
        assert_eq!(LanguageId::new("klingon").unwrap().as_str(), "klingon");
    }

    #[test]
    fn test_rejects_uppercase_and_digits() {
        assert!(LanguageId::new("EN").is_err());
        assert!(LanguageId::new("e1").is_err());
        assert!(LanguageId::new("").is_err());
        assert!(LanguageId::new("x").is_err());
        assert!(LanguageId::new("toolonglang").is_err());
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(LanguageId::default(), LanguageId::english());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<LanguageId, _> = serde_json::from_str("\"de\"");
        assert!(ok.is_ok());

        let bad: Result<LanguageId, _> = serde_json::from_str("\"DE\"");
        assert!(bad.is_err());
    }
}
