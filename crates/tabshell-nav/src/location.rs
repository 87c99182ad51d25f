//! Browser location split into its path, query and hash parts.

use std::fmt;

use serde::Serialize;
use url::{Url, form_urlencoded};

/// Base that path-only references are resolved against.
const RESOLVE_BASE: &str = "http://localhost/";

/// The parts of a browser location the codec reads and writes.
///
/// `query` and `hash` are stored without their leading `?` / `#`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: String,
    pub query: String,
    pub hash: String,
}

impl Location {
    /// Create a location from already split parts.
    #[must_use]
    pub fn new(path: impl Into<String>, query: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            hash: hash.into(),
        }
    }

    /// Parse a URL or a path-absolute reference.
    ///
    /// Accepts `https://host/path?query#hash`, `//host/path#hash` and
    /// `/path#hash`. Scheme and authority are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the input cannot be resolved to a URL.
    pub fn try_parse(input: &str) -> Result<Self, url::ParseError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RESOLVE_BASE)?.join(input)?,
            Err(err) => return Err(err),
        };
        Ok(Self::from(&url))
    }

    /// Like [`Self::try_parse`], but an unparsable input becomes `/`.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self::try_parse(input).unwrap_or_else(|err| {
            tracing::debug!(input, error = %err, "Unparsable location, using root");
            Self::new("/", "", "")
        })
    }

    /// Look up a query parameter by name, form-decoded (`+` is a space).
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        form_urlencoded::parse(self.query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

impl From<&Url> for Location {
    fn from(url: &Url) -> Self {
        Self::new(
            url.path(),
            url.query().unwrap_or_default(),
            url.fragment().unwrap_or_default(),
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.hash.is_empty() {
            write!(f, "#{}", self.hash)?;
        }
        Ok(())
    }
}
