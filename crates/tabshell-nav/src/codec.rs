//! URL/history codec.
//!
//! Maps a [`Location`] to a [`NavigationState`] and back. Decoding never fails
//! from the caller's point of view: malformed locations fall back to the
//! default tab. [`RouteCodec::try_decode`] exposes the underlying error for
//! diagnostics.
//!
//! # Encoding
//!
//! | State | Location |
//! |---|---|
//! | `en`, `general`, no hash | `/en/#general` |
//! | `de`, `maps`, `berlin` | `/de/#maps/berlin` |
//! | `en`, `math`, `a/b c` | `/en/#math/a%2Fb%20c` |
//!
//! Decoding additionally accepts `?tab=maps` when the hash is empty, ignores a
//! trailing deployment segment (`build/`) and an `*.html` file name, and picks
//! the language from the last remaining path segment.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::language::LanguageId;
use crate::location::Location;
use crate::state::NavigationState;
use crate::tab::{TabId, UnknownTab};

/// Characters escaped in the anchor part of the hash.
///
/// `/` separates tab and anchor, so it must be escaped inside the anchor.
const ANCHOR: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Deployment segment ignored by default.
const DEFAULT_DEPLOY_PREFIX: &str = "build";

/// Reason a location could not be decoded exactly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteDecodeError {
    /// The hash or `tab` query parameter names no known tab.
    #[error(transparent)]
    UnknownTab(#[from] UnknownTab),
    /// A percent-encoded part is not valid UTF-8.
    #[error("Invalid percent-encoding in '{0}'")]
    InvalidEncoding(String),
}

/// Bidirectional mapping between browser locations and navigation state.
#[derive(Clone, Debug)]
pub struct RouteCodec {
    base_path: String,
    deploy_prefix: Option<String>,
    default_language: LanguageId,
    languages: Vec<LanguageId>,
}

impl Default for RouteCodec {
    fn default() -> Self {
        Self::new(
            "/",
            Some(DEFAULT_DEPLOY_PREFIX),
            LanguageId::english(),
            vec![LanguageId::english(), LanguageId::from_static("de")],
        )
    }
}

impl RouteCodec {
    /// Create a codec.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Path prefix placed before the language segment on encode
    /// * `deploy_prefix` - Path segment ignored on decode (e.g. `build`)
    /// * `default_language` - Language used when the path carries none
    /// * `languages` - Languages recognized in the path; the default is always included
    #[must_use]
    pub fn new(
        base_path: &str,
        deploy_prefix: Option<&str>,
        default_language: LanguageId,
        mut languages: Vec<LanguageId>,
    ) -> Self {
        if !languages.contains(&default_language) {
            languages.push(default_language.clone());
        }

        let trimmed = base_path.trim_matches('/');
        let base_path = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        };

        Self {
            base_path,
            deploy_prefix: deploy_prefix
                .map(|p| p.trim_matches('/'))
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
            default_language,
            languages,
        }
    }

    #[must_use]
    pub fn default_language(&self) -> &LanguageId {
        &self.default_language
    }

    #[must_use]
    pub fn languages(&self) -> &[LanguageId] {
        &self.languages
    }

    /// Decode a location, falling back to the default tab on malformed input.
    ///
    /// The language is always recovered independently of the tab, so a bad
    /// hash never resets the language.
    #[must_use]
    pub fn decode(&self, location: &Location) -> NavigationState {
        match self.try_decode(location) {
            Ok(state) => state,
            Err(err) => {
                tracing::debug!(location = %location, error = %err, "Falling back to default tab");
                NavigationState::new(TabId::DEFAULT, self.decode_language(&location.path), None)
            }
        }
    }

    /// Decode a location, reporting why it could not be decoded exactly.
    ///
    /// A location without any tab information decodes to the default tab
    /// without error.
    ///
    /// # Errors
    ///
    /// Returns [`RouteDecodeError`] if the hash or query names an unknown tab
    /// or carries invalid percent-encoding.
    pub fn try_decode(&self, location: &Location) -> Result<NavigationState, RouteDecodeError> {
        let language = self.decode_language(&location.path);

        let (tab_part, anchor_part) = if location.hash.is_empty() {
            // Query values arrive form-decoded.
            match location.query_param("tab") {
                Some(tab) if !tab.is_empty() => (Cow::Owned(tab), None),
                _ => return Ok(NavigationState::new(TabId::DEFAULT, language, None)),
            }
        } else {
            let (tab, anchor) = match location.hash.split_once('/') {
                Some((tab, anchor)) => (tab, Some(anchor)),
                None => (location.hash.as_str(), None),
            };
            (decode_part(tab)?, anchor)
        };

        let tab: TabId = tab_part.parse()?;
        let hash = anchor_part
            .map(decode_part)
            .transpose()?
            .map(Cow::into_owned);

        Ok(NavigationState::new(tab, language, hash))
    }

    /// Produce the canonical location for a state.
    #[must_use]
    pub fn encode(&self, state: &NavigationState) -> Location {
        let path = format!("{}{}/", self.base_path, state.language);
        let hash = match &state.hash {
            Some(anchor) => format!("{}/{}", state.tab, utf8_percent_encode(anchor, ANCHOR)),
            None => state.tab.to_string(),
        };
        Location::new(path, "", hash)
    }

    /// Language named by the last meaningful path segment, or the default.
    fn decode_language(&self, path: &str) -> LanguageId {
        let segment = path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter(|s| Some(*s) != self.deploy_prefix.as_deref())
            .rfind(|s| !s.ends_with(".html"));

        let Some(segment) = segment else {
            return self.default_language.clone();
        };

        match self.languages.iter().find(|lang| lang.as_str() == segment) {
            Some(language) => language.clone(),
            None => {
                if LanguageId::new(segment).is_ok() {
                    tracing::debug!(segment, "Unsupported language in path, using default");
                }
                self.default_language.clone()
            }
        }
    }
}

fn decode_part(part: &str) -> Result<Cow<'_, str>, RouteDecodeError> {
    percent_decode_str(part)
        .decode_utf8()
        .map_err(|_| RouteDecodeError::InvalidEncoding(part.to_owned()))
}
