//! Navigation state and transition requests.

use std::fmt;

use serde::Serialize;

use crate::language::LanguageId;
use crate::tab::TabId;

/// What is currently shown: the committed tab, language and optional anchor.
///
/// Exactly one instance exists per shell and it is only replaced by the tab
/// controller when a transition commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    /// Active tab.
    pub tab: TabId,
    /// Active language.
    pub language: LanguageId,
    /// Element id inside the tab to scroll to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl NavigationState {
    /// Create a state. An empty hash is treated as no hash.
    #[must_use]
    pub fn new(tab: TabId, language: LanguageId, hash: Option<String>) -> Self {
        Self {
            tab,
            language,
            hash: normalize_hash(hash),
        }
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new(TabId::DEFAULT, LanguageId::default(), None)
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.tab)?;
        if let Some(hash) = &self.hash {
            write!(f, "#{hash}")?;
        }
        Ok(())
    }
}

/// Where a navigation intent came from.
///
/// Decides how the committed state is written back to history: user gestures
/// push a new entry, startup and back/forward replace the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionOrigin {
    /// Initial load of the page.
    Startup,
    /// Menu click or other in-page gesture.
    User,
    /// Browser back/forward.
    History,
}

/// A single navigation intent, consumed by the tab controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Committed tab at the time the request was made.
    pub from: TabId,
    /// Destination tab.
    pub to: TabId,
    /// Anchor to scroll to once the destination is mounted.
    pub target_hash: Option<String>,
    /// Language to commit with the tab. `None` keeps the page's language.
    pub language: Option<LanguageId>,
    pub origin: TransitionOrigin,
}

impl TransitionRequest {
    #[must_use]
    pub fn new(
        from: TabId,
        to: TabId,
        target_hash: Option<String>,
        origin: TransitionOrigin,
    ) -> Self {
        Self {
            from,
            to,
            target_hash: normalize_hash(target_hash),
            language: None,
            origin,
        }
    }

    /// Commit `language` together with the destination tab.
    #[must_use]
    pub fn with_language(mut self, language: Option<LanguageId>) -> Self {
        self.language = language;
        self
    }
}

fn normalize_hash(hash: Option<String>) -> Option<String> {
    hash.filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash_is_none() {
        let state = NavigationState::new(TabId::Maps, LanguageId::english(), Some(String::new()));
        assert_eq!(state.hash, None);

        let request = TransitionRequest::new(
            TabId::General,
            TabId::Maps,
            Some(String::new()),
            TransitionOrigin::User,
        );
        assert_eq!(request.target_hash, None);
        assert_eq!(request.language, None);
    }

    #[test]
    fn test_display() {
        let state = NavigationState::new(
            TabId::Math,
            LanguageId::new("de").unwrap(),
            Some("integrals".to_owned()),
        );
        assert_eq!(state.to_string(), "de:math#integrals");
        assert_eq!(NavigationState::default().to_string(), "en:general");
    }

    #[test]
    fn test_serialize_skips_missing_hash() {
        let json = serde_json::to_value(NavigationState::default()).unwrap();
        assert_eq!(json["tab"], "general");
        assert_eq!(json["language"], "en");
        assert!(json.get("hash").is_none());
    }
}
