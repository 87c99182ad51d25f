//! Tab identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the mutually exclusive content panels of the site.
///
/// The set is closed: every panel container, menu item and fragment file is
/// named after one of these variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabId {
    General,
    Maps,
    Muzak,
    Programming,
    Keyboard,
    Math,
    Physics,
    Chemistry,
}

impl TabId {
    /// All tabs in menu order.
    pub const ALL: [TabId; 8] = [
        TabId::General,
        TabId::Maps,
        TabId::Muzak,
        TabId::Programming,
        TabId::Keyboard,
        TabId::Math,
        TabId::Physics,
        TabId::Chemistry,
    ];

    /// Tab shown when the location names no tab or an unknown one.
    pub const DEFAULT: TabId = TabId::General;

    /// Identifier used in URLs and `data-tab-id` attributes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Maps => "maps",
            Self::Muzak => "muzak",
            Self::Programming => "programming",
            Self::Keyboard => "keyboard",
            Self::Math => "math",
            Self::Physics => "physics",
            Self::Chemistry => "chemistry",
        }
    }

    /// DOM id of the panel container (`tab-{id}`).
    #[must_use]
    pub fn panel_id(self) -> String {
        format!("tab-{}", self.as_str())
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known tab.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tab: {0}")]
pub struct UnknownTab(pub String);

impl FromStr for TabId {
    type Err = UnknownTab;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| UnknownTab(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_tab() {
        for tab in TabId::ALL {
            assert_eq!(tab.as_str().parse::<TabId>(), Ok(tab));
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "Maps".parse::<TabId>(),
            Err(UnknownTab("Maps".to_owned()))
        );
    }

    #[test]
    fn test_panel_id() {
        assert_eq!(TabId::Programming.panel_id(), "tab-programming");
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&TabId::Chemistry).unwrap();
        assert_eq!(json, "\"chemistry\"");

        let tab: TabId = serde_json::from_str("\"muzak\"").unwrap();
        assert_eq!(tab, TabId::Muzak);
    }
}
