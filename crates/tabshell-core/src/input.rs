//! Global input router.
//!
//! Translates keyboard chords and tab menu clicks into focus changes and
//! transition requests. These are the only listeners the shell installs
//! outside of widgets.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use tabshell_nav::TabId;

use crate::controller::TabController;
use crate::document::{Document, Handler, Selector};

/// Listener key for tab menu clicks.
const MENU_LISTENER_KEY: &str = "tab-menu";

/// Error returned for malformed key chords.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChordError {
    #[error("Empty key chord")]
    Empty,
    #[error("Unknown modifier '{0}' in key chord")]
    UnknownModifier(String),
    #[error("Key chord '{0}' needs at least one modifier")]
    MissingModifier(String),
    #[error("Invalid key code '{0}'")]
    InvalidKey(String),
}

/// Modifier keys plus a key code, e.g. `Alt+KeyT`.
///
/// Key codes follow the physical key naming of keyboard events (`KeyT`,
/// `Digit1`, `Slash`), so chords do not depend on the active keyboard layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub code: String,
}

impl FromStr for KeyChord {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ChordError::Empty);
        }

        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let code = parts.pop().unwrap_or_default();
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ChordError::InvalidKey(code.to_owned()));
        }

        let mut chord = Self {
            code: code.to_owned(),
            ..Self::default()
        };
        for modifier in parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                _ => return Err(ChordError::UnknownModifier(modifier.to_owned())),
            }
        }

        if !(chord.ctrl || chord.alt || chord.meta) {
            return Err(ChordError::MissingModifier(s.to_owned()));
        }
        Ok(chord)
    }
}

impl KeyChord {
    /// Whether `event` presses this chord's key with at least its modifiers.
    ///
    /// Extra modifiers are tolerated: `Alt+KeyT` also fires on
    /// `Alt+Shift+KeyT`.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.code == event.code
            && (!self.ctrl || event.ctrl)
            && (!self.alt || event.alt)
            && (!self.shift || event.shift)
            && (!self.meta || event.meta)
    }

    fn modifier_count(&self) -> usize {
        [self.ctrl, self.alt, self.shift, self.meta]
            .into_iter()
            .filter(|on| *on)
            .count()
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, name) in [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.meta, "Meta"),
        ] {
            if on {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.code)
    }
}

/// A key press as delivered by the page.
pub type KeyEvent = KeyChord;

/// What a bound chord does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Focus the first tab menu entry.
    FocusTabMenu,
    /// Focus the search input of the mounted tab.
    FocusSearch,
    /// Focus the first table of contents link.
    FocusToc,
}

impl KeyAction {
    /// Element focused by this action.
    #[must_use]
    pub fn target(self) -> Selector {
        match self {
            Self::FocusTabMenu => Selector::class("tab-menu-option"),
            Self::FocusSearch => Selector::id("js-search-input"),
            Self::FocusToc => Selector::class("toc-link"),
        }
    }
}

/// Outcome of a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyDisposition {
    /// A target was focused; the default browser action must be suppressed.
    Handled,
    /// Nothing happened; the key press keeps its default behavior.
    PassThrough,
}

/// Routes chords to focus actions and menu clicks to the controller.
pub struct InputRouter {
    document: Rc<dyn Document>,
    bindings: Vec<(KeyChord, KeyAction)>,
}

impl InputRouter {
    /// Router with the default chords: Alt+T, Alt+S and Alt+M.
    #[must_use]
    pub fn new(document: Rc<dyn Document>) -> Self {
        let chord = |code: &str| KeyChord {
            alt: true,
            code: code.to_owned(),
            ..KeyChord::default()
        };
        Self {
            document,
            bindings: vec![
                (chord("KeyT"), KeyAction::FocusTabMenu),
                (chord("KeyS"), KeyAction::FocusSearch),
                (chord("KeyM"), KeyAction::FocusToc),
            ],
        }
    }

    /// Router with chords parsed from `bindings`.
    ///
    /// # Errors
    ///
    /// Returns [`ChordError`] for the first chord that does not parse.
    pub fn with_bindings<'a>(
        document: Rc<dyn Document>,
        bindings: impl IntoIterator<Item = (&'a str, KeyAction)>,
    ) -> Result<Self, ChordError> {
        let bindings = bindings
            .into_iter()
            .map(|(chord, action)| Ok((chord.parse()?, action)))
            .collect::<Result<_, ChordError>>()?;
        Ok(Self { document, bindings })
    }

    #[must_use]
    pub fn bindings(&self) -> &[(KeyChord, KeyAction)] {
        &self.bindings
    }

    /// Handle a key press.
    ///
    /// The most specific binding whose chord [matches](KeyChord::matches)
    /// wins. Only reports [`KeyDisposition::Handled`] when a target element
    /// was actually focused, so keys are never swallowed on tabs without one.
    pub fn handle_key(&self, event: &KeyEvent) -> KeyDisposition {
        let Some((_, action)) = self
            .bindings
            .iter()
            .filter(|(chord, _)| chord.matches(event))
            .max_by_key(|(chord, _)| chord.modifier_count())
        else {
            return KeyDisposition::PassThrough;
        };

        let target = action.target();
        if self.document.focus(&target) {
            tracing::debug!(chord = %event, ?action, "Focused {target}");
            KeyDisposition::Handled
        } else {
            tracing::debug!(chord = %event, ?action, "No element to focus");
            KeyDisposition::PassThrough
        }
    }

    /// Bind tab menu clicks to transitions on `controller`.
    ///
    /// Calling this again replaces the previous bindings. Returns the number
    /// of menu entries bound.
    pub fn bind_menu(&self, controller: &TabController) -> usize {
        TabId::ALL
            .into_iter()
            .map(|tab| {
                let weak = controller.downgrade();
                let handler: Handler = Rc::new(move || {
                    if let Some(controller) = weak.upgrade() {
                        controller.request_transition(tab, None);
                    }
                });
                self.document
                    .add_listener(&Selector::MenuItem(tab), "click", MENU_LISTENER_KEY, handler)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessDocument, HeadlessHistory, History};
    use pretty_assertions::assert_eq;
    use tabshell_fragments::{FragmentLoader, MockFragmentLoader};
    use tokio::task::LocalSet;

    fn chord(s: &str) -> KeyChord {
        s.parse().unwrap()
    }

    fn router() -> (Rc<HeadlessDocument>, InputRouter) {
        let doc = Rc::new(HeadlessDocument::new());
        let router = InputRouter::new(Rc::clone(&doc) as Rc<dyn Document>);
        (doc, router)
    }

    #[test]
    fn test_parse_chord() {
        assert_eq!(
            chord("Alt+KeyT"),
            KeyChord {
                alt: true,
                code: "KeyT".to_owned(),
                ..KeyChord::default()
            }
        );
        assert_eq!(chord("ctrl + shift + Digit1").to_string(), "Ctrl+Shift+Digit1");
    }

    #[test]
    fn test_parse_chord_errors() {
        assert_eq!("".parse::<KeyChord>(), Err(ChordError::Empty));
        assert_eq!(
            "Hyper+KeyT".parse::<KeyChord>(),
            Err(ChordError::UnknownModifier("Hyper".to_owned()))
        );
        assert_eq!(
            "KeyT".parse::<KeyChord>(),
            Err(ChordError::MissingModifier("KeyT".to_owned()))
        );
        assert_eq!(
            "Shift+KeyT".parse::<KeyChord>(),
            Err(ChordError::MissingModifier("Shift+KeyT".to_owned()))
        );
        assert_eq!(
            "Alt+".parse::<KeyChord>(),
            Err(ChordError::InvalidKey(String::new()))
        );
    }

    #[test]
    fn test_focus_search_without_input_passes_through() {
        let (doc, router) = router();

        assert_eq!(router.handle_key(&chord("Alt+KeyS")), KeyDisposition::PassThrough);
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn test_focus_search_with_input() {
        let (doc, router) = router();
        doc.mount_panel(TabId::Math, "<input id=\"js-search-input\">");

        assert_eq!(router.handle_key(&chord("Alt+KeyS")), KeyDisposition::Handled);
        assert_eq!(doc.focused(), Some(Selector::id("js-search-input")));
    }

    #[test]
    fn test_focus_tab_menu() {
        let (doc, router) = router();
        assert_eq!(router.handle_key(&chord("Alt+KeyT")), KeyDisposition::Handled);
        assert_eq!(doc.focused(), Some(Selector::class("tab-menu-option")));
    }

    #[test]
    fn test_extra_modifiers_still_match() {
        let (doc, router) = router();
        assert_eq!(router.handle_key(&chord("Alt+Shift+KeyT")), KeyDisposition::Handled);
        assert_eq!(doc.focused(), Some(Selector::class("tab-menu-option")));
        assert!(!chord("Alt+Shift+KeyT").matches(&chord("Alt+KeyT")));
    }

    #[test]
    fn test_most_specific_binding_wins() {
        let doc = Rc::new(HeadlessDocument::new());
        doc.mount_panel(TabId::Math, "<input id=\"js-search-input\">");
        let router = InputRouter::with_bindings(
            Rc::clone(&doc) as Rc<dyn Document>,
            [
                ("Alt+KeyK", KeyAction::FocusTabMenu),
                ("Alt+Shift+KeyK", KeyAction::FocusSearch),
            ],
        )
        .unwrap();

        assert_eq!(router.handle_key(&chord("Alt+Shift+KeyK")), KeyDisposition::Handled);
        assert_eq!(doc.focused(), Some(Selector::id("js-search-input")));
    }

    #[test]
    fn test_unbound_chord_passes_through() {
        let (_, router) = router();
        assert_eq!(router.handle_key(&chord("Ctrl+KeyS")), KeyDisposition::PassThrough);
    }

    #[test]
    fn test_custom_bindings() {
        let doc = Rc::new(HeadlessDocument::new());
        let router = InputRouter::with_bindings(
            Rc::clone(&doc) as Rc<dyn Document>,
            [("Ctrl+Shift+KeyK", KeyAction::FocusTabMenu)],
        )
        .unwrap();

        assert_eq!(router.handle_key(&chord("Alt+KeyT")), KeyDisposition::PassThrough);
        assert_eq!(router.handle_key(&chord("Ctrl+Shift+KeyK")), KeyDisposition::Handled);

        let err = InputRouter::with_bindings(
            Rc::clone(&doc) as Rc<dyn Document>,
            [("Alt+Key T", KeyAction::FocusToc)],
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_menu_click_requests_transition() {
        LocalSet::new()
            .run_until(async {
                let doc = Rc::new(HeadlessDocument::new());
                let loader = Rc::new(MockFragmentLoader::with_all_tabs());
                let controller = TabController::builder(
                    Rc::clone(&doc) as Rc<dyn Document>,
                    Rc::clone(&loader) as Rc<dyn FragmentLoader>,
                    Rc::new(HeadlessHistory::new("/en/")) as Rc<dyn History>,
                )
                .build();
                let router = InputRouter::new(Rc::clone(&doc) as Rc<dyn Document>);
                assert_eq!(router.bind_menu(&controller), TabId::ALL.len());
                assert_eq!(router.bind_menu(&controller), TabId::ALL.len());

                controller.start();
                controller.settle().await;

                assert_eq!(doc.click(&Selector::MenuItem(TabId::Keyboard)), 1);
                controller.settle().await;

                assert_eq!(controller.current_tab(), TabId::Keyboard);
                assert_eq!(loader.call_count(TabId::Keyboard), 1);
            })
            .await;
    }
}
