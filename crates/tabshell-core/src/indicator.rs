//! Active-indicator sync.

use tabshell_nav::TabId;

use crate::document::Document;

/// Make `tab` the only tab whose indicators are marked active.
///
/// Runs after every commit and after a rollback, so menu highlighting always
/// follows the committed state rather than the last click.
pub fn sync_active_indicators(document: &dyn Document, tab: TabId) {
    document.clear_indicators();
    document.set_indicator_active(tab);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_active_indicator() {
        let doc = HeadlessDocument::new();
        sync_active_indicators(&doc, TabId::Maps);
        sync_active_indicators(&doc, TabId::Math);
        assert_eq!(doc.active_indicators(), vec![TabId::Math]);
    }
}
