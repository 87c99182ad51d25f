//! Cross-cutting hooks re-run after every mount.
//!
//! The page wires several features to whatever markup is currently mounted:
//! language bindings, copy-to-clipboard buttons, sortable tables, the search
//! index and the table of contents. Each tab load replaces that markup, so
//! the controller runs the hooks again once the new panel is in place.

use std::cell::RefCell;
use std::rc::Rc;

use tabshell_nav::LanguageId;

/// A hook run against freshly mounted markup.
pub trait PostLoadHook {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn run(&self);
}

/// Search index over the mounted content.
pub trait SearchIndex {
    /// Clear pending queries and results.
    fn clear(&self);

    /// Rebuild the index from the mounted content.
    fn rebuild(&self);
}

/// Translation layer bound to the page.
pub trait LanguageBinding {
    /// Language currently applied to the page.
    fn current(&self) -> LanguageId;

    /// Switch the page to another language.
    fn change(&self, language: &LanguageId);

    /// Apply the current language to newly mounted markup.
    fn bind(&self);
}

/// Language binding that only records the current language.
#[derive(Debug, Default)]
pub struct StaticLanguage {
    current: RefCell<LanguageId>,
}

impl StaticLanguage {
    #[must_use]
    pub fn new(language: LanguageId) -> Self {
        Self {
            current: RefCell::new(language),
        }
    }
}

impl LanguageBinding for StaticLanguage {
    fn current(&self) -> LanguageId {
        self.current.borrow().clone()
    }

    fn change(&self, language: &LanguageId) {
        tracing::debug!(language = %language, "Changing language");
        language.clone_into(&mut self.current.borrow_mut());
    }

    fn bind(&self) {}
}

/// Search index that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearch;

impl SearchIndex for NoopSearch {
    fn clear(&self) {}

    fn rebuild(&self) {}
}

/// Hooks run by the controller around a transition.
///
/// After mount: language binding, every [`PostLoadHook`] in registration
/// order, then the search index rebuild. After the active indicators are
/// synced: the table of contents hook, if any.
pub struct PageHooks {
    language: Rc<dyn LanguageBinding>,
    search: Rc<dyn SearchIndex>,
    post_load: Vec<Rc<dyn PostLoadHook>>,
    toc: Option<Rc<dyn PostLoadHook>>,
}

impl Default for PageHooks {
    fn default() -> Self {
        Self::new(Rc::new(StaticLanguage::default()), Rc::new(NoopSearch))
    }
}

impl PageHooks {
    #[must_use]
    pub fn new(language: Rc<dyn LanguageBinding>, search: Rc<dyn SearchIndex>) -> Self {
        Self {
            language,
            search,
            post_load: Vec::new(),
            toc: None,
        }
    }

    /// Append a hook run after mount (clipboard, sortable tables, …).
    #[must_use]
    pub fn with_post_load(mut self, hook: Rc<dyn PostLoadHook>) -> Self {
        self.post_load.push(hook);
        self
    }

    /// Set the table of contents hook, run after indicator sync.
    #[must_use]
    pub fn with_toc(mut self, hook: Rc<dyn PostLoadHook>) -> Self {
        self.toc = Some(hook);
        self
    }

    #[must_use]
    pub fn language(&self) -> &Rc<dyn LanguageBinding> {
        &self.language
    }

    pub(crate) fn clear_search(&self) {
        self.search.clear();
    }

    pub(crate) fn after_mount(&self) {
        self.language.bind();
        for hook in &self.post_load {
            tracing::trace!(hook = hook.name(), "Running post-load hook");
            hook.run();
        }
        self.search.rebuild();
    }

    pub(crate) fn after_commit(&self) {
        if let Some(toc) = &self.toc {
            toc.run();
        }
    }
}
