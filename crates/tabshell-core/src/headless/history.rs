//! In-memory session history.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tabshell_nav::Location;

use crate::history::{History, PopHandler};

/// Session history kept as a stack of entries with a cursor.
///
/// `push` drops entries ahead of the cursor, `back`/`forward` move the cursor
/// and fire the pop handler like a browser would.
pub struct HeadlessHistory {
    entries: RefCell<Vec<Location>>,
    cursor: Cell<usize>,
    handler: RefCell<Option<Rc<PopHandler>>>,
}

impl HeadlessHistory {
    /// Create a history whose only entry is `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            entries: RefCell::new(vec![Location::parse(url)]),
            cursor: Cell::new(0),
            handler: RefCell::new(None),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Go back one entry. Returns `false` at the first entry.
    pub fn back(&self) -> bool {
        let cursor = self.cursor.get();
        if cursor == 0 {
            return false;
        }
        self.go_to(cursor - 1);
        true
    }

    /// Go forward one entry. Returns `false` at the last entry.
    pub fn forward(&self) -> bool {
        let cursor = self.cursor.get();
        if cursor + 1 >= self.len() {
            return false;
        }
        self.go_to(cursor + 1);
        true
    }

    fn go_to(&self, cursor: usize) {
        self.cursor.set(cursor);
        let location = self.location();
        tracing::debug!(location = %location, "History pop");

        // Release the borrow before calling out, the handler may push.
        let handler = self.handler.borrow().clone();
        if let Some(handler) = handler {
            handler(location);
        }
    }
}

impl History for HeadlessHistory {
    fn location(&self) -> Location {
        self.entries.borrow()[self.cursor.get()].clone()
    }

    fn push(&self, location: &Location) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.cursor.get() + 1);
        entries.push(location.clone());
        self.cursor.set(entries.len() - 1);
    }

    fn replace(&self, location: &Location) {
        self.entries.borrow_mut()[self.cursor.get()] = location.clone();
    }

    fn on_pop(&self, handler: PopHandler) {
        *self.handler.borrow_mut() = Some(Rc::new(handler));
    }
}
