//! The append-only list of discovered books, shared between the ingestion
//! consumer and any number of readers.

use crate::types::{Book, BookBuilder, Discovery};
use std::sync::mpsc::Receiver;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Default)]
struct State {
    books: Vec<Book>,
    complete: bool,
}

/// Books discovered so far, in discovery order.
///
/// Books are only ever appended, so a `(book, page)` cursor that was valid
/// once stays valid while the scan keeps growing the shelf.
#[derive(Default)]
pub struct Shelf {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shelf {
    pub fn new() -> Self {
        Self::default()
    }

    /// A finished shelf holding `books`.
    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            state: Mutex::new(State {
                books,
                complete: true,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, book: Book) {
        self.lock().books.push(book);
        self.changed.notify_all();
    }

    /// Mark the scan as finished; no more books will arrive.
    pub fn finish(&self) {
        self.lock().complete = true;
        self.changed.notify_all();
    }

    pub fn is_complete(&self) -> bool {
        self.lock().complete
    }

    pub fn len(&self) -> usize {
        self.lock().books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the books with the shelf locked.
    pub fn read<R>(&self, f: impl FnOnce(&[Book]) -> R) -> R {
        f(&self.lock().books)
    }

    pub fn snapshot(&self) -> Vec<Book> {
        self.lock().books.clone()
    }

    /// Wait until at least one book is present, the scan finishes, or
    /// `timeout` passes. Returns whether a book is present.
    pub fn wait_for_books(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.books.is_empty() && !state.complete {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        !state.books.is_empty()
    }

    /// Block until the scan finishes.
    pub fn wait_complete(&self) {
        let mut state = self.lock();
        while !state.complete {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Assemble books from a discovery stream until the sender hangs up.
    ///
    /// Pages accumulate until a [`Discovery::BookEnd`] closes the book. A
    /// book end with no pending pages (an archive without images) adds
    /// nothing. `on_book` runs after every appended book.
    pub fn consume(&self, rx: Receiver<Discovery>, mut on_book: impl FnMut(&Book)) {
        let mut builder = BookBuilder::new();
        for message in rx {
            if let Some(book) = builder.accept(message) {
                on_book(&book);
                self.push(book);
            }
        }
        if builder.unfinished() > 0 {
            log::warn!("{} pages arrived without a closing book", builder.unfinished());
        }
        self.finish();
        self.read(|books| {
            for (i, book) in books.iter().enumerate() {
                log::debug!("{i} {} ({} pages)", book.path, book.page_count());
            }
        });
    }
}
