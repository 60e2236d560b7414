//! Page navigation across books.
//!
//! Two cursors implement the same [`Pager`] contract:
//!
//! - [`Navigator`] walks a live [`Shelf`] by `(book, page)`. Moving past the
//!   last page of a book continues into the next book, and the collection
//!   wraps around at both ends. It works while the shelf is still growing.
//! - [`PageList`] walks a flat page list with book-end markers. `start` and
//!   `end` stay inside the current book; `next` and `previous` wrap over the
//!   whole list.

mod flat;
mod shelf;

pub use flat::PageList;
pub use shelf::Shelf;

use crate::types::PageId;
use std::sync::Arc;
use std::time::Duration;

/// Cursor operations shared by both navigators.
pub trait Pager: Send {
    /// Page under the cursor, or [`PageId::waiting`] when there is none.
    fn current(&self) -> PageId;
    /// First page of the current book.
    fn start(&mut self);
    /// Last page of the current book.
    fn end(&mut self);
    fn next(&mut self);
    fn previous(&mut self);
    /// Total number of pages.
    fn count(&self) -> usize;
    /// 0-based position of the cursor among all pages.
    fn index(&self) -> usize;
}

/// `(book, page)` cursor over a shared, growing [`Shelf`].
pub struct Navigator {
    shelf: Arc<Shelf>,
    book: usize,
    page: usize,
}

impl Navigator {
    pub fn new(shelf: Arc<Shelf>) -> Self {
        Self {
            shelf,
            book: 0,
            page: 0,
        }
    }

    pub fn shelf(&self) -> &Arc<Shelf> {
        &self.shelf
    }

    /// Current `(book, page)` pair.
    pub fn position(&self) -> (usize, usize) {
        (self.book, self.page)
    }

    /// Like [`Pager::current`], but give the scan up to `wait` to deliver a
    /// first book before answering with the waiting sentinel.
    pub fn current_timeout(&self, wait: Duration) -> PageId {
        self.shelf.wait_for_books(wait);
        self.current()
    }
}

impl Pager for Navigator {
    fn current(&self) -> PageId {
        self.shelf.read(|books| {
            books
                .get(self.book)
                .and_then(|book| book.page(self.page))
                .cloned()
                .unwrap_or_else(PageId::waiting)
        })
    }

    fn start(&mut self) {
        self.page = 0;
    }

    fn end(&mut self) {
        self.shelf.read(|books| {
            if let Some(book) = books.get(self.book) {
                self.page = book.page_count() - 1;
            }
        });
    }

    fn next(&mut self) {
        self.shelf.read(|books| {
            let Some(book) = books.get(self.book) else {
                return;
            };
            self.page += 1;
            if self.page >= book.page_count() {
                self.page = 0;
                self.book = (self.book + 1) % books.len();
            }
        });
    }

    fn previous(&mut self) {
        self.shelf.read(|books| {
            if books.get(self.book).is_none() {
                return;
            }
            if self.page > 0 {
                self.page -= 1;
                return;
            }
            self.book = if self.book == 0 {
                books.len() - 1
            } else {
                self.book - 1
            };
            self.page = books[self.book].page_count() - 1;
        });
    }

    fn count(&self) -> usize {
        self.shelf
            .read(|books| books.iter().map(|b| b.page_count()).sum())
    }

    fn index(&self) -> usize {
        self.shelf.read(|books| {
            books
                .iter()
                .take(self.book)
                .map(|b| b.page_count())
                .sum::<usize>()
                + self.page
        })
    }
}
