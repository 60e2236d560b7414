use super::Pager;
use crate::types::{Book, PageId};

/// A flat list of pages with the index of each book's last page.
///
/// `ends` is sorted ascending. Pages after the last end belong to an open
/// trailing book.
#[derive(Debug, Clone, Default)]
pub struct PageList {
    pages: Vec<PageId>,
    ends: Vec<usize>,
    index: usize,
}

impl PageList {
    pub fn new(pages: Vec<PageId>, ends: Vec<usize>) -> Self {
        Self {
            pages,
            ends,
            index: 0,
        }
    }

    /// Flatten `books` in order, closing each one with an end marker.
    pub fn from_books(books: &[Book]) -> Self {
        let mut pages = Vec::new();
        let mut ends = Vec::with_capacity(books.len());
        for book in books {
            pages.extend((0..book.page_count()).filter_map(|i| book.page(i).cloned()));
            ends.push(pages.len() - 1);
        }
        Self::new(pages, ends)
    }

    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    /// Move the cursor, clamped to the list.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.pages.len().saturating_sub(1));
    }
}

impl Pager for PageList {
    fn current(&self) -> PageId {
        self.pages
            .get(self.index)
            .cloned()
            .unwrap_or_else(PageId::waiting)
    }

    fn start(&mut self) {
        self.index = self
            .ends
            .iter()
            .rev()
            .find(|&&end| end < self.index)
            .map_or(0, |end| end + 1);
    }

    fn end(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.index = self
            .ends
            .iter()
            .find(|&&end| end >= self.index)
            .copied()
            .unwrap_or(self.pages.len() - 1);
    }

    fn next(&mut self) {
        if !self.pages.is_empty() {
            self.index = (self.index + 1) % self.pages.len();
        }
    }

    fn previous(&mut self) {
        if !self.pages.is_empty() {
            self.index = self.index.checked_sub(1).unwrap_or(self.pages.len() - 1);
        }
    }

    fn count(&self) -> usize {
        self.pages.len()
    }

    fn index(&self) -> usize {
        self.index
    }
}
