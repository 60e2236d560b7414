//! Shared types used across discovery, caching, and navigation.
//!
//! A [`PageId`] is the one identifier every stage agrees on: the scanner
//! produces it, the cache stores bytes under it, and the navigator hands it
//! back to whoever renders the page.

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Text of the sentinel page shown while nothing has been discovered yet.
const WAITING: &str = "wait";

/// Identifier of a single viewable page.
///
/// For loose images this is the canonical absolute path of the file. For
/// archive members it is the archive path joined with the entry's inner
/// path by `/`, e.g. `/books/vol1.cbz/pages/001.png`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Page id of an entry inside an archive.
    pub fn in_archive(archive: &PageId, inner: &str) -> Self {
        Self(format!(
            "{}/{}",
            archive.0.trim_end_matches('/'),
            inner.trim_start_matches('/')
        ))
    }

    /// The "nothing to show yet" sentinel.
    pub fn waiting() -> Self {
        Self(WAITING.to_string())
    }

    pub fn is_waiting(&self) -> bool {
        self.0 == WAITING
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered group of pages from one directory or one archive.
///
/// A book with no `subs` is a standalone image: `path` is both the book and
/// its only page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub path: PageId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subs: Vec<PageId>,
}

impl Book {
    /// A book holding a single loose image.
    pub fn single(path: PageId) -> Self {
        Self {
            path,
            subs: Vec::new(),
        }
    }

    pub fn is_single(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of pages this book contributes to navigation.
    pub fn page_count(&self) -> usize {
        self.subs.len().max(1)
    }

    /// Page at `index`, or the book path itself for a standalone image.
    pub fn page(&self, index: usize) -> Option<&PageId> {
        if self.subs.is_empty() {
            (index == 0).then_some(&self.path)
        } else {
            self.subs.get(index)
        }
    }
}

/// One message of the discovery stream.
///
/// A directory or archive book arrives as its pages, in order, each sent as
/// soon as it is found, then a [`Discovery::BookEnd`] carrying the book path.
/// A standalone image arrives as one [`Discovery::Single`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// A page of the book currently being streamed.
    Page(PageId),
    /// A standalone image, a book on its own.
    Single(PageId),
    /// Closes the current book.
    BookEnd(PageId),
}

/// Reassembles books from a [`Discovery`] stream.
#[derive(Debug, Default)]
pub struct BookBuilder {
    pending: Vec<PageId>,
}

impl BookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one message; returns a book once one is complete.
    ///
    /// A book end with no pages before it completes nothing.
    pub fn accept(&mut self, message: Discovery) -> Option<Book> {
        match message {
            Discovery::Page(page) => {
                self.pending.push(page);
                None
            }
            Discovery::Single(page) => Some(Book::single(page)),
            Discovery::BookEnd(_) if self.pending.is_empty() => None,
            Discovery::BookEnd(path) => Some(Book {
                path,
                subs: std::mem::take(&mut self.pending),
            }),
        }
    }

    /// Pages received since the last book end.
    pub fn unfinished(&self) -> usize {
        self.pending.len()
    }
}
