//! Filesystem scanning into books.
//!
//! Turns a root path into an ordered stream of [`Discovery`] messages, or,
//! through [`read_books`], an ordered list of [`Book`]s. The root can be a
//! directory, a loose image, or an archive.
//!
//! ## Directory Structure
//!
//! ```text
//! comics/                      # Root
//! ├── cover.png                # ┐ comics/ own book: [cover.png, extra.jpg]
//! ├── extra.jpg                # ┘
//! ├── notes.txt                # ignored (not an image, not an archive)
//! ├── 01-Origins/              # book: [001.png, 002.png]
//! │   ├── 001.png
//! │   └── 002.png
//! ├── 02-Sequel.cbz            # book: every image entry, sorted
//! └── 03-Extras/
//!     ├── sketch.png           # book: [sketch.png]
//!     └── bonus.zip            # book: every image entry, sorted
//! ```
//!
//! ## Ordering
//!
//! - Children are visited in file name order.
//! - A directory's own images form one book, sorted by name, emitted **before**
//!   the books of its subdirectories and archives.
//! - Subdirectory and archive books keep the order their entries were met in.
//! - A directory's pages are emitted one by one as they are classified, so a
//!   consumer sees the first page of a large directory without waiting for
//!   the rest. An archive's pages are emitted once its entry list is sorted.
//!
//! ## Paths
//!
//! Directories are listed through their canonical path, so every page id is
//! canonical even below a symlinked directory. A directory reached twice
//! (through a link, or a link cycle) is walked once.
//!
//! ## Classification
//!
//! Files are classified by content ([`classify`]), never by extension.
//! Dot-prefixed names get no special treatment: a `.cover.png` is a page and
//! a `.extras/` directory is walked like any other.
//!
//! ## Failure Policy
//!
//! The scan is best-effort. A missing root produces no books. An unreadable
//! entry or a corrupt archive is logged and skipped; the walk always
//! continues with the next entry.

use crate::archive;
use crate::classify::{self, Kind};
use crate::populate::{Populate, Source};
use crate::types::{Book, BookBuilder, Discovery, PageId};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan `root` and collect every book.
pub fn read_books(root: &Path, sink: &dyn Populate) -> Vec<Book> {
    let mut builder = BookBuilder::new();
    let mut books = Vec::new();
    walk(root, sink, &mut |message| books.extend(builder.accept(message)));
    books
}

/// Scan `root`, handing each discovery to `emit` as soon as it is made.
///
/// Every discovered page is also handed to `sink` for caching, before the
/// matching [`Discovery::Page`] is emitted.
pub fn walk(root: &Path, sink: &dyn Populate, emit: &mut dyn FnMut(Discovery)) {
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            log::warn!("book not found: {}: {e}", root.display());
            return;
        }
    };
    log::info!("reading books from {}", root.display());

    let mut walker = Walker {
        sink,
        emit,
        visited: HashSet::new(),
    };
    if root.is_dir() {
        walker.directory(&root);
        return;
    }
    match classify::classify_file(&root) {
        Ok(Kind::Image) => walker.image(&root),
        Ok(Kind::Archive) => walker.archive(&root),
        Ok(Kind::Other) => log::debug!("pass {}", root.display()),
        Err(e) => log::warn!("cannot read {}: {e}", root.display()),
    }
}

/// A child that produces books of its own, visited after the parent's book.
enum Nested {
    Directory(PathBuf),
    Archive(PathBuf),
}

struct Walker<'a, 'e> {
    sink: &'a dyn Populate,
    emit: &'e mut dyn FnMut(Discovery),
    /// Canonical directories already walked; breaks symlink cycles.
    visited: HashSet<PathBuf>,
}

impl Walker<'_, '_> {
    fn image(&mut self, path: &Path) {
        let page = PageId::from_path(path);
        self.sink.populate(page.clone(), Source::File(path.to_path_buf()));
        (self.emit)(Discovery::Single(page));
    }

    fn archive(&mut self, path: &Path) {
        match archive::read_archive(path, self.sink) {
            Ok(book) if book.subs.is_empty() => {
                log::debug!("no pages in {}", path.display());
            }
            Ok(book) => {
                for page in book.subs {
                    (self.emit)(Discovery::Page(page));
                }
                (self.emit)(Discovery::BookEnd(book.path));
            }
            Err(e) => log::warn!("{e}"),
        }
    }

    fn directory(&mut self, dir: &Path) {
        let dir = match dir.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                log::warn!("cannot resolve {}: {e}", dir.display());
                return;
            }
        };
        if !self.visited.insert(dir.clone()) {
            log::debug!("already visited {}", dir.display());
            return;
        }

        let entries = match collect_entries(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot list {}: {e}", dir.display());
                return;
            }
        };

        // Entries are sorted, so pages go out in name order
        let mut has_pages = false;
        let mut nested = Vec::new();
        for entry in entries {
            if entry.is_dir() {
                nested.push(Nested::Directory(entry));
                continue;
            }
            match classify::classify_file(&entry) {
                Ok(Kind::Image) => {
                    let page = PageId::from_path(&entry);
                    self.sink.populate(page.clone(), Source::File(entry));
                    (self.emit)(Discovery::Page(page));
                    has_pages = true;
                }
                Ok(Kind::Archive) => nested.push(Nested::Archive(entry)),
                Ok(Kind::Other) => log::debug!("pass {}", entry.display()),
                Err(e) => log::warn!("skipping {}: {e}", entry.display()),
            }
        }
        if has_pages {
            (self.emit)(Discovery::BookEnd(PageId::from_path(&dir)));
        }

        for child in nested {
            match child {
                Nested::Directory(path) => self.directory(&path),
                Nested::Archive(path) => self.archive(&path),
            }
        }
    }
}

/// Children of `path`, sorted by name.
fn collect_entries(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| match e {
            Ok(e) => Some(e.path()),
            Err(err) => {
                log::warn!("skipping entry in {}: {err}", path.display());
                None
            }
        })
        .collect();

    entries.sort();
    Ok(entries)
}
