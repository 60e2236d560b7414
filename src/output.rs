//! CLI output formatting.
//!
//! # Output Format
//!
//! ## List
//!
//! Books are shown in discovery order with a positional index. Pages of a
//! directory or archive are listed under it by their path inside the book;
//! a standalone image is a book line with no children.
//!
//! ```text
//! Books
//! 001 /comics/Saga (2 pages)
//!     001 001.png
//!     002 002.png
//! 002 /comics/Saga/vol1.cbz (1 page)
//!     001 ch1/001.png
//! 003 /comics/cover.jpg
//!
//! 3 books, 4 pages
//! ```
//!
//! ## Browse
//!
//! One status line per shown page: 1-based position, page id, and either the
//! size the bitmap is drawn at or the placeholder being shown.
//!
//! ```text
//! 002/004 /comics/Saga/002.png 800x600 -> 600x450
//! 004/004 /comics/cover.jpg [not ready]
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::{Bitmap, Placeholder, Size, fit_within};
use crate::types::{Book, PageId};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Page id relative to its book, for display under the book line.
fn inner_name<'a>(book: &PageId, page: &'a PageId) -> &'a str {
    page.as_str()
        .strip_prefix(book.as_str())
        .map(|rest| rest.trim_start_matches('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(page.as_str())
}

// ============================================================================
// List
// ============================================================================

pub fn format_books(books: &[Book]) -> Vec<String> {
    let mut lines = vec!["Books".to_string()];
    let mut pages = 0;
    for (i, book) in books.iter().enumerate() {
        pages += book.page_count();
        if book.is_single() {
            lines.push(format!("{} {}", format_index(i + 1), book.path));
            continue;
        }
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            book.path,
            plural(book.subs.len(), "page")
        ));
        for (j, page) in book.subs.iter().enumerate() {
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_index(j + 1),
                inner_name(&book.path, page)
            ));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(books.len(), "book"),
        plural(pages, "page")
    ));
    lines
}

pub fn print_books(books: &[Book]) {
    for line in format_books(books) {
        println!("{}", line);
    }
}

/// One-line cache summary printed after a listing.
pub fn format_cache_summary(pages: usize, store: &std::path::Path) -> String {
    format!("Cache: {} in {}", plural(pages, "page"), store.display())
}

// ============================================================================
// Browse
// ============================================================================

/// Status line for the page under the cursor.
///
/// `index` is 0-based; `window` is the area the page is fitted into.
pub fn format_page_status(
    page: &PageId,
    index: usize,
    count: usize,
    bitmap: &Bitmap,
    window: Size,
) -> String {
    if page.is_waiting() {
        return "waiting for pages...".to_string();
    }
    let position = format!("{}/{}", format_index(index + 1), format_index(count));
    match bitmap.placeholder() {
        Some(Placeholder::NotReady) => format!("{position} {page} [not ready]"),
        Some(Placeholder::Error) => format!("{position} {page} [error]"),
        None => {
            let (w, h) = bitmap.dimensions();
            let shown = fit_within(Size::from((w, h)), window);
            format!(
                "{position} {page} {w}x{h} -> {}x{}",
                shown.width.round(),
                shown.height.round()
            )
        }
    }
}

pub fn print_page_status(page: &PageId, index: usize, count: usize, bitmap: &Bitmap, window: Size) {
    println!("{}", format_page_status(page, index, count, bitmap, window));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{book, png_bytes};

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "page"), "1 page");
        assert_eq!(plural(0, "page"), "0 pages");
        assert_eq!(plural(3, "book"), "3 books");
    }

    #[test]
    fn inner_name_strips_book_prefix() {
        let book = PageId::new("/c/vol.cbz");
        assert_eq!(inner_name(&book, &PageId::new("/c/vol.cbz/ch1/a.png")), "ch1/a.png");
        assert_eq!(inner_name(&book, &PageId::new("/elsewhere.png")), "/elsewhere.png");
    }

    // =========================================================================
    // List output
    // =========================================================================

    #[test]
    fn format_books_tree() {
        let lines = format_books(&[
            book("/c/saga", &["/c/saga/001.png", "/c/saga/002.png"]),
            book("/c/saga/vol1.cbz", &["/c/saga/vol1.cbz/ch1/001.png"]),
            book("/c/cover.jpg", &[]),
        ]);
        assert_eq!(
            lines,
            vec![
                "Books",
                "001 /c/saga (2 pages)",
                "    001 001.png",
                "    002 002.png",
                "002 /c/saga/vol1.cbz (1 page)",
                "    001 ch1/001.png",
                "003 /c/cover.jpg",
                "",
                "3 books, 4 pages",
            ]
        );
    }

    #[test]
    fn format_books_empty() {
        assert_eq!(format_books(&[]), vec!["Books", "", "0 books, 0 pages"]);
    }

    #[test]
    fn cache_summary() {
        let line = format_cache_summary(2, std::path::Path::new("/tmp/comic/pages.redb"));
        assert_eq!(line, "Cache: 2 pages in /tmp/comic/pages.redb");
    }

    // =========================================================================
    // Browse output
    // =========================================================================

    #[test]
    fn status_for_decoded_page_shows_fitted_size() {
        let bitmap = Bitmap::decode(&png_bytes(100, 50));
        let line = format_page_status(
            &PageId::new("/c/a.png"),
            1,
            4,
            &bitmap,
            Size::new(200.0, 200.0),
        );
        assert_eq!(line, "002/004 /c/a.png 100x50 -> 200x100");
    }

    #[test]
    fn status_for_placeholders() {
        let page = PageId::new("/c/a.png");
        let window = Size::new(800.0, 600.0);
        assert_eq!(
            format_page_status(&page, 0, 1, &Bitmap::decode(&[]), window),
            "001/001 /c/a.png [not ready]"
        );
        assert_eq!(
            format_page_status(&page, 0, 1, &Bitmap::decode(b"junk"), window),
            "001/001 /c/a.png [error]"
        );
    }

    #[test]
    fn status_while_waiting() {
        let line = format_page_status(
            &PageId::waiting(),
            0,
            0,
            &Bitmap::decode(&[]),
            Size::new(800.0, 600.0),
        );
        assert_eq!(line, "waiting for pages...");
    }
}
