//! # Comic
//!
//! The core of an image and comic browser. Point it at directories, zip and
//! tar archives, and loose images; it turns them into an ordered collection
//! of **books** you can page through, while copying every page into a local
//! cache so the next visit is a single lookup.
//!
//! # Architecture: Streaming Discovery
//!
//! ```text
//! roots ─▶ scan (background thread) ─▶ Discovery messages ─▶ Shelf ─▶ Navigator
//!              │                                                        │
//!              └─▶ populate (rayon) ─▶ Cache ◀──── image(page) ─────────┘
//! ```
//!
//! Books are shown while the scan is still running. The first book can be
//! browsed before the last directory has been read, and pages stay cached
//! across runs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Header sniffing: image, archive, or neither |
//! | [`archive`] | Reads the image entries of a zip or tar archive as one book |
//! | [`scan`] | Recursive walk of roots into books, in a stable order |
//! | [`populate`] | Seam between discovery and caching (background or synchronous) |
//! | [`ingest`] | Runs the walk on a thread and streams [`ingest::Discovery`] messages |
//! | [`cache`] | Persistent page store with idempotent population and placeholder decoding |
//! | [`navigator`] | Shared [`navigator::Shelf`] and the cursors that page over it |
//! | [`debounce`] | Collapses bursts of redraw requests into one delayed call |
//! | [`imaging`] | Bitmaps, placeholders and aspect-preserving fitting |
//! | [`config`] | `config.toml` loading and validation |
//! | [`types`] | [`types::PageId`] and [`types::Book`] |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Over Extensions
//!
//! Comic archives are routinely renamed between `.zip`, `.cbz` and worse, and
//! scanned pages often carry whatever extension the scanner picked. Every
//! file is classified from its first bytes, never from its name.
//!
//! ## Raw Bytes In The Cache
//!
//! The cache stores the source bytes of each page untouched. Decoding happens
//! on the way out, so a page that fails to decode shows the error placeholder
//! without losing its data.
//!
//! ## One Sentinel For "Nothing Yet"
//!
//! The navigator answers [`types::PageId::waiting`] both when the collection
//! is empty and when the scan has not delivered a first page in time.
//! Callers render the "not ready" placeholder for it.

pub mod archive;
pub mod cache;
pub mod classify;
pub mod config;
pub mod debounce;
pub mod imaging;
pub mod ingest;
pub mod navigator;
pub mod output;
pub mod populate;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
