//! Persistent page cache.
//!
//! Reading a page out of a compressed archive, or off a slow disk, is the
//! bottleneck of browsing a large collection. This module keeps the raw
//! source bytes of every discovered page in a local key-value store so the
//! second visit to a page, and every later run, is a single lookup.
//!
//! # Design
//!
//! ## Keys and values
//!
//! Keys are [`PageId`] strings exactly as the scanner produces them: a
//! canonical path for loose images, `archive/inner/path` for archive members.
//! Values are the **unmodified source bytes**. Nothing is re-encoded, so the
//! store stays portable across decoder versions and a page that fails to
//! decode today can be replayed later.
//!
//! ## Population
//!
//! The ingestion pipeline populates the cache in the background through
//! [`Cache::load_if_absent`]. The presence check runs first, in a read
//! transaction, so a page that is already cached is never read or
//! decompressed again. The source is then read with no transaction open, and
//! the insert happens inside a single write transaction that re-checks the
//! key. The store serializes write transactions, so two scan branches racing
//! on the same key (symlinks, duplicate roots) cannot both write: the first
//! one wins and the second becomes a no-op.
//!
//! ## Rendering
//!
//! [`Cache::image`] never waits for ingestion. A miss renders the "not ready"
//! placeholder, undecodable bytes render the "error" placeholder, and the
//! bytes stay where they are.
//!
//! ## Storage
//!
//! A single `pages.redb` file inside the cache directory. The directory is
//! created on open and outlives the process.

use crate::imaging::Bitmap;
use crate::types::PageId;
use redb::{Database, Durability, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the store file within the cache directory.
const STORE_FILENAME: &str = "pages.redb";

/// The single table of the store: page id → raw source bytes.
const PAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("pages");

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot open cache store: {0}")]
    Open(#[from] redb::DatabaseError),
    #[error("Cache transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("Cache table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Cache storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Cache commit failed: {0}")]
    Commit(#[from] redb::CommitError),
}

/// Key-value store of raw page bytes.
pub struct Cache {
    db: Database,
    path: PathBuf,
}

impl Cache {
    /// Open (or create) the store inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir)?;
        let path = store_path(dir);
        let db = Database::create(&path)?;

        // Create the table up front so read transactions never see it missing
        let txn = db.begin_write()?;
        txn.open_table(PAGES)?;
        txn.commit()?;

        log::info!("opened page cache at {}", path.display());
        Ok(Self { db, path })
    }

    /// Location of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw bytes stored for `key`, or an empty vector on a miss.
    ///
    /// A store error is logged and reads as a miss.
    pub fn get(&self, key: &PageId) -> Vec<u8> {
        match self.lookup(key) {
            Ok(bytes) => bytes.unwrap_or_default(),
            Err(e) => {
                log::warn!("cache read failed for {key}: {e}");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, key: &PageId) -> bool {
        matches!(self.lookup(key), Ok(Some(_)))
    }

    fn lookup(&self, key: &PageId) -> Result<Option<Vec<u8>>, CacheError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PAGES)?;
        let value = table.get(key.as_str())?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// Store `bytes` under `key`, replacing any previous value.
    pub fn put(&self, key: &PageId, bytes: &[u8]) -> Result<(), CacheError> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Eventual);
        {
            let mut table = txn.open_table(PAGES)?;
            table.insert(key.as_str(), bytes)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Read `source` and store it under `key`, unless `key` is already present.
    ///
    /// Returns `true` when this call stored the value. `source` is not called
    /// at all for a key that is already cached. If another writer stores the
    /// key between the check and the insert, the earlier value is kept.
    pub fn load_if_absent<F>(&self, key: &PageId, source: F) -> Result<bool, CacheError>
    where
        F: FnOnce() -> io::Result<Vec<u8>>,
    {
        if self.lookup(key)?.is_some() {
            return Ok(false);
        }

        let bytes = source()?;

        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Eventual);
        let stored = {
            let mut table = txn.open_table(PAGES)?;
            if table.get(key.as_str())?.is_some() {
                false
            } else {
                table.insert(key.as_str(), bytes.as_slice())?;
                true
            }
        };
        if stored {
            txn.commit()?;
            log::debug!("cached {} bytes for {key}", bytes.len());
        } else {
            txn.abort()?;
        }
        Ok(stored)
    }

    /// Decoded bitmap for `key`, or a placeholder.
    ///
    /// Never blocks waiting for ingestion to reach `key`.
    pub fn image(&self, key: &PageId) -> Bitmap {
        Bitmap::decode(&self.get(key))
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        let count = || -> Result<u64, CacheError> {
            let txn = self.db.begin_read()?;
            let table = txn.open_table(PAGES)?;
            Ok(table.len()?)
        };
        match count() {
            Ok(n) => n as usize,
            Err(e) => {
                log::warn!("cache count failed: {e}");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every committed write durable.
    pub fn flush(&self) -> Result<(), CacheError> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        txn.commit()?;
        Ok(())
    }

    /// Flush and close the store.
    pub fn close(self) -> Result<(), CacheError> {
        self.flush()?;
        log::info!("closed page cache at {}", self.path.display());
        Ok(())
    }
}

/// Resolve the store file path for a cache directory.
pub fn store_path(dir: &Path) -> PathBuf {
    dir.join(STORE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Placeholder;
    use crate::test_helpers::png_bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Cache) {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::open(tmp.path()).unwrap();
        (tmp, cache)
    }

    fn key(s: &str) -> PageId {
        PageId::new(s)
    }

    // =========================================================================
    // get / put
    // =========================================================================

    #[test]
    fn open_creates_store_file() {
        let (tmp, cache) = open_temp();
        assert!(store_path(tmp.path()).exists());
        assert!(cache.is_empty());
    }

    #[test]
    fn open_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/cache");
        Cache::open(&dir).unwrap();
        assert!(store_path(&dir).exists());
    }

    #[test]
    fn get_miss_is_empty() {
        let (_tmp, cache) = open_temp();
        assert!(cache.get(&key("/nope.png")).is_empty());
        assert!(!cache.contains(&key("/nope.png")));
    }

    #[test]
    fn put_then_get() {
        let (_tmp, cache) = open_temp();
        cache.put(&key("/a.png"), b"bytes").unwrap();
        assert_eq!(cache.get(&key("/a.png")), b"bytes");
        assert!(cache.contains(&key("/a.png")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_overwrites() {
        let (_tmp, cache) = open_temp();
        cache.put(&key("/a.png"), b"first").unwrap();
        cache.put(&key("/a.png"), b"second").unwrap();
        assert_eq!(cache.get(&key("/a.png")), b"second");
    }

    #[test]
    fn entries_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::open(tmp.path()).unwrap();
        cache.put(&key("/a.png"), b"kept").unwrap();
        cache.close().unwrap();

        let reopened = Cache::open(tmp.path()).unwrap();
        assert_eq!(reopened.get(&key("/a.png")), b"kept");
    }

    // =========================================================================
    // load_if_absent
    // =========================================================================

    #[test]
    fn load_if_absent_stores_first_value() {
        let (_tmp, cache) = open_temp();
        let stored = cache
            .load_if_absent(&key("/a.png"), || Ok(b"first".to_vec()))
            .unwrap();
        assert!(stored);
        assert_eq!(cache.get(&key("/a.png")), b"first");
    }

    #[test]
    fn load_if_absent_never_overwrites() {
        let (_tmp, cache) = open_temp();
        cache
            .load_if_absent(&key("/a.png"), || Ok(b"first".to_vec()))
            .unwrap();
        let stored = cache
            .load_if_absent(&key("/a.png"), || Ok(b"second".to_vec()))
            .unwrap();
        assert!(!stored);
        assert_eq!(cache.get(&key("/a.png")), b"first");
    }

    #[test]
    fn load_if_absent_skips_source_when_present() {
        let (_tmp, cache) = open_temp();
        cache.put(&key("/a.png"), b"cached").unwrap();
        let stored = cache
            .load_if_absent(&key("/a.png"), || panic!("source must not be read"))
            .unwrap();
        assert!(!stored);
    }

    #[test]
    fn load_if_absent_propagates_source_error() {
        let (_tmp, cache) = open_temp();
        let result = cache.load_if_absent(&key("/gone.png"), || {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        assert!(matches!(result, Err(CacheError::Io(_))));
        assert!(!cache.contains(&key("/gone.png")));
    }

    #[test]
    fn concurrent_load_if_absent_stores_once() {
        let (_tmp, cache) = open_temp();
        let cache = Arc::new(cache);
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    let stored = cache
                        .load_if_absent(&key("/shared.png"), || Ok(vec![i; 16]))
                        .unwrap();
                    if stored {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        let value = cache.get(&key("/shared.png"));
        assert_eq!(value.len(), 16);
        assert!(value.iter().all(|b| *b == value[0]));
    }

    // =========================================================================
    // image
    // =========================================================================

    #[test]
    fn image_miss_is_not_ready() {
        let (_tmp, cache) = open_temp();
        assert_eq!(
            cache.image(&key("/a.png")).placeholder(),
            Some(Placeholder::NotReady)
        );
    }

    #[test]
    fn image_of_garbage_is_error_and_bytes_stay() {
        let (_tmp, cache) = open_temp();
        cache.put(&key("/bad.png"), b"not an image").unwrap();
        assert_eq!(
            cache.image(&key("/bad.png")).placeholder(),
            Some(Placeholder::Error)
        );
        assert_eq!(cache.get(&key("/bad.png")), b"not an image");
    }

    #[test]
    fn image_reads_do_not_mutate_bytes() {
        let (_tmp, cache) = open_temp();
        let png = png_bytes(12, 7);
        cache.put(&key("/a.png"), &png).unwrap();

        let first = cache.image(&key("/a.png"));
        let second = cache.image(&key("/a.png"));
        assert!(first.is_decoded());
        assert_eq!(first.dimensions(), (12, 7));
        assert_eq!(first.dimensions(), second.dimensions());
        assert_eq!(cache.get(&key("/a.png")), png);
    }
}
