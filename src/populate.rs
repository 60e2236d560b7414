//! Cache population seam between the scanner and the page cache.
//!
//! The scanner only decides *what* should be cached; a [`Populate`]
//! implementation decides *how*. [`Background`] hands every page to the rayon
//! pool and returns immediately, [`Prefill`] writes synchronously.

use crate::archive;
use crate::cache::Cache;
use crate::types::PageId;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

/// Where the bytes of a page come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A loose image file.
    File(PathBuf),
    /// A member of an archive, by inner name.
    ArchiveEntry { archive: PathBuf, inner: String },
}

impl Source {
    /// Read the full, decompressed bytes of the page.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            Source::File(path) => std::fs::read(path),
            Source::ArchiveEntry { archive, inner } => archive::read_entry(archive, inner),
        }
    }
}

/// Receives every page the scanner discovers.
pub trait Populate: Sync {
    /// Arrange for `key` to be cached from `source`. Must not block on I/O
    /// unless the implementation is explicitly synchronous.
    fn populate(&self, key: PageId, source: Source);
}

/// Count of background writes still running.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<(Mutex<usize>, Condvar)>);

impl InFlight {
    /// Count one more write; it is finished when the guard drops, even if
    /// the write panics.
    fn start(&self) -> InFlightGuard {
        let (count, _) = &*self.0;
        *count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        InFlightGuard(self.clone())
    }

    fn finish(&self) {
        let (count, done) = &*self.0;
        let mut count = count.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            done.notify_all();
        }
    }

    pub fn pending(&self) -> usize {
        *self.0.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until every started write has finished.
    pub fn wait(&self) {
        let (count, done) = &*self.0;
        let mut count = count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = done.wait(count).unwrap_or_else(|e| e.into_inner());
        }
    }
}

struct InFlightGuard(InFlight);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Fire-and-forget population on the rayon pool.
///
/// Failures are logged and otherwise dropped; nothing waits on a single write.
#[derive(Clone)]
pub struct Background {
    cache: Arc<Cache>,
    in_flight: InFlight,
}

impl Background {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self {
            cache,
            in_flight: InFlight::default(),
        }
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }
}

impl Populate for Background {
    fn populate(&self, key: PageId, source: Source) {
        let cache = Arc::clone(&self.cache);
        let guard = self.in_flight.start();
        rayon::spawn(move || {
            match cache.load_if_absent(&key, || source.read()) {
                Ok(true) => log::debug!("populated {key}"),
                Ok(false) => {}
                Err(e) => log::warn!("failed to cache {key}: {e}"),
            }
            // Release the store before reporting, so a waiter can close it
            drop(cache);
            drop(guard);
        });
    }
}

/// Synchronous pre-fill: every page is read and written before the scan moves on.
pub struct Prefill<'a>(pub &'a Cache);

impl Populate for Prefill<'_> {
    fn populate(&self, key: PageId, source: Source) {
        let result = source
            .read()
            .map_err(Into::into)
            .and_then(|bytes| self.0.put(&key, &bytes));
        if let Err(e) = result {
            log::warn!("failed to cache {key}: {e}");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::{png_bytes, write_tar, write_zip, write_zip_claiming_size};
    use tempfile::TempDir;

    /// Populator that records requests without reading anything.
    /// Uses Mutex (not RefCell) so it is Sync.
    #[derive(Default)]
    pub struct Recorder {
        pub requests: Mutex<Vec<(PageId, Source)>>,
    }

    impl Recorder {
        pub fn keys(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(k, _)| k.to_string())
                .collect()
        }
    }

    impl Populate for Recorder {
        fn populate(&self, key: PageId, source: Source) {
            self.requests.lock().unwrap().push((key, source));
        }
    }

    #[test]
    fn file_source_reads_whole_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        std::fs::write(&path, b"payload").unwrap();
        assert_eq!(Source::File(path).read().unwrap(), b"payload");
    }

    #[test]
    fn archive_source_reads_decompressed_entry() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("book.cbz");
        let png = png_bytes(3, 3);
        write_zip(&archive, &[("pages/001.png", &png)]);

        let source = Source::ArchiveEntry {
            archive,
            inner: "pages/001.png".into(),
        };
        assert_eq!(source.read().unwrap(), png);
    }

    #[test]
    fn archive_source_missing_entry_is_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("book.cbz");
        write_zip(&archive, &[("a.png", b"x")]);

        let source = Source::ArchiveEntry {
            archive,
            inner: "missing.png".into(),
        };
        assert!(source.read().is_err());
    }

    #[test]
    fn archive_source_reads_tar_entry() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("book.cbt");
        let png = png_bytes(2, 2);
        write_tar(&archive, &[("001.png", &png)]);

        let source = Source::ArchiveEntry {
            archive,
            inner: "001.png".into(),
        };
        assert_eq!(source.read().unwrap(), png);
    }

    #[test]
    fn archive_source_with_lying_size_returns() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("liar.cbz");
        let png = png_bytes(2, 2);
        write_zip_claiming_size(&archive, "001.png", &png, 1 << 62);

        let source = Source::ArchiveEntry {
            archive,
            inner: "001.png".into(),
        };
        if let Ok(bytes) = source.read() {
            assert_eq!(bytes, png);
        }
    }

    #[test]
    fn in_flight_guard_finishes_on_panic() {
        let in_flight = InFlight::default();
        let guard = in_flight.start();
        assert_eq!(in_flight.pending(), 1);

        let result = std::thread::spawn(move || {
            let _guard = guard;
            panic!("write failed");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(in_flight.pending(), 0);
        in_flight.wait();
    }

    #[test]
    fn background_population_lands_in_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(Cache::open(&tmp.path().join("cache")).unwrap());
        let path = tmp.path().join("a.png");
        std::fs::write(&path, b"bytes").unwrap();

        let background = Background::new(Arc::clone(&cache));
        background.populate(PageId::from_path(&path), Source::File(path.clone()));
        background.in_flight().wait();

        assert_eq!(background.in_flight().pending(), 0);
        assert_eq!(cache.get(&PageId::from_path(&path)), b"bytes");
    }

    #[test]
    fn background_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(Cache::open(tmp.path()).unwrap());
        let background = Background::new(Arc::clone(&cache));
        let missing = tmp.path().join("missing.png");

        background.populate(PageId::from_path(&missing), Source::File(missing.clone()));
        background.in_flight().wait();

        assert!(!cache.contains(&PageId::from_path(&missing)));
    }

    #[test]
    fn prefill_writes_synchronously() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::open(&tmp.path().join("cache")).unwrap();
        let path = tmp.path().join("a.png");
        std::fs::write(&path, b"now").unwrap();

        Prefill(&cache).populate(PageId::new("k"), Source::File(path));
        assert_eq!(cache.get(&PageId::new("k")), b"now");
    }
}
