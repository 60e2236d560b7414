//! Background ingestion: walk the roots on a dedicated thread and stream
//! what is found to the consumer as [`Discovery`] messages.
//!
//! ```text
//! roots ──walk──▶ Page, Page, …, BookEnd ──channel──▶ Shelf::consume
//!          │
//!          └──populate──▶ rayon pool ──▶ Cache
//! ```
//!
//! A directory's pages go out one by one while the directory is still being
//! classified, and the book is closed by a [`Discovery::BookEnd`] carrying
//! its path. Standalone images skip the framing and arrive as a single
//! [`Discovery::Single`].

use crate::cache::Cache;
use crate::populate::{Background, InFlight};
use crate::scan;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

pub use crate::types::Discovery;

/// Handle to a running ingestion.
pub struct Ingest {
    handle: JoinHandle<()>,
    in_flight: InFlight,
}

impl Ingest {
    /// Background cache writes started by this scan.
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Wait for the walk to finish.
    pub fn join(self) {
        if self.handle.join().is_err() {
            log::error!("ingest thread panicked");
        }
    }
}

/// Start walking `roots` in order on a background thread.
///
/// Every discovered page is scheduled into `cache`. The channel closes once
/// all roots are walked.
pub fn spawn(roots: Vec<PathBuf>, cache: Arc<Cache>) -> io::Result<(Receiver<Discovery>, Ingest)> {
    let (tx, rx) = mpsc::channel();
    let sink = Background::new(cache);
    let in_flight = sink.in_flight();

    let handle = thread::Builder::new()
        .name("ingest".into())
        .spawn(move || {
            for root in &roots {
                // A closed receiver means nobody is browsing anymore; the
                // walk still finishes so the cache gets filled.
                scan::walk(root, &sink, &mut |message| {
                    let _ = tx.send(message);
                });
            }
            log::info!("scan finished");
        })?;

    Ok((rx, Ingest { handle, in_flight }))
}
