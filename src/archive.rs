//! Reading image pages out of archives: zip (`.zip`, `.cbz`), tar (`.cbt`)
//! and gzip-compressed tar.
//!
//! An archive becomes exactly one [`Book`]. Entries are classified by their
//! content, not their names, so `ComicInfo.xml`, thumbnails databases and
//! other sidecar files inside a `.cbz` are dropped, and pages named without
//! extensions are still found.
//!
//! Sizes recorded in an archive's own headers are never trusted for
//! allocation. Every entry is read through [`read_capped`], which stops at
//! [`MAX_PAGE_BYTES`].

use crate::classify::{self, ArchiveFormat};
use crate::populate::{Populate, Source};
use crate::types::{Book, PageId};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Largest page accepted from an archive entry.
pub const MAX_PAGE_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on the buffer reserved up front from a size hint.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Not a readable archive: {0}")]
    Unsupported(PathBuf),
}

/// Read the image pages of the archive at `path`.
///
/// `path` should already be canonical: it becomes the book path and the
/// prefix of every page id. Each image entry is handed to `sink` for
/// caching once the entry list is sorted. Unreadable entries are skipped. An
/// archive without images yields a book with no pages.
pub fn read_archive(path: &Path, sink: &dyn Populate) -> Result<Book, ArchiveError> {
    log::debug!("reading archive {}", path.display());
    let open_error = |source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    };

    let mut inner_paths = match detect(path).map_err(open_error)? {
        Some(ArchiveFormat::Zip) => zip_images(path).map_err(open_error)?,
        Some(ArchiveFormat::Tar) => tar_images(path, File::open(path).map_err(open_error)?)
            .map_err(open_error)?,
        Some(ArchiveFormat::TarGz) => {
            let file = File::open(path).map_err(open_error)?;
            tar_images(path, GzDecoder::new(BufReader::new(file))).map_err(open_error)?
        }
        None => return Err(ArchiveError::Unsupported(path.to_path_buf())),
    };

    inner_paths.sort();

    let book_path = PageId::from_path(path);
    let subs = inner_paths
        .into_iter()
        .map(|inner| {
            let page = PageId::in_archive(&book_path, &inner);
            sink.populate(
                page.clone(),
                Source::ArchiveEntry {
                    archive: path.to_path_buf(),
                    inner,
                },
            );
            page
        })
        .collect();

    Ok(Book {
        path: book_path,
        subs,
    })
}

/// Full decompressed bytes of the entry `inner` of the archive at `path`.
pub fn read_entry(path: &Path, inner: &str) -> io::Result<Vec<u8>> {
    match detect(path)? {
        Some(ArchiveFormat::Zip) => {
            let mut zip = ZipArchive::new(File::open(path)?)?;
            let entry = zip.by_name(inner)?;
            let hint = entry.size();
            read_capped(entry, hint)
        }
        Some(ArchiveFormat::Tar) => tar_entry(File::open(path)?, inner),
        Some(ArchiveFormat::TarGz) => {
            tar_entry(GzDecoder::new(BufReader::new(File::open(path)?)), inner)
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("not a readable archive: {}", path.display()),
        )),
    }
}

/// Read all of `reader`, refusing more than [`MAX_PAGE_BYTES`].
///
/// `size_hint` only sizes the initial buffer, and is capped.
pub fn read_capped(reader: impl Read, size_hint: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(size_hint.min(PREALLOC_LIMIT) as usize);
    reader.take(MAX_PAGE_BYTES + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_PAGE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("entry larger than {MAX_PAGE_BYTES} bytes"),
        ));
    }
    Ok(bytes)
}

fn detect(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    let header = classify::read_header(File::open(path)?)?;
    Ok(classify::archive_format(&header))
}

fn zip_images(path: &Path) -> io::Result<Vec<String>> {
    let mut zip = ZipArchive::new(File::open(path)?)?;
    let mut images = Vec::new();
    for index in 0..zip.len() {
        let entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping entry {index} of {}: {e}", path.display());
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        match classify::read_header(entry) {
            Ok(header) if classify::is_image(&header) => images.push(name),
            Ok(_) => log::debug!("pass {name} in {}", path.display()),
            Err(e) => log::warn!("skipping {name} in {}: {e}", path.display()),
        }
    }
    Ok(images)
}

/// Inner path of a tar entry, `/`-separated.
fn tar_name<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<String> {
    Ok(entry.path()?.to_string_lossy().replace('\\', "/"))
}

fn tar_images(path: &Path, reader: impl Read) -> io::Result<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut images = Vec::new();
    for entry in archive.entries()? {
        // A broken tar header leaves no way to find the next entry
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("stopping at bad entry in {}: {e}", path.display());
                break;
            }
        };
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = match tar_name(&entry) {
            Ok(name) => name,
            Err(e) => {
                log::warn!("skipping entry in {}: {e}", path.display());
                continue;
            }
        };
        match classify::read_header(&mut entry) {
            Ok(header) if classify::is_image(&header) => images.push(name),
            Ok(_) => log::debug!("pass {name} in {}", path.display()),
            Err(e) => log::warn!("skipping {name} in {}: {e}", path.display()),
        }
    }
    Ok(images)
}

/// Tar has no index: scan forward to the entry named `inner`.
fn tar_entry(reader: impl Read, inner: &str) -> io::Result<Vec<u8>> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_file() && tar_name(&entry)? == inner {
            let hint = entry.size();
            return read_capped(entry, hint);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no entry {inner}"),
    ))
}
