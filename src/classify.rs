//! Content sniffing from a fixed-size file header.
//!
//! Classification never looks at file names or extensions: comic archives are
//! routinely renamed (`.cbz`, `.cbr`, `.zip`) and scanned pages often carry
//! the wrong extension. The first [`HEADER_LEN`] bytes are enough for every
//! signature we check, including the tar magic at offset 257.
//!
//! Archive detection is limited to what [`crate::archive`] reads: zip, tar
//! and gzip-compressed tar. RAR and 7z files are "other".

use image::ImageFormat;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of header bytes read from each candidate file.
pub const HEADER_LEN: usize = 262;

/// Container formats the archive reader can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    /// A gzip stream holding a tar (`.tar.gz`, `.cbt.gz`).
    TarGz,
}

/// Archive signatures as `(offset, magic, format)`.
///
/// Only formats with a reader are listed, so a header that matches is one
/// [`crate::archive::read_archive`] can open.
const ARCHIVE_SIGNATURES: &[(usize, &[u8], ArchiveFormat)] = &[
    (0, b"PK\x03\x04", ArchiveFormat::Zip),
    (0, b"PK\x05\x06", ArchiveFormat::Zip),
    (0, b"PK\x07\x08", ArchiveFormat::Zip),
    (0, b"\x1f\x8b", ArchiveFormat::TarGz),
    (257, b"ustar", ArchiveFormat::Tar),
];

/// What a header looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Image,
    Archive,
    Other,
}

/// Classify a header, images first.
pub fn classify(header: &[u8]) -> Kind {
    if is_image(header) {
        Kind::Image
    } else if is_archive(header) {
        Kind::Archive
    } else {
        Kind::Other
    }
}

/// True when the header carries the signature of an image format we can decode.
///
/// `guess_format` knows more formats than the decoders compiled in, so the
/// guess is filtered through [`ImageFormat::reading_enabled`].
pub fn is_image(header: &[u8]) -> bool {
    image::guess_format(header).is_ok_and(|format: ImageFormat| format.reading_enabled())
}

/// True when the header carries the signature of a readable archive.
pub fn is_archive(header: &[u8]) -> bool {
    archive_format(header).is_some()
}

/// Container format named by the header, if any.
pub fn archive_format(header: &[u8]) -> Option<ArchiveFormat> {
    ARCHIVE_SIGNATURES
        .iter()
        .find(|(offset, magic, _)| {
            header
                .get(*offset..*offset + magic.len())
                .is_some_and(|window| window == *magic)
        })
        .map(|(_, _, format)| *format)
}

/// Read up to [`HEADER_LEN`] bytes from `reader`.
///
/// Short streams yield a short header; it is up to the signature checks to
/// reject what they cannot match.
pub fn read_header(reader: impl Read) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    reader.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Open `path` and classify its header.
pub fn classify_file(path: &Path) -> io::Result<Kind> {
    let header = read_header(File::open(path)?)?;
    Ok(classify(&header))
}
