//! Shared test utilities for the comic test suite.
//!
//! Builds real image and archive fixtures on the fly so classification runs
//! against genuine signatures rather than file extensions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_png(&tmp.path().join("001.png"), 4, 4);
//! write_zip(&tmp.path().join("vol1.cbz"), &[("a.png", &png_bytes(2, 2))]);
//! write_tar(&tmp.path().join("vol2.cbt"), &[("a.png", &png_bytes(2, 2))]);
//! ```

use flate2::Compression;
use flate2::write::GzEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

use crate::types::{Book, PageId};

// =========================================================================
// Fixture builders
// =========================================================================

/// Encode a solid `width`x`height` PNG in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([0x20, 0x60, 0xa0]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Write a small PNG to `path`, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

/// Write a zip archive with the given `(inner path, bytes)` entries.
///
/// Inner paths ending in `/` become directory entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Write an uncompressed tar archive with the given entries.
pub fn write_tar(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut tar = tar::Builder::new(file);
    append_tar_entries(&mut tar, entries);
    tar.finish().unwrap();
}

/// Write a gzip-compressed tar archive with the given entries.
pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    append_tar_entries(&mut tar, entries);
    tar.into_inner().unwrap().finish().unwrap();
}

fn append_tar_entries<W: Write>(tar: &mut tar::Builder<W>, entries: &[(&str, &[u8])]) {
    for (name, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, *bytes).unwrap();
    }
}

/// Write a one-entry stored zip whose central directory claims the entry
/// decompresses to `claimed` bytes (through a zip64 extra field). The local
/// header and the stored data are honest.
pub fn write_zip_claiming_size(path: &Path, name: &str, data: &[u8], claimed: u64) {
    let crc = crc32(data);
    let len = data.len() as u32;
    let name_len = name.len() as u16;
    let mut out = Vec::new();

    // Local file header
    out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    for field in [45u16, 0, 0, 0, 0x21] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for field in [crc, len, len] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(data);

    // Central directory header
    let central_start = out.len() as u32;
    out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
    for field in [45u16, 45, 0, 0, 0, 0x21] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for field in [crc, len, u32::MAX] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for field in [name_len, 12, 0, 0, 0] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&claimed.to_le_bytes());
    let central_len = out.len() as u32 - central_start;

    // End of central directory
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    for field in [0u16, 0, 1, 1] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&central_len.to_le_bytes());
    out.extend_from_slice(&central_start.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    std::fs::write(path, out).unwrap();
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0xedb8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

/// Canonical form of `path` as a page id.
pub fn page_of(path: &Path) -> PageId {
    PageId::from_path(&path.canonicalize().unwrap())
}

// =========================================================================
// Book lookups
// =========================================================================

/// Page ids of a book as plain strings.
pub fn sub_names(book: &Book) -> Vec<&str> {
    book.subs.iter().map(PageId::as_str).collect()
}

/// Build a book from string ids.
pub fn book(path: &str, subs: &[&str]) -> Book {
    Book {
        path: PageId::new(path),
        subs: subs.iter().map(|s| PageId::new(*s)).collect(),
    }
}
