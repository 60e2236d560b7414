//! Decoded page bitmaps and the placeholders shown in their place.

use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::LazyLock;

/// Edge length of the square placeholder images.
const PLACEHOLDER_EDGE: u32 = 400;

static NOT_READY: LazyLock<DynamicImage> = LazyLock::new(|| {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PLACEHOLDER_EDGE,
        PLACEHOLDER_EDGE,
        Rgba([0x88, 0x88, 0x88, 0xff]),
    ))
});

static ERROR: LazyLock<DynamicImage> = LazyLock::new(|| {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PLACEHOLDER_EDGE,
        PLACEHOLDER_EDGE,
        Rgba([0x8b, 0x1a, 0x1a, 0xff]),
    ))
});

/// Why a page is shown as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// No bytes cached for the page yet.
    NotReady,
    /// Bytes are cached but are not a decodable image.
    Error,
}

impl Placeholder {
    /// The constant bitmap for this placeholder. Never persisted.
    pub fn image(self) -> &'static DynamicImage {
        match self {
            Placeholder::NotReady => &*NOT_READY,
            Placeholder::Error => &*ERROR,
        }
    }
}

/// What the cache hands to a renderer for one page.
#[derive(Debug, Clone)]
pub enum Bitmap {
    Decoded(DynamicImage),
    Placeholder(Placeholder),
}

impl Bitmap {
    /// Decode raw source bytes, falling back to a placeholder.
    ///
    /// Empty input means "not cached yet", anything else that fails to decode
    /// is an error.
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Bitmap::Placeholder(Placeholder::NotReady);
        }
        match image::load_from_memory(bytes) {
            Ok(img) => Bitmap::Decoded(img),
            Err(e) => {
                log::debug!("decode failed: {e}");
                Bitmap::Placeholder(Placeholder::Error)
            }
        }
    }

    pub fn image(&self) -> &DynamicImage {
        match self {
            Bitmap::Decoded(img) => img,
            Bitmap::Placeholder(p) => p.image(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let img = self.image();
        (img.width(), img.height())
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        match self {
            Bitmap::Decoded(_) => None,
            Bitmap::Placeholder(p) => Some(*p),
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, Bitmap::Decoded(_))
    }
}
