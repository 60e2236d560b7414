//! Pure calculation functions for page dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use std::ops::Mul;

/// A width/height pair in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f32, height as f32)
    }
}

impl Mul<f32> for Size {
    type Output = Size;

    fn mul(self, scale: f32) -> Size {
        Size::new(self.width * scale, self.height * scale)
    }
}

/// Largest size with the aspect ratio of `content` that fits inside `bounds`.
///
/// Scales to the bounding width first and falls back to the bounding height
/// when that would overflow vertically. Used by the "fit to window" mode.
///
/// # Examples
/// ```
/// # use comic::imaging::{Size, fit_within};
/// assert_eq!(
///     fit_within(Size::new(100.0, 50.0), Size::new(200.0, 200.0)),
///     Size::new(200.0, 100.0)
/// );
/// ```
pub fn fit_within(content: Size, bounds: Size) -> Size {
    let mut scale = bounds.width / content.width;
    if content.height * scale > bounds.height {
        scale = bounds.height / content.height;
    }
    content * scale
}
