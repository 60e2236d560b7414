//! Page imaging: decoding, placeholders, and size math.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` (see [`crate::classify`]) |
//! | **Decode** | `image::load_from_memory` |
//! | **Fit** | [`fit_within`], pure |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Bitmap**: [`Bitmap`] and the constant [`Placeholder`] images

mod bitmap;
mod calculations;

pub use bitmap::{Bitmap, Placeholder};
pub use calculations::{Size, fit_within};
