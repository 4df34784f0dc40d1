//! Monochrome conversion.
//!
//! Each pixel darker than the cut becomes black (`true`); everything
//! else is white. Dimensions are preserved.

use serde::{Deserialize, Serialize};

use crate::types::{MonochromeImage, RasterImage};

/// Rule choosing the cut between black and white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Threshold {
    /// Half the declared maximum intensity (integer division).
    #[default]
    Midpoint,
    /// An explicit cut.
    Fixed(u8),
}

impl Threshold {
    /// The cut for `image`: intensities strictly below it are black.
    ///
    /// `Midpoint` uses the same low-byte maximum as
    /// [`RasterImage::invert`], so both agree on the image's range.
    #[must_use]
    pub const fn cut(self, image: &RasterImage) -> u8 {
        match self {
            Self::Midpoint => image.max_intensity_u8() / 2,
            Self::Fixed(cut) => cut,
        }
    }
}

/// Convert `image` into a bitmap of the same dimensions.
#[must_use = "returns the monochrome bitmap"]
pub fn to_monochrome(image: &RasterImage, threshold: Threshold) -> MonochromeImage {
    let cut = threshold.cut(image);
    let pixels = image.as_raw().iter().map(|&v| v < cut).collect();
    // One bool per raster pixel, so the lengths agree by construction.
    MonochromeImage::from_parts(image.width(), image.height(), pixels)
}
