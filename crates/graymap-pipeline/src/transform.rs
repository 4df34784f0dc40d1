//! In-place grid transforms: intensity inversion and horizontal flip.
//!
//! Both run on a fully decoded [`RasterImage`]; decoding is the only way
//! to obtain one, so no runtime "decoded yet?" check is needed.

use crate::types::RasterImage;

impl RasterImage {
    /// Replace every intensity `v` with `max_intensity - v`.
    ///
    /// The subtraction is 8-bit and wraps: a pixel brighter than the
    /// declared maximum (which the decoder does not reject) ends up near
    /// 255 instead of being clamped. The maximum itself is reduced to its
    /// low byte first, see [`RasterImage::max_intensity_u8`].
    ///
    /// Inverting twice restores every pixel `v <= max_intensity`.
    pub fn invert(&mut self) {
        let max = self.max_intensity_u8();
        for value in self.as_raw_mut() {
            *value = max.wrapping_sub(*value);
        }
    }

    /// Mirror every row left-to-right. Self-inverse.
    pub fn flip_horizontal(&mut self) {
        for row in self.rows_mut() {
            flip_row(row);
        }
    }

    /// Number of pixels brighter than the declared maximum, i.e. the
    /// pixels [`invert`](Self::invert) would wrap.
    #[must_use]
    pub fn count_above_max(&self) -> u64 {
        let max = self.max_intensity_u8();
        self.as_raw()
            .iter()
            .map(|&v| u64::from(v > max))
            .sum()
    }
}

/// Reverse `row` in place by swapping from both ends towards the middle.
///
/// An odd-length row keeps its middle element where it is.
pub fn flip_row(row: &mut [u8]) {
    let Some(mut right) = row.len().checked_sub(1) else {
        return;
    };
    let mut left = 0;
    while left < right {
        row.swap(left, right);
        left += 1;
        right -= 1;
    }
}
