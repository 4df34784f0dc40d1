//! Shared types for the graymap pipeline.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::threshold::Threshold;

/// Re-export `GrayImage` so downstream crates can reference the
/// decoded raster without depending on `image` directly.
pub use image::GrayImage;

/// Pixel encoding declared by the first header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTag {
    /// `P2`: pixel values as whitespace-separated decimal text.
    Ascii,
    /// `P5`: one raw byte per pixel, row-major.
    Binary,
}

impl FormatTag {
    /// The magic number written on the first header line.
    #[must_use]
    pub const fn magic(self) -> &'static str {
        match self {
            Self::Ascii => "P2",
            Self::Binary => "P5",
        }
    }

    /// Look up a tag by its magic number. The input must already be
    /// trimmed; no other spellings are accepted.
    #[must_use]
    pub fn from_magic(magic: &str) -> Option<Self> {
        match magic {
            "P2" => Some(Self::Ascii),
            "P5" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.magic())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Values parsed from the three header lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Pixel encoding of the remaining stream.
    pub format: FormatTag,
    /// Declared image size. Both axes are positive.
    pub dimensions: Dimensions,
    /// Declared maximum intensity. Not checked against pixel values.
    pub max_intensity: u32,
}

/// A decoded 8-bit graymap.
///
/// Pixels are stored row-major in a [`GrayImage`], so the grid always
/// holds exactly `height` rows of `width` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    format: FormatTag,
    max_intensity: u32,
    pixels: GrayImage,
}

impl RasterImage {
    /// Wrap an existing grayscale buffer.
    #[must_use]
    pub const fn new(format: FormatTag, max_intensity: u32, pixels: GrayImage) -> Self {
        Self {
            format,
            max_intensity,
            pixels,
        }
    }

    /// Build an image from row-major pixel values.
    ///
    /// Returns `None` if `pixels.len()` is not `width * height`.
    #[must_use]
    pub fn from_raw(
        format: FormatTag,
        max_intensity: u32,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Option<Self> {
        // `GrayImage::from_raw` accepts oversized buffers; the grid must
        // match exactly.
        if pixels.len() as u64 != u64::from(width) * u64::from(height) {
            return None;
        }
        GrayImage::from_raw(width, height, pixels)
            .map(|pixels| Self::new(format, max_intensity, pixels))
    }

    /// Encoding the image was decoded from.
    #[must_use]
    pub const fn format(&self) -> FormatTag {
        self.format
    }

    /// Maximum intensity as declared by the header.
    #[must_use]
    pub const fn max_intensity(&self) -> u32 {
        self.max_intensity
    }

    /// The declared maximum reduced to its low 8 bits.
    ///
    /// Pixel arithmetic is 8-bit, so a declared maximum above 255 wraps
    /// (e.g. 256 becomes 0).
    #[must_use]
    pub const fn max_intensity_u8(&self) -> u8 {
        self.max_intensity.to_le_bytes()[0]
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The header this image would be written with.
    #[must_use]
    pub fn header(&self) -> Header {
        Header {
            format: self.format,
            dimensions: self.dimensions(),
            max_intensity: self.max_intensity,
        }
    }

    /// Intensity at `(row, column)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, row: u32, column: u32) -> Option<u8> {
        (row < self.height() && column < self.width())
            .then(|| self.pixels.get_pixel(column, row).0[0])
    }

    /// Iterate over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let width = self.width() as usize;
        let raw: &[u8] = &self.pixels;
        (0..self.height() as usize).map(move |y| &raw[y * width..(y + 1) * width])
    }

    /// Mutable access to each row, top to bottom.
    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        let width = self.width() as usize;
        let raw: &mut [u8] = &mut self.pixels;
        // `chunks_exact_mut(0)` panics; a zero-width grid has no pixels to visit.
        raw.chunks_exact_mut(width.max(1))
    }

    /// Copy the grid out as nested rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows().map(<[u8]>::to_vec).collect()
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable view of all pixels, row-major.
    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Borrow the underlying [`GrayImage`].
    #[must_use]
    pub const fn as_gray_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Consume the image and return the underlying [`GrayImage`].
    #[must_use]
    pub fn into_gray_image(self) -> GrayImage {
        self.pixels
    }
}

/// A two-valued bitmap derived from a [`RasterImage`].
///
/// `true` is black (ink), `false` is white. This matches the PBM bit
/// convention where a set bit is black.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonochromeImage {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl MonochromeImage {
    /// Build a bitmap from row-major values.
    ///
    /// Returns `None` if `pixels.len()` is not `width * height`.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, pixels: Vec<bool>) -> Option<Self> {
        let expected = u64::from(width) * u64::from(height);
        (pixels.len() as u64 == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a bitmap whose length the caller has already guaranteed.
    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<bool>) -> Self {
        debug_assert_eq!(
            pixels.len() as u64,
            u64::from(width) * u64::from(height),
            "bitmap length does not match its dimensions"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether the pixel at `(row, column)` is black; `None` when out of
    /// bounds.
    #[must_use]
    pub fn get(&self, row: u32, column: u32) -> Option<bool> {
        (row < self.height && column < self.width)
            .then(|| self.pixels[row as usize * self.width as usize + column as usize])
    }

    /// Iterate over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        let width = self.width as usize;
        (0..self.height as usize).map(move |y| &self.pixels[y * width..(y + 1) * width])
    }

    /// Number of black pixels.
    #[must_use]
    pub fn black_count(&self) -> u64 {
        self.pixels.iter().map(|&b| u64::from(b)).sum()
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn as_raw(&self) -> &[bool] {
        &self.pixels
    }
}

/// Configuration for the graymap pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Replace every intensity `v` with `max_intensity - v`.
    pub invert: bool,

    /// Mirror every row left-to-right.
    pub flip: bool,

    /// Rule deciding which intensities become black.
    pub threshold: Threshold,
}

impl PipelineConfig {
    /// Default for [`invert`](Self::invert).
    pub const DEFAULT_INVERT: bool = true;
    /// Default for [`flip`](Self::flip).
    pub const DEFAULT_FLIP: bool = true;
    /// Default for [`threshold`](Self::threshold).
    pub const DEFAULT_THRESHOLD: Threshold = Threshold::Midpoint;
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            invert: Self::DEFAULT_INVERT,
            flip: Self::DEFAULT_FLIP,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

/// Result of running the full pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// The decoded graymap after the configured transforms.
    pub raster: RasterImage,

    /// The thresholded bitmap, same dimensions as `raster`.
    pub monochrome: MonochromeImage,
}

/// Errors produced while decoding a graymap.
///
/// Every variant is fatal to the decode call; no partial grid is
/// returned. Rows and columns are zero-based.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The first line is not `P2` or `P5`.
    #[error("invalid format tag {found:?}, expected \"P2\" or \"P5\"")]
    InvalidFormatTag {
        /// The trimmed first line.
        found: String,
    },

    /// The second line is not two positive integers.
    #[error("malformed dimensions {line:?}: {reason}")]
    MalformedDimensions {
        /// The trimmed second line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The third line is not a non-negative integer.
    #[error("malformed maximum intensity {line:?}")]
    MalformedMaxIntensity {
        /// The trimmed third line.
        line: String,
    },

    /// An ASCII pixel row could not be read.
    #[error("failed to read pixel row {row}: {reason}")]
    RowReadError {
        /// Row being read.
        row: u32,
        /// Cause, e.g. end of stream.
        reason: String,
    },

    /// An ASCII pixel row holds more than `width` values.
    #[error("row {row} has more than {width} pixel values")]
    TokenIndexOutOfRange {
        /// Offending row.
        row: u32,
        /// Index of the first surplus token.
        column: u32,
        /// Declared width.
        width: u32,
    },

    /// An ASCII pixel value is not an integer in `0..=255`.
    #[error("invalid pixel value {token:?} at row {row}, column {column}")]
    PixelParseError {
        /// Row of the token.
        row: u32,
        /// Column of the token.
        column: u32,
        /// The token text.
        token: String,
    },

    /// A binary pixel row is shorter than `width` bytes.
    #[error("unexpected end of stream at row {row}: expected {expected} bytes, got {received}")]
    UnexpectedEndOfStream {
        /// Row being read.
        row: u32,
        /// Bytes required (the width).
        expected: u32,
        /// Bytes available before the stream ended; 0 when the stream
        /// ended exactly at the row boundary.
        received: u32,
    },

    /// The underlying reader failed for a reason other than end of stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input could not be decoded.
    #[error("failed to decode graymap: {0}")]
    Decode(#[from] DecodeError),
}

/// Serde-compatible proxy for `DecodeError`.
///
/// `std::io::Error` does not implement serde, so `Io` carries its
/// `Display` string. A deserialized `Io` error has kind
/// [`io::ErrorKind::Other`].
#[derive(Serialize, Deserialize)]
enum DecodeErrorProxy {
    InvalidFormatTag {
        found: String,
    },
    MalformedDimensions {
        line: String,
        reason: String,
    },
    MalformedMaxIntensity {
        line: String,
    },
    RowReadError {
        row: u32,
        reason: String,
    },
    TokenIndexOutOfRange {
        row: u32,
        column: u32,
        width: u32,
    },
    PixelParseError {
        row: u32,
        column: u32,
        token: String,
    },
    UnexpectedEndOfStream {
        row: u32,
        expected: u32,
        received: u32,
    },
    Io(String),
}

impl Serialize for DecodeError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::InvalidFormatTag { found } => DecodeErrorProxy::InvalidFormatTag {
                found: found.clone(),
            },
            Self::MalformedDimensions { line, reason } => DecodeErrorProxy::MalformedDimensions {
                line: line.clone(),
                reason: reason.clone(),
            },
            Self::MalformedMaxIntensity { line } => {
                DecodeErrorProxy::MalformedMaxIntensity { line: line.clone() }
            }
            Self::RowReadError { row, reason } => DecodeErrorProxy::RowReadError {
                row: *row,
                reason: reason.clone(),
            },
            Self::TokenIndexOutOfRange { row, column, width } => {
                DecodeErrorProxy::TokenIndexOutOfRange {
                    row: *row,
                    column: *column,
                    width: *width,
                }
            }
            Self::PixelParseError { row, column, token } => DecodeErrorProxy::PixelParseError {
                row: *row,
                column: *column,
                token: token.clone(),
            },
            Self::UnexpectedEndOfStream {
                row,
                expected,
                received,
            } => DecodeErrorProxy::UnexpectedEndOfStream {
                row: *row,
                expected: *expected,
                received: *received,
            },
            Self::Io(e) => DecodeErrorProxy::Io(e.to_string()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DecodeError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = DecodeErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            DecodeErrorProxy::InvalidFormatTag { found } => Self::InvalidFormatTag { found },
            DecodeErrorProxy::MalformedDimensions { line, reason } => {
                Self::MalformedDimensions { line, reason }
            }
            DecodeErrorProxy::MalformedMaxIntensity { line } => Self::MalformedMaxIntensity { line },
            DecodeErrorProxy::RowReadError { row, reason } => Self::RowReadError { row, reason },
            DecodeErrorProxy::TokenIndexOutOfRange { row, column, width } => {
                Self::TokenIndexOutOfRange { row, column, width }
            }
            DecodeErrorProxy::PixelParseError { row, column, token } => {
                Self::PixelParseError { row, column, token }
            }
            DecodeErrorProxy::UnexpectedEndOfStream {
                row,
                expected,
                received,
            } => Self::UnexpectedEndOfStream {
                row,
                expected,
                received,
            },
            DecodeErrorProxy::Io(msg) => Self::Io(io::Error::other(msg)),
        })
    }
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    EmptyInput,
    Decode(DecodeError),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::EmptyInput => PipelineErrorProxy::EmptyInput.serialize(serializer),
            Self::Decode(e) => {
                // `DecodeError` is not `Clone`; serialize it through a borrow.
                #[derive(Serialize)]
                enum Borrowed<'a> {
                    Decode(&'a DecodeError),
                }
                Borrowed::Decode(e).serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::Decode(e) => Self::Decode(e),
        })
    }
}
