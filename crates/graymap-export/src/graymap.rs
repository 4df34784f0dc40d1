//! PGM (portable graymap) export serializer.
//!
//! Writes a [`RasterImage`] back out in either encoding the decoder
//! accepts. The header is always three lines: tag, `width height`, and
//! the declared maximum intensity, so the output decodes to the same
//! grid.

use std::fmt::Write;

use graymap_pipeline::{FormatTag, RasterImage};

/// Serialize `image` as a `P2` or `P5` graymap.
///
/// The ASCII encoding writes one line per row with space-separated
/// values. The binary encoding writes the pixel bytes row-major with no
/// separators.
///
/// # Examples
///
/// ```
/// use graymap_export::to_graymap;
/// use graymap_pipeline::{FormatTag, RasterImage};
///
/// let image = RasterImage::from_raw(FormatTag::Ascii, 255, 2, 1, vec![10, 20]).unwrap();
/// assert_eq!(to_graymap(&image, FormatTag::Ascii), b"P2\n2 1\n255\n10 20\n");
/// assert_eq!(to_graymap(&image, FormatTag::Binary), b"P5\n2 1\n255\n\x0a\x14");
/// ```
#[must_use]
pub fn to_graymap(image: &RasterImage, format: FormatTag) -> Vec<u8> {
    let mut header = String::new();
    let _ = write!(
        header,
        "{}\n{} {}\n{}\n",
        format.magic(),
        image.width(),
        image.height(),
        image.max_intensity()
    );

    let mut out = header.into_bytes();
    match format {
        FormatTag::Ascii => {
            for row in image.rows() {
                let line: Vec<String> = row.iter().map(u8::to_string).collect();
                out.extend_from_slice(line.join(" ").as_bytes());
                out.push(b'\n');
            }
        }
        FormatTag::Binary => out.extend_from_slice(image.as_raw()),
    }
    out
}
