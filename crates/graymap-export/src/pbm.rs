//! PBM (portable bitmap) export serializer.
//!
//! Writes a [`MonochromeImage`] as either encoding of the netpbm bitmap
//! format:
//!
//! - **Plain** (`P1`): `1`/`0` text tokens, one or more lines per row.
//! - **Raw** (`P4`): rows packed eight pixels per byte, most significant
//!   bit first, each row padded to a whole byte.
//!
//! In both encodings a set bit (`1`) is black, which is also what `true`
//! means in a [`MonochromeImage`].
//!
//! This is a pure function with no I/O -- it returns bytes.

use std::fmt::Write;

use graymap_pipeline::MonochromeImage;

/// Longest line the plain encoding emits, per the netpbm recommendation.
pub const MAX_PLAIN_LINE_LEN: usize = 70;

/// Which PBM encoding to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PbmEncoding {
    /// `P1` text.
    Plain,
    /// `P4` packed binary.
    #[default]
    Raw,
}

impl PbmEncoding {
    /// The magic number for this encoding.
    #[must_use]
    pub const fn magic(self) -> &'static str {
        match self {
            Self::Plain => "P1",
            Self::Raw => "P4",
        }
    }
}

/// Metadata to embed as `#` comment lines after the magic number.
///
/// Only the plain encoding carries comments. `P4` readers in the wild
/// handle header comments inconsistently, so the raw encoding omits
/// them.
#[derive(Debug, Clone, Default)]
pub struct PbmMetadata<'a> {
    /// Free text, one `# ` line per input line.
    pub comment: Option<&'a str>,
}

/// Serialize `image` as a PBM file.
///
/// # Examples
///
/// ```
/// use graymap_export::pbm::{PbmEncoding, PbmMetadata, to_pbm};
/// use graymap_pipeline::MonochromeImage;
///
/// let image = MonochromeImage::from_raw(3, 1, vec![true, false, true]).unwrap();
/// let pbm = to_pbm(&image, PbmEncoding::Plain, &PbmMetadata::default());
/// assert_eq!(pbm, b"P1\n3 1\n1 0 1\n");
///
/// let pbm = to_pbm(&image, PbmEncoding::Raw, &PbmMetadata::default());
/// assert_eq!(pbm, b"P4\n3 1\n\xa0");
/// ```
#[must_use]
pub fn to_pbm(
    image: &MonochromeImage,
    encoding: PbmEncoding,
    metadata: &PbmMetadata<'_>,
) -> Vec<u8> {
    match encoding {
        PbmEncoding::Plain => to_plain(image, metadata).into_bytes(),
        PbmEncoding::Raw => to_raw(image),
    }
}

fn to_plain(image: &MonochromeImage, metadata: &PbmMetadata<'_>) -> String {
    let mut out = String::new();

    // --- Header ---
    let _ = writeln!(out, "{}", PbmEncoding::Plain.magic());
    if let Some(comment) = metadata.comment {
        for line in comment.lines() {
            let _ = writeln!(out, "# {line}");
        }
    }
    let _ = writeln!(out, "{} {}", image.width(), image.height());

    // --- Rows ---
    // Each token takes two characters ("1 "), minus the final space.
    let per_line = MAX_PLAIN_LINE_LEN.div_ceil(2);
    for row in image.rows() {
        for chunk in row.chunks(per_line) {
            let line: Vec<&str> = chunk.iter().map(|&b| if b { "1" } else { "0" }).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
    }

    out
}

fn to_raw(image: &MonochromeImage) -> Vec<u8> {
    let header = format!(
        "{}\n{} {}\n",
        PbmEncoding::Raw.magic(),
        image.width(),
        image.height()
    );
    let row_bytes = (image.width() as usize).div_ceil(8);

    let mut out = Vec::with_capacity(header.len() + row_bytes * image.height() as usize);
    out.extend_from_slice(header.as_bytes());
    for row in image.rows() {
        out.extend(row.chunks(8).map(pack_bits));
    }
    out
}

/// Pack up to eight pixels into one byte, first pixel in the high bit.
fn pack_bits(pixels: &[bool]) -> u8 {
    pixels
        .iter()
        .enumerate()
        .fold(0, |byte, (i, &black)| byte | (u8::from(black) << (7 - i)))
}
