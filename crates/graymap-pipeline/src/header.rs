//! Graymap header parsing.
//!
//! The header is exactly three text lines:
//!
//! ```text
//! P2 | P5
//! <width> <height>
//! <max intensity>
//! ```
//!
//! Each line is read up to and including its `\n` and trimmed before
//! parsing. After [`parse_header`] returns, the reader is positioned on
//! the first byte of pixel data, which is what lets the binary decoder
//! continue on the same cursor.

use std::io::{self, BufRead};

use crate::types::{DecodeError, Dimensions, FormatTag, Header};

/// Parse the three header lines from `reader`.
///
/// A missing or unterminated line is reported as the error for the
/// field that was expected on it.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidFormatTag`] if the first line is not
/// `P2` or `P5`.
/// Returns [`DecodeError::MalformedDimensions`] if the second line is not
/// exactly two positive decimal integers.
/// Returns [`DecodeError::MalformedMaxIntensity`] if the third line is
/// not a single non-negative decimal integer.
/// Returns [`DecodeError::Io`] if the reader fails.
pub fn parse_header<R: BufRead>(reader: &mut R) -> Result<Header, DecodeError> {
    let tag = read_line(reader)?.unwrap_or_default();
    let tag = tag.trim();
    let Some(format) = FormatTag::from_magic(tag) else {
        return Err(DecodeError::InvalidFormatTag {
            found: tag.to_string(),
        });
    };

    let dimensions = parse_dimensions(read_line(reader)?.unwrap_or_default().trim())?;
    let max_intensity = parse_max_intensity(read_line(reader)?.unwrap_or_default().trim())?;

    Ok(Header {
        format,
        dimensions,
        max_intensity,
    })
}

/// Read one line including its terminator.
///
/// Returns `None` if the stream ends before a `\n`, so a final line
/// without a terminator counts as missing. Bytes that are not valid UTF-8
/// are replaced rather than rejected, so they surface later as parse
/// errors with position information.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    if buf.last() != Some(&b'\n') {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

fn parse_dimensions(line: &str) -> Result<Dimensions, DecodeError> {
    let malformed = |reason: &str| DecodeError::MalformedDimensions {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = line.split_whitespace();
    let (Some(width), Some(height), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed("expected \"<width> <height>\""));
    };

    Ok(Dimensions {
        width: parse_axis(width).map_err(malformed)?,
        height: parse_axis(height).map_err(malformed)?,
    })
}

fn parse_axis(token: &str) -> Result<u32, &'static str> {
    let value: i64 = token.parse().map_err(|_| "not a decimal integer")?;
    if value <= 0 {
        return Err("width and height must be positive");
    }
    u32::try_from(value).map_err(|_| "dimension too large")
}

fn parse_max_intensity(line: &str) -> Result<u32, DecodeError> {
    line.parse().map_err(|_| DecodeError::MalformedMaxIntensity {
        line: line.to_string(),
    })
}
