//! Pixel decoding for ASCII (`P2`) and binary (`P5`) graymaps.
//!
//! Both branches append rows to the grid top to bottom, left to right,
//! reading from the same [`BufRead`] cursor the header parser left
//! behind. Any failure abandons the grid.

use std::io::{BufRead, ErrorKind, Read};

use crate::header::{parse_header, read_line};
use crate::types::{DecodeError, Dimensions, FormatTag, GrayImage, RasterImage};

/// Decode a complete graymap (header and pixels) from `reader`.
///
/// # Errors
///
/// Returns any header error from [`parse_header`] and any pixel error
/// from [`decode_pixels`].
pub fn decode<R: BufRead>(reader: &mut R) -> Result<RasterImage, DecodeError> {
    let header = parse_header(reader)?;
    let pixels = decode_pixels(reader, header.format, header.dimensions)?;
    Ok(RasterImage::new(header.format, header.max_intensity, pixels))
}

/// Decode a complete graymap held in memory.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_bytes(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    decode(&mut &bytes[..])
}

/// Upper bound on the buffer reserved before any pixel is read.
///
/// The declared dimensions are untrusted, so the grid grows with the
/// data actually received beyond this.
const INITIAL_CAPACITY_LIMIT: usize = 1 << 20;

/// Decode the pixel rows that follow the header.
///
/// Trailing data after the last row is left unread.
///
/// # Errors
///
/// ASCII ([`FormatTag::Ascii`]):
/// - [`DecodeError::RowReadError`] if a row line cannot be read,
///   including end of stream before the last row's `\n`.
/// - [`DecodeError::TokenIndexOutOfRange`] if a row has more than
///   `width` values.
/// - [`DecodeError::PixelParseError`] if a value is not an integer in
///   `0..=255`.
///
/// Binary ([`FormatTag::Binary`]):
/// - [`DecodeError::UnexpectedEndOfStream`] if fewer than `width` bytes
///   remain for a row.
/// - [`DecodeError::Io`] if the reader fails.
///
/// Both: [`DecodeError::Io`] with [`ErrorKind::OutOfMemory`] if the
/// grid cannot be allocated.
pub fn decode_pixels<R: BufRead>(
    reader: &mut R,
    format: FormatTag,
    dimensions: Dimensions,
) -> Result<GrayImage, DecodeError> {
    let expected = usize::try_from(dimensions.pixel_count()).unwrap_or(usize::MAX);
    let mut pixels = Vec::with_capacity(expected.min(INITIAL_CAPACITY_LIMIT));

    for row in 0..dimensions.height {
        match format {
            FormatTag::Ascii => decode_ascii_row(reader, row, dimensions.width, &mut pixels)?,
            FormatTag::Binary => decode_binary_row(reader, row, dimensions.width, &mut pixels)?,
        }
    }

    GrayImage::from_raw(dimensions.width, dimensions.height, pixels)
        .ok_or_else(|| DecodeError::Io(ErrorKind::OutOfMemory.into()))
}

/// Parse one text line and append `width` values to `pixels`.
///
/// A line with fewer than `width` values is padded with zeros.
fn decode_ascii_row<R: BufRead>(
    reader: &mut R,
    row: u32,
    width: u32,
    pixels: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    let line = read_line(reader)
        .map_err(|e| DecodeError::RowReadError {
            row,
            reason: e.to_string(),
        })?
        .ok_or_else(|| DecodeError::RowReadError {
            row,
            reason: "unexpected end of stream".to_string(),
        })?;

    let mut tokens = line.split_whitespace();
    let mut column = 0;
    for token in tokens.by_ref().take(width as usize) {
        pixels.push(token.parse().map_err(|_| DecodeError::PixelParseError {
            row,
            column,
            token: token.to_string(),
        })?);
        column += 1;
    }

    if tokens.next().is_some() {
        return Err(DecodeError::TokenIndexOutOfRange {
            row,
            column: width,
            width,
        });
    }

    let missing = (width - column) as usize;
    pixels
        .try_reserve(missing)
        .map_err(|_| DecodeError::Io(ErrorKind::OutOfMemory.into()))?;
    pixels.resize(pixels.len() + missing, 0);
    Ok(())
}

/// Append exactly `width` raw bytes to `pixels`.
///
/// The buffer grows only as bytes arrive, so a header declaring more
/// data than the stream holds fails without reserving the difference.
fn decode_binary_row<R: BufRead>(
    reader: &mut R,
    row: u32,
    width: u32,
    pixels: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    let received = reader.by_ref().take(u64::from(width)).read_to_end(pixels)?;
    if received < width as usize {
        return Err(DecodeError::UnexpectedEndOfStream {
            row,
            expected: width,
            received: u32::try_from(received).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{self, Read};

    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // --- ASCII ---

    #[test]
    fn decodes_ascii_example() {
        let img = decode_bytes(b"P2\n2 2\n255\n10 20\n30 40\n").unwrap();
        assert_eq!(img.format(), FormatTag::Ascii);
        assert_eq!(img.max_intensity(), 255);
        assert_eq!(img.to_rows(), vec![vec![10, 20], vec![30, 40]]);
    }

    #[test]
    fn ascii_tolerates_irregular_spacing() {
        let img = decode_bytes(b"P2\n3 1\n255\n  0\t 7   255  \r\n").unwrap();
        assert_eq!(img.to_rows(), vec![vec![0, 7, 255]]);
    }

    #[test]
    fn ascii_short_row_is_zero_filled() {
        let img = decode_bytes(b"P2\n3 2\n255\n1\n4 5 6\n").unwrap();
        assert_eq!(img.to_rows(), vec![vec![1, 0, 0], vec![4, 5, 6]]);
    }

    #[test]
    fn ascii_unterminated_last_row_is_row_read_error() {
        let err = decode_bytes(b"P2\n2 1\n255\n9 8").unwrap_err();
        assert!(
            matches!(err, DecodeError::RowReadError { row: 0, ref reason } if reason.contains("end of stream")),
            "got {err:?}"
        );
    }

    #[test]
    fn ascii_missing_row_is_row_read_error() {
        let err = decode_bytes(b"P2\n3 2\n255\n1 2 3\n").unwrap_err();
        assert!(
            matches!(err, DecodeError::RowReadError { row: 1, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn ascii_no_rows_fails_on_row_zero() {
        let err = decode_bytes(b"P2\n1 1\n255\n").unwrap_err();
        assert!(matches!(err, DecodeError::RowReadError { row: 0, .. }));
    }

    #[test]
    fn ascii_extra_token_is_out_of_range() {
        let err = decode_bytes(b"P2\n2 2\n255\n1 2\n3 4 5\n").unwrap_err();
        assert!(
            matches!(
                err,
                DecodeError::TokenIndexOutOfRange {
                    row: 1,
                    column: 2,
                    width: 2
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn ascii_bad_token_reports_row_and_column() {
        let err = decode_bytes(b"P2\n3 2\n255\n1 2 3\n4 x 6\n").unwrap_err();
        assert!(
            matches!(
                err,
                DecodeError::PixelParseError { row: 1, column: 1, ref token } if token == "x"
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn ascii_rejects_values_outside_eight_bits() {
        for token in ["256", "-1", "1000"] {
            let input = format!("P2\n1 1\n255\n{token}\n");
            let err = decode_bytes(input.as_bytes()).unwrap_err();
            assert!(
                matches!(err, DecodeError::PixelParseError { row: 0, column: 0, .. }),
                "{token}: {err:?}"
            );
        }
    }

    #[test]
    fn ascii_values_above_max_are_kept() {
        let img = decode_bytes(b"P2\n2 1\n15\n200 16\n").unwrap();
        assert_eq!(img.to_rows(), vec![vec![200, 16]]);
    }

    #[test]
    fn ascii_first_error_wins() {
        // Both a bad token and a surplus token on the same row: the bad
        // token is seen first.
        let err = decode_bytes(b"P2\n2 1\n255\nx 1 2\n").unwrap_err();
        assert!(matches!(err, DecodeError::PixelParseError { column: 0, .. }));
    }

    // --- Binary ---

    #[test]
    fn decodes_binary_rows() {
        let img = decode_bytes(b"P5\n3 2\n255\n\x00\x0a\xff\x01\x02\x03").unwrap();
        assert_eq!(img.format(), FormatTag::Binary);
        assert_eq!(img.to_rows(), vec![vec![0, 10, 255], vec![1, 2, 3]]);
    }

    #[test]
    fn binary_short_row_reports_received_bytes() {
        let err = decode_bytes(b"P5\n4 1\n255\n\x01\x02").unwrap_err();
        assert!(
            matches!(
                err,
                DecodeError::UnexpectedEndOfStream {
                    row: 0,
                    expected: 4,
                    received: 2
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn binary_missing_row_reports_zero_received() {
        let err = decode_bytes(b"P5\n2 2\n255\n\x01\x02").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedEndOfStream {
                row: 1,
                expected: 2,
                received: 0
            }
        ));
    }

    #[test]
    fn binary_huge_dimensions_over_short_body_fail_cleanly() {
        let err = decode_bytes(b"P5\n4294967295 4294967295\n255\n\x01\x02").unwrap_err();
        assert!(
            matches!(
                err,
                DecodeError::UnexpectedEndOfStream {
                    row: 0,
                    expected: u32::MAX,
                    received: 2
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn ascii_huge_dimensions_over_empty_body_fail_cleanly() {
        let err = decode_bytes(b"P2\n4294967295 4294967295\n255\n").unwrap_err();
        assert!(matches!(err, DecodeError::RowReadError { row: 0, .. }));
    }

    #[test]
    fn binary_leaves_trailing_bytes_unread() {
        let input = b"P5\n1 1\n255\n\x07trailer";
        let mut reader = &input[..];
        let img = decode(&mut reader).unwrap();
        assert_eq!(img.to_rows(), vec![vec![7]]);
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "trailer");
    }

    #[test]
    fn decode_pixels_without_header() {
        let mut reader = &b"\x01\x02\x03\x04"[..];
        let grid = decode_pixels(&mut reader, FormatTag::Binary, dims(2, 2)).unwrap();
        assert_eq!(grid.as_raw(), &[1, 2, 3, 4]);
    }

    /// Reader that hands out one byte per `read` call and is interrupted
    /// before each one.
    struct Trickle<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let Some((&first, rest)) = self.data.split_first() else {
                return Ok(0);
            };
            if buf.is_empty() {
                return Ok(0);
            }
            buf[0] = first;
            self.data = rest;
            Ok(1)
        }
    }

    #[test]
    fn binary_row_survives_short_and_interrupted_reads() {
        let trickle = Trickle {
            data: b"\x05\x06\x07",
            interrupt: false,
        };
        // Capacity 1 forces a refill per byte.
        let mut reader = io::BufReader::with_capacity(1, trickle);
        let grid = decode_pixels(&mut reader, FormatTag::Binary, dims(3, 1)).unwrap();
        assert_eq!(grid.as_raw(), &[5, 6, 7]);
    }

    /// Reader that always fails.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    #[test]
    fn reader_failure_is_reported() {
        let mut reader = io::BufReader::new(Broken);
        let err = decode_pixels(&mut reader, FormatTag::Binary, dims(1, 1)).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));

        let mut reader = io::BufReader::new(Broken);
        let err = decode_pixels(&mut reader, FormatTag::Ascii, dims(1, 1)).unwrap_err();
        assert!(
            matches!(err, DecodeError::RowReadError { row: 0, ref reason } if reason.contains("unplugged"))
        );
    }
}
