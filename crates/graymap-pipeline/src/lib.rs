//! graymap-pipeline: Pure graymap processing pipeline (sans-IO).
//!
//! Turns an 8-bit graymap (`P2` text or `P5` binary) into a monochrome
//! bitmap through:
//! header parsing -> pixel decoding -> invert -> horizontal flip ->
//! threshold.
//!
//! This crate has **no I/O dependencies** -- it reads from in-memory
//! byte slices or any caller-supplied [`std::io::BufRead`] and returns
//! structured data. It never logs; every failure is returned to the
//! caller as a [`DecodeError`] or [`PipelineError`]. Serializing the
//! results lives in `graymap-export`.

pub mod decode;
pub mod diagnostics;
pub mod header;
pub mod threshold;
pub mod transform;
pub mod types;

pub use decode::{decode, decode_bytes, decode_pixels};
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use header::parse_header;
pub use threshold::{Threshold, to_monochrome};
pub use types::{
    DecodeError, Dimensions, FormatTag, GrayImage, Header, MonochromeImage, PipelineConfig,
    PipelineError, ProcessResult, RasterImage,
};

/// Run the full pipeline.
///
/// # Pipeline steps
///
/// 1. Parse the header and decode the pixel rows
/// 2. Optional intensity inversion
/// 3. Optional horizontal flip
/// 4. Threshold into a monochrome bitmap
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::Decode`] if the header or pixel data is
/// malformed.
pub fn process(bytes: &[u8], config: &PipelineConfig) -> Result<ProcessResult, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // 1. Decode.
    let mut raster = decode_bytes(bytes)?;

    // 2. Optional inversion.
    if config.invert {
        raster.invert();
    }

    // 3. Optional flip.
    if config.flip {
        raster.flip_horizontal();
    }

    // 4. Threshold.
    let monochrome = to_monochrome(&raster, config.threshold);

    Ok(ProcessResult { raster, monochrome })
}
