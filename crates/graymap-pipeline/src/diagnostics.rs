//! Pipeline diagnostics: timing and counts for each stage.
//!
//! [`process_with_diagnostics`] runs the same stages as
//! [`process`](crate::process) and records how long each took together
//! with a few stage-specific metrics.
//!
//! The crate has no time source of its own. Callers pass a [`Clock`],
//! so the core stays free of platform-specific timing.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::threshold::{Threshold, to_monochrome};
use crate::types::{FormatTag, PipelineConfig, PipelineError, ProcessResult};

/// Source of timestamps for stage measurements.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stages that are switched off in the config (invert, flip) are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: header parsing and pixel decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: intensity inversion (only when `config.invert == true`).
    pub invert: Option<StageDiagnostics>,
    /// Stage 2: horizontal flip (only when `config.flip == true`).
    pub flip: Option<StageDiagnostics>,
    /// Stage 3: monochrome thresholding.
    pub threshold: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Decoding metrics.
    Decode {
        /// Size of the input in bytes.
        input_bytes: usize,
        /// Encoding named by the header.
        format: FormatTag,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Declared maximum intensity.
        max_intensity: u32,
    },
    /// Inversion metrics.
    Invert {
        /// Maximum the pixels were subtracted from (low byte).
        max_intensity: u8,
        /// Pixels above the maximum, which wrapped around.
        wrapped_pixel_count: u64,
    },
    /// Flip metrics.
    Flip {
        /// Rows mirrored.
        rows: u32,
    },
    /// Thresholding metrics.
    Threshold {
        /// Rule in effect.
        rule: Threshold,
        /// Resolved cut value.
        cut: u8,
        /// Pixels that became black.
        black_pixel_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Black pixels in the final bitmap.
    pub black_pixel_count: u64,
}

/// Run the pipeline while timing every stage.
///
/// Produces exactly the same [`ProcessResult`] as
/// [`process`](crate::process) for the same inputs.
///
/// # Errors
///
/// See [`process`](crate::process).
pub fn process_with_diagnostics<C: Clock>(
    bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // 0. Decode.
    let t = clock.now();
    let mut raster = crate::decode::decode_bytes(bytes)?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: bytes.len(),
            format: raster.format(),
            width: raster.width(),
            height: raster.height(),
            max_intensity: raster.max_intensity(),
        },
    };

    // 1. Invert.
    let invert = config.invert.then(|| {
        let wrapped_pixel_count = raster.count_above_max();
        let t = clock.now();
        raster.invert();
        StageDiagnostics {
            duration: clock.elapsed(&t),
            metrics: StageMetrics::Invert {
                max_intensity: raster.max_intensity_u8(),
                wrapped_pixel_count,
            },
        }
    });

    // 2. Flip.
    let flip = config.flip.then(|| {
        let t = clock.now();
        raster.flip_horizontal();
        StageDiagnostics {
            duration: clock.elapsed(&t),
            metrics: StageMetrics::Flip {
                rows: raster.height(),
            },
        }
    });

    // 3. Threshold.
    let t = clock.now();
    let monochrome = to_monochrome(&raster, config.threshold);
    let black_pixel_count = monochrome.black_count();
    let pixel_count = raster.dimensions().pixel_count();
    let threshold = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Threshold {
            rule: config.threshold,
            cut: config.threshold.cut(&raster),
            black_pixel_count,
            total_pixel_count: pixel_count,
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        invert,
        flip,
        threshold,
        total_duration: clock.elapsed(&start),
        summary: PipelineSummary {
            image_width: raster.width(),
            image_height: raster.height(),
            pixel_count,
            black_pixel_count,
        },
    };

    Ok((ProcessResult { raster, monochrome }, diagnostics))
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![("Decode", &self.decode)];
        if let Some(ref inv) = self.invert {
            stages.push(("Invert", inv));
        }
        if let Some(ref flip) = self.flip {
            stages.push(("Flip", flip));
        }
        stages.push(("Threshold", &self.threshold));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Black pixels: {} of {}",
            self.summary.black_pixel_count, self.summary.pixel_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            format,
            width,
            height,
            max_intensity,
        } => format!("{format} {input_bytes} bytes -> {width}x{height} max={max_intensity}"),
        StageMetrics::Invert {
            max_intensity,
            wrapped_pixel_count,
        } => format!("max={max_intensity} wrapped={wrapped_pixel_count}"),
        StageMetrics::Flip { rows } => format!("{rows} rows"),
        StageMetrics::Threshold {
            rule,
            cut,
            black_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *black_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{rule:?} cut={cut} black={black_pixel_count} ({density:.1}%)")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::DecodeError;

    /// Clock that advances one millisecond per reading.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl TickClock {
        fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    const EXAMPLE: &[u8] = b"P2\n2 2\n255\n10 20\n30 40\n";

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn matches_plain_process() {
        let config = PipelineConfig::default();
        let (result, _) = process_with_diagnostics(EXAMPLE, &config, &TickClock::new()).unwrap();
        assert_eq!(result, crate::process(EXAMPLE, &config).unwrap());
    }

    #[test]
    fn skipped_stages_are_none() {
        let config = PipelineConfig {
            invert: false,
            flip: false,
            ..PipelineConfig::default()
        };
        let (_, diag) = process_with_diagnostics(EXAMPLE, &config, &TickClock::new()).unwrap();
        assert!(diag.invert.is_none());
        assert!(diag.flip.is_none());
    }

    #[test]
    fn records_stage_metrics() {
        let input = b"P5\n3 1\n100\n\x00\x32\xc8";
        let (_, diag) =
            process_with_diagnostics(input, &PipelineConfig::default(), &TickClock::new()).unwrap();

        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                input_bytes: 14,
                format: FormatTag::Binary,
                width: 3,
                height: 1,
                max_intensity: 100,
            }
        ));
        let invert = diag.invert.unwrap();
        assert!(matches!(
            invert.metrics,
            StageMetrics::Invert {
                max_intensity: 100,
                wrapped_pixel_count: 1,
            }
        ));
        assert!(matches!(
            diag.flip.unwrap().metrics,
            StageMetrics::Flip { rows: 1 }
        ));
        assert_eq!(diag.summary.pixel_count, 3);
        assert!(diag.total_duration >= invert.duration);
    }

    #[test]
    fn errors_propagate() {
        let err = process_with_diagnostics(b"P9\n", &PipelineConfig::default(), &TickClock::new())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decode(DecodeError::InvalidFormatTag { .. })
        ));

        let err =
            process_with_diagnostics(b"", &PipelineConfig::default(), &TickClock::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn report_lists_enabled_stages() {
        let (_, diag) =
            process_with_diagnostics(EXAMPLE, &PipelineConfig::default(), &TickClock::new())
                .unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Decode"));
        assert!(report.contains("Invert"));
        assert!(report.contains("Flip"));
        assert!(report.contains("Threshold"));
        assert!(report.contains("P2 23 bytes -> 2x2 max=255"));
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let (_, diag) =
            process_with_diagnostics(EXAMPLE, &PipelineConfig::default(), &TickClock::new())
                .unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_duration, diag.total_duration);
        assert_eq!(back.summary.black_pixel_count, diag.summary.black_pixel_count);
    }
}
