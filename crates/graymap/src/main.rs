//! graymap: convert an 8-bit graymap into a monochrome bitmap.
//!
//! Reads a `P2` or `P5` file, inverts and mirrors it (both on by
//! default), thresholds it, and writes a PBM next to the input or to
//! `--output`.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin graymap -- [OPTIONS] <INPUT>
//! ```
//!
//! Status and errors are logged through `env_logger`; set `RUST_LOG` to
//! override the level chosen by `--verbose`.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use graymap_export::{PbmEncoding, PbmMetadata};
use graymap_pipeline::{Clock, PipelineConfig, PipelineError, Threshold};

/// Convert an 8-bit graymap (PGM) into a monochrome bitmap (PBM).
///
/// The pixel grid is inverted and mirrored left-to-right before
/// thresholding unless told otherwise.
#[derive(Parser)]
#[command(name = "graymap", version)]
struct Cli {
    /// Path to the input graymap (`P2` or `P5`).
    input: PathBuf,

    /// Where to write the bitmap. Defaults to the input path with a
    /// `.pbm` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write plain `P1` text instead of raw `P4`.
    #[arg(long)]
    plain: bool,

    /// Skip intensity inversion.
    #[arg(long)]
    no_invert: bool,

    /// Skip the horizontal flip.
    #[arg(long)]
    no_flip: bool,

    /// Fixed threshold (0-255). Intensities below it become black.
    /// Defaults to half the declared maximum intensity.
    #[arg(long)]
    threshold: Option<u8>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, `--no-invert`, `--no-flip` and `--threshold` are
    /// ignored. The JSON must be a valid `PipelineConfig` serialization;
    /// missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the per-stage diagnostics report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics (and errors) as JSON. Implies `--diagnostics`.
    #[arg(long)]
    json: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual transform flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        invert: !cli.no_invert,
        flip: !cli.no_flip,
        threshold: cli.threshold.map_or(Threshold::Midpoint, Threshold::Fixed),
    })
}

/// The PBM destination: `--output` if given, else the input with its
/// extension replaced by `pbm`.
fn output_path(cli: &Cli) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pbm"))
}

const fn encoding(cli: &Cli) -> PbmEncoding {
    if cli.plain {
        PbmEncoding::Plain
    } else {
        PbmEncoding::Raw
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            log::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let output = output_path(cli);
    if output == cli.input {
        return Err(format!(
            "Refusing to overwrite input {}; pass --output",
            cli.input.display()
        ));
    }

    let bytes = std::fs::read(&cli.input)
        .map_err(|e| format!("Error reading {}: {e}", cli.input.display()))?;
    log::info!("Input: {} ({} bytes)", cli.input.display(), bytes.len());
    log::debug!("Config: {config:?}");

    let (result, diagnostics) =
        match graymap_pipeline::process_with_diagnostics(&bytes, &config, &StdClock) {
            Ok(ok) => ok,
            Err(e) => {
                if cli.json {
                    print_error_json(&e);
                }
                return Err(format!("Pipeline error: {e}"));
            }
        };

    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else if cli.diagnostics {
        println!("{}", diagnostics.report());
    }

    let comment = source_comment(&cli.input, &config);
    let metadata = PbmMetadata {
        comment: Some(&comment),
    };
    let pbm = graymap_export::to_pbm(&result.monochrome, encoding(cli), &metadata);
    std::fs::write(&output, &pbm)
        .map_err(|e| format!("Error writing {}: {e}", output.display()))?;

    log::info!(
        "Wrote {} ({}x{}, {} bytes)",
        output.display(),
        result.monochrome.width(),
        result.monochrome.height(),
        pbm.len(),
    );
    Ok(())
}

/// Comment embedded in plain PBM output.
fn source_comment(input: &Path, config: &PipelineConfig) -> String {
    let name = input
        .file_name()
        .map_or_else(|| input.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!(
        "source: {name}\ninvert={} flip={} threshold={:?}",
        config.invert, config.flip, config.threshold
    )
}

fn print_error_json(error: &PipelineError) {
    match serde_json::to_string_pretty(error) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Error serializing pipeline error: {e}"),
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
