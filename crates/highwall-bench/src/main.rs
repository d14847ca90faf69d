//! highwall-bench: CLI tool for running the centerline engine over a
//! batch of skeletons.
//!
//! Loads skeletons from a JSON file, reduces and segments them with
//! configurable parameters, and prints the resulting segments or
//! per-polygon stage diagnostics. Useful for:
//!
//! - Comparing reduction strategies (`junction-split` vs `spine-extraction`)
//! - Tuning spur, branch, and segment length thresholds
//! - Finding the polygons a parameter change breaks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin highwall-bench -- [OPTIONS] <SKELETONS_JSON>
//! ```
//!
//! The input is a JSON array of skeletons:
//!
//! ```text
//! [{"id": 17, "polylines": [[{"x": 0.0, "y": 0.0}, {"x": 40.0, "y": 0.0}]]}]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use highwall_centerline::diagnostics::Clock;
use highwall_centerline::{
    BatchOutput, CenterlineConfig, ReductionStrategy, Skeleton, process_batch,
    process_batch_with_diagnostics,
};

/// Centerline reduction and segmentation for highwall skeletons.
///
/// Runs every skeleton in the input through the engine and reports the
/// segments produced, plus any polygons that had to be skipped.
#[derive(Parser)]
#[command(name = "highwall-bench", version)]
struct Cli {
    /// Path to a JSON array of skeletons.
    skeletons_path: PathBuf,

    /// Dead-end spurs shorter than this are pruned.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_MIN_SPUR_LENGTH)]
    min_spur_length: f64,

    /// Number of spur pruning passes (0 disables pruning).
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_SPUR_PASSES)]
    spur_passes: u32,

    /// Branches shorter than this are discarded after junction splitting.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_MIN_BRANCH_LENGTH)]
    min_branch_length: f64,

    /// Spines shorter than this stop spine extraction.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_MIN_SPINE_LENGTH)]
    min_spine_length: f64,

    /// Graph reduction strategy.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_STRATEGY)]
    strategy: Strategy,

    /// Preferred segment length.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_TARGET_SEGMENT_LENGTH)]
    target_segment_length: f64,

    /// Polylines no longer than this are emitted unsplit.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_MAX_SEGMENT_LENGTH)]
    max_segment_length: f64,

    /// Shortest acceptable trailing segment.
    #[arg(long, default_value_t = CenterlineConfig::DEFAULT_MIN_SEGMENT_LENGTH)]
    min_segment_length: f64,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. The JSON must
    /// be a valid `CenterlineConfig` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print segments as JSON records instead of a summary.
    #[arg(long)]
    json: bool,

    /// Print a per-stage diagnostics table for every polygon.
    #[arg(long)]
    report: bool,

    /// Write segments as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Reduction strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Split the pruned graph at every junction.
    JunctionSplit,
    /// Extract dominant spines before splitting.
    SpineExtraction,
}

/// Maps a [`ReductionStrategy`] to the local CLI [`Strategy`] enum.
const fn strategy_from_engine(s: ReductionStrategy) -> Strategy {
    match s {
        ReductionStrategy::JunctionSplit => Strategy::JunctionSplit,
        ReductionStrategy::SpineExtraction => Strategy::SpineExtraction,
    }
}

/// The CLI default strategy, derived from
/// [`CenterlineConfig::DEFAULT_REDUCTION`] so the two cannot drift apart.
const CLI_DEFAULT_STRATEGY: Strategy = strategy_from_engine(CenterlineConfig::DEFAULT_REDUCTION);

/// Build a [`CenterlineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored. Either way the result is
/// validated before any skeleton is touched.
fn config_from_cli(cli: &Cli) -> Result<CenterlineConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        CenterlineConfig {
            min_spur_length: cli.min_spur_length,
            spur_passes: cli.spur_passes,
            min_branch_length: cli.min_branch_length,
            min_spine_length: cli.min_spine_length,
            reduction: match cli.strategy {
                Strategy::JunctionSplit => ReductionStrategy::JunctionSplit,
                Strategy::SpineExtraction => ReductionStrategy::SpineExtraction,
            },
            target_segment_length: cli.target_segment_length,
            max_segment_length: cli.max_segment_length,
            min_segment_length: cli.min_segment_length,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Read and parse the skeleton file.
fn load_skeletons(path: &Path) -> Result<Vec<Skeleton>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let skeletons = match load_skeletons(&cli.skeletons_path) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Skeletons: {} ({} polygons)",
        cli.skeletons_path.display(),
        skeletons.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let start = Instant::now();
    let result = if cli.report {
        process_batch_with_diagnostics(skeletons, &config, &StdClock)
    } else {
        process_batch(skeletons, &config)
    };
    let elapsed = start.elapsed();

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Engine error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.report {
        for diagnostics in &output.diagnostics {
            println!("{}", diagnostics.report());
            println!();
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&output.segments) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing segments: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&output, elapsed);
    }

    if let Some(ref path) = cli.output {
        let json = match serde_json::to_string_pretty(&output.segments) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error serializing segments: {e}");
                return ExitCode::FAILURE;
            }
        };
        match std::fs::write(path, &json) {
            Ok(()) => {
                eprintln!(
                    "Segments written to {} ({} bytes)",
                    path.display(),
                    json.len(),
                );
            }
            Err(e) => {
                eprintln!("Error writing segments to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    for failure in &output.failures {
        eprintln!("Skipped polygon {}: {}", failure.id, failure.reason);
    }

    ExitCode::SUCCESS
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

/// Print batch totals and the segment length spread.
fn print_summary(output: &BatchOutput, elapsed: Duration) {
    println!("Batch Summary\n{}", "=".repeat(60));
    println!(
        "Polygons: {} succeeded, {} skipped",
        output.polygons_succeeded,
        output.failures.len(),
    );

    let lengths: Vec<f64> = output.segments.iter().map(|s| s.length).collect();
    let total: f64 = lengths.iter().sum();
    let min = lengths.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = lengths.iter().copied().reduce(f64::max).unwrap_or(0.0);
    println!(
        "Segments: {}  total={total:.1}  min={min:.1}  max={max:.1}",
        lengths.len(),
    );
    println!("Duration: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
}
