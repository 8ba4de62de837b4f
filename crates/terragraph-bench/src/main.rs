//! terragraph-bench: CLI tool for network cleaning experiments and diagnostics.
//!
//! Reads a GeoJSON `FeatureCollection` of `LineString` features, runs the
//! normalization pipeline with configurable stages, and prints per-stage
//! diagnostics. Useful for:
//!
//! - Choosing a unify tolerance that connects a network without
//!   collapsing real streets
//! - Seeing how many edges duplicate removal and pruning discard
//! - Measuring per-stage durations on large extracts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin terragraph-bench -- [OPTIONS] <GEOJSON_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use terragraph_network::diagnostics::{Clock, NormalizeDiagnostics};
use terragraph_network::{BoundingBox, Graph, Network, NormalizeConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Network cleaning experiments and diagnostics for terragraph.
///
/// Runs the normalization pipeline on a GeoJSON line network and prints
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "terragraph-bench", version)]
struct Cli {
    /// Path to the input GeoJSON FeatureCollection.
    geojson_path: PathBuf,

    /// Keep only edges inside `minLng,minLat,maxLng,maxLat`.
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    /// Snap coordinates closer than this many meters.
    #[arg(long)]
    tolerance: Option<f64>,

    /// Keep duplicate and subsection edges.
    #[arg(long)]
    no_dedupe: bool,

    /// Split edges into unique two-point segments.
    #[arg(long)]
    split_segments: bool,

    /// Rounds of leaf-segment pruning.
    #[arg(long)]
    prune_depth: Option<usize>,

    /// Full normalize config as a JSON string.
    ///
    /// When provided, all other stage flags are ignored. The JSON must be
    /// a valid `NormalizeConfig` serialization; missing fields take their
    /// defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of the human-readable report.
    #[arg(long)]
    json: bool,

    /// Write GeoJSON of the normalized network to file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// What to write with `--output`.
    #[arg(long, value_enum, default_value_t = Select::Network)]
    select: Select,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Overrides `RUST_LOG`.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Which view of the normalized network `--output` receives.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Select {
    /// The normalized network itself.
    Network,
    /// Its unique two-point segments.
    Segments,
    /// Segments with a dangling endpoint.
    Leaves,
    /// Distinct coordinates as point features.
    Nodes,
    /// The connected component with the most edges.
    LargestComponent,
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number {part:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let [min_lng, min_lat, max_lng, max_lat] = *values.as_slice() else {
        return Err(format!("expected 4 comma-separated values, got {}", values.len()));
    };
    BoundingBox::new(min_lng, min_lat, max_lng, max_lat).map_err(|e| e.to_string())
}

/// Build a [`NormalizeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual stage flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<NormalizeConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(NormalizeConfig {
        bounding_box: cli.bbox,
        unify_tolerance_meters: cli.tolerance,
        remove_duplicates: !cli.no_dedupe,
        split_segments: cli.split_segments,
        prune_depth: cli.prune_depth,
    })
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn select_geojson(select: Select, network: Network) -> serde_json::Result<String> {
    let graph = Graph::new(network);
    match select {
        Select::Network => serde_json::to_string(graph.network()),
        Select::Segments => serde_json::to_string(&graph.edges()),
        Select::Leaves => serde_json::to_string(&graph.leaf_edges()),
        Select::Nodes => serde_json::to_string(&graph.nodes()),
        Select::LargestComponent => {
            // Components come back smallest first.
            let largest = graph.connected_components().pop().unwrap_or_default();
            serde_json::to_string(&largest)
        }
    }
}

/// Serialize the selected output and write it to `path`, returning the
/// number of bytes written.
fn write_geojson(path: &Path, select: Select, network: Network) -> Result<usize, String> {
    let geojson = select_geojson(select, network).map_err(|e| {
        tracing::error!(error = %e, "GeoJSON serialization failed");
        format!("Error serializing GeoJSON: {e}")
    })?;
    std::fs::write(path, &geojson).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "GeoJSON write failed");
        format!("Error writing GeoJSON to {}: {e}", path.display())
    })?;
    tracing::info!(path = %path.display(), bytes = geojson.len(), ?select, "wrote GeoJSON");
    Ok(geojson.len())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let text = match std::fs::read_to_string(&cli.geojson_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.geojson_path.display());
            return ExitCode::FAILURE;
        }
    };

    let network: Network = match serde_json::from_str(&text) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.geojson_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Network: {} ({} edges, {} coordinates)",
        cli.geojson_path.display(),
        network.len(),
        network.coordinate_count(),
    );
    tracing::debug!(
        edges = network.len(),
        coordinates = network.coordinate_count(),
        "parsed input network"
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match terragraph_network::normalize_with_diagnostics(&network, &config, &StdClock) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write GeoJSON on the first run only.
                if run == 0
                    && let Some(ref output) = cli.output
                {
                    match write_geojson(output, cli.select, result.network) {
                        Ok(bytes) => {
                            eprintln!("GeoJSON written to {} ({bytes} bytes)", output.display());
                        }
                        Err(msg) => {
                            eprintln!("{msg}");
                            return ExitCode::FAILURE;
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Normalize error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
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

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&NormalizeDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[NormalizeDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Bounding Box", |d| d.bounding_box.as_ref().map(|s| s.duration)),
        ("Unify", |d| d.unify.as_ref().map(|s| s.duration)),
        ("Dedupe", |d| d.dedupe.as_ref().map(|s| s.duration)),
        ("Segments", |d| d.segments.as_ref().map(|s| s.duration)),
        ("Prune", |d| d.prune.as_ref().map(|s| s.duration)),
        ("Summarize", |d| Some(d.summarize.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
