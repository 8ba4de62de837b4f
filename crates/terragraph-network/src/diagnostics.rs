//! Pipeline diagnostics: timing and counts for each normalization stage.
//!
//! The crate never reads a clock itself. Callers pass a [`Clock`]
//! implementation, which keeps the library free of platform time and
//! makes timings deterministic in tests.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bounding_box::network_in_bounding_box;
use crate::duplicates::remove_duplicates_and_subsections;
use crate::leaf::prune;
use crate::nodes::nodes;
use crate::normalize::{NetworkSummary, NormalizeConfig, NormalizeResult};
use crate::segments::unique_segments;
use crate::types::{Network, NetworkError};
use crate::unify::unify;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that reports every stage as taking no time.
pub(crate) struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Edge and coordinate totals at a point in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkShape {
    /// Number of edges.
    pub edges: usize,
    /// Coordinates summed over all edges.
    pub coordinates: usize,
}

impl NetworkShape {
    #[must_use]
    pub fn of(network: &Network) -> Self {
        Self {
            edges: network.len(),
            coordinates: network.coordinate_count(),
        }
    }
}

/// Diagnostics collected from a single normalization run.
///
/// Stages disabled by the configuration are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeDiagnostics {
    /// Shape of the input network.
    pub input: NetworkShape,
    /// Stage 1: bounding-box clip.
    pub bounding_box: Option<StageDiagnostics>,
    /// Stage 2: coordinate unification.
    pub unify: Option<StageDiagnostics>,
    /// Stage 3: duplicate and subsection removal.
    pub dedupe: Option<StageDiagnostics>,
    /// Stage 4: segment splitting.
    pub segments: Option<StageDiagnostics>,
    /// Stage 5: leaf pruning.
    pub prune: Option<StageDiagnostics>,
    /// Computing the final summary.
    pub summarize: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Counts for the output network.
    pub summary: NetworkSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Network shape entering the stage.
    pub before: NetworkShape,
    /// Network shape leaving the stage.
    pub after: NetworkShape,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Bounding-box clip.
    BoundingBox {
        /// `[min_lng, min_lat, max_lng, max_lat]`.
        bbox: [f64; 4],
    },
    /// Coordinate unification.
    Unify {
        /// Snap radius in meters.
        tolerance_meters: f64,
        /// Distinct coordinates before snapping.
        nodes_before: usize,
        /// Distinct coordinates after snapping.
        nodes_after: usize,
    },
    /// Duplicate and subsection removal.
    Dedupe {
        /// Edges dropped.
        removed: usize,
    },
    /// Segment splitting.
    Segments,
    /// Leaf pruning.
    Prune {
        /// Requested rounds.
        depth: usize,
    },
    /// Final topology counts.
    Summarize,
}

/// Run [`normalize`](crate::normalize::normalize) while timing and
/// counting every stage.
///
/// # Errors
///
/// Same as [`normalize`](crate::normalize::normalize).
pub fn normalize_with_diagnostics<C: Clock>(
    network: &Network,
    config: &NormalizeConfig,
    clock: &C,
) -> Result<(NormalizeResult, NormalizeDiagnostics), NetworkError> {
    let start = clock.now();
    let input = NetworkShape::of(network);
    let mut current = network.clone();

    let bounding_box = match config.bounding_box {
        Some(bbox) => Some(run_stage(clock, &mut current, |n| {
            Ok((
                network_in_bounding_box(n, &bbox),
                StageMetrics::BoundingBox {
                    bbox: bbox.to_array(),
                },
            ))
        })?),
        None => None,
    };

    let unify_stage = match config.unify_tolerance_meters {
        Some(tolerance_meters) => Some(run_stage(clock, &mut current, |n| {
            let unified = unify(n, tolerance_meters)?;
            let metrics = StageMetrics::Unify {
                tolerance_meters,
                nodes_before: nodes(n).len(),
                nodes_after: nodes(&unified).len(),
            };
            Ok((unified, metrics))
        })?),
        None => None,
    };

    let dedupe = if config.remove_duplicates {
        Some(run_stage(clock, &mut current, |n| {
            let kept = remove_duplicates_and_subsections(n);
            let removed = n.len() - kept.len();
            Ok((kept, StageMetrics::Dedupe { removed }))
        })?)
    } else {
        None
    };

    let segments = if config.split_segments || config.prune_depth.is_some() {
        Some(run_stage(clock, &mut current, |n| {
            Ok((unique_segments(n), StageMetrics::Segments))
        })?)
    } else {
        None
    };

    let prune_stage = match config.prune_depth {
        Some(depth) => Some(run_stage(clock, &mut current, |n| {
            Ok((prune(n, depth), StageMetrics::Prune { depth }))
        })?),
        None => None,
    };

    let summarize_start = clock.now();
    let summary = NetworkSummary::of(&current);
    let shape = NetworkShape::of(&current);
    let summarize = StageDiagnostics {
        duration: clock.elapsed(&summarize_start),
        before: shape,
        after: shape,
        metrics: StageMetrics::Summarize,
    };

    let diagnostics = NormalizeDiagnostics {
        input,
        bounding_box,
        unify: unify_stage,
        dedupe,
        segments,
        prune: prune_stage,
        summarize,
        total_duration: clock.elapsed(&start),
        summary,
    };
    tracing::debug!(
        edges_in = input.edges,
        edges_out = shape.edges,
        components = summary.component_count,
        "normalized network"
    );

    Ok((
        NormalizeResult {
            network: current,
            summary,
        },
        diagnostics,
    ))
}

/// Time one stage and replace `current` with its output.
fn run_stage<C: Clock>(
    clock: &C,
    current: &mut Network,
    stage: impl FnOnce(&Network) -> Result<(Network, StageMetrics), NetworkError>,
) -> Result<StageDiagnostics, NetworkError> {
    let before = NetworkShape::of(current);
    let start = clock.now();
    let (output, metrics) = stage(current)?;
    let duration = clock.elapsed(&start);
    *current = output;
    Ok(StageDiagnostics {
        duration,
        before,
        after: NetworkShape::of(current),
        metrics,
    })
}

impl NormalizeDiagnostics {
    /// Stages that ran, in pipeline order, with display names.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        [
            ("Bounding Box", self.bounding_box.as_ref()),
            ("Unify", self.unify.as_ref()),
            ("Dedupe", self.dedupe.as_ref()),
            ("Segments", self.segments.as_ref()),
            ("Prune", self.prune.as_ref()),
            ("Summarize", Some(&self.summarize)),
        ]
        .into_iter()
        .filter_map(|(name, stage)| stage.map(|s| (name, s)))
        .collect()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Normalize Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} edges, {} coordinates",
            self.input.edges, self.input.coordinates,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>8} {:>14}  {}",
            "Stage", "Duration", "% Total", "Edges", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, stage) in self.stages() {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let edges = format!("{} -> {}", stage.before.edges, stage.after.edges);
            lines.push(format!(
                "{name:<16} {ms:>8.3}ms {pct:>7.1}% {edges:>14}  {}",
                format_metrics(&stage.metrics),
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Result: {} nodes, {} edges, {} components, {} leaf edges",
            self.summary.node_count,
            self.summary.edge_count,
            self.summary.component_count,
            self.summary.leaf_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::BoundingBox { bbox } => {
            format!("bbox=[{}, {}, {}, {}]", bbox[0], bbox[1], bbox[2], bbox[3])
        }
        StageMetrics::Unify {
            tolerance_meters,
            nodes_before,
            nodes_after,
        } => format!("tolerance={tolerance_meters}m nodes {nodes_before} -> {nodes_after}"),
        StageMetrics::Dedupe { removed } => format!("removed={removed}"),
        StageMetrics::Segments | StageMetrics::Summarize => String::new(),
        StageMetrics::Prune { depth } => format!("depth={depth}"),
    }
}
