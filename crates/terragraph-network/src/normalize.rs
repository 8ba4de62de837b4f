//! The composed cleaning pipeline.
//!
//! Stages run in a fixed order, each enabled by [`NormalizeConfig`]:
//!
//! 1. clip to a bounding box
//! 2. unify nearby coordinates
//! 3. remove duplicate and subsection edges
//! 4. split into unique segments
//! 5. prune leaf segments
//!
//! Use [`crate::diagnostics::normalize_with_diagnostics`] to also collect
//! per-stage timings and counts.

use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::connected::connected_component_count;
use crate::diagnostics::{NoClock, normalize_with_diagnostics};
use crate::leaf::leaf_edges;
use crate::nodes::node_and_edge_count;
use crate::types::{Network, NetworkError};

/// Which pipeline stages run, and with what parameters.
///
/// Missing fields take their defaults when deserializing, so
/// `{"unify_tolerance_meters": 2.0}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Keep only edges entirely inside this window.
    pub bounding_box: Option<BoundingBox>,

    /// Snap coordinates closer than this many meters.
    pub unify_tolerance_meters: Option<f64>,

    /// Drop duplicate edges and edges contained in longer ones.
    pub remove_duplicates: bool,

    /// Replace edges with their unique two-point segments. Implied by
    /// `prune_depth`.
    pub split_segments: bool,

    /// Rounds of leaf-segment removal.
    pub prune_depth: Option<usize>,
}

impl NormalizeConfig {
    pub const DEFAULT_UNIFY_TOLERANCE_METERS: Option<f64> = None;
    pub const DEFAULT_REMOVE_DUPLICATES: bool = true;
    pub const DEFAULT_SPLIT_SEGMENTS: bool = false;
    pub const DEFAULT_PRUNE_DEPTH: Option<usize> = None;
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            bounding_box: None,
            unify_tolerance_meters: Self::DEFAULT_UNIFY_TOLERANCE_METERS,
            remove_duplicates: Self::DEFAULT_REMOVE_DUPLICATES,
            split_segments: Self::DEFAULT_SPLIT_SEGMENTS,
            prune_depth: Self::DEFAULT_PRUNE_DEPTH,
        }
    }
}

/// Topology counts of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Distinct coordinates.
    pub node_count: usize,
    /// Distinct undirected segments.
    pub edge_count: usize,
    /// Connected components.
    pub component_count: usize,
    /// Segments with an endpoint of degree 1.
    pub leaf_count: usize,
}

impl NetworkSummary {
    /// Count everything for `network`.
    #[must_use]
    pub fn of(network: &Network) -> Self {
        let counts = node_and_edge_count(network);
        Self {
            node_count: counts.node_count,
            edge_count: counts.edge_count,
            component_count: connected_component_count(network),
            leaf_count: leaf_edges(network).len(),
        }
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeResult {
    /// The cleaned network.
    pub network: Network,
    /// Counts for the cleaned network.
    pub summary: NetworkSummary,
}

/// Run the configured stages over `network`.
///
/// # Errors
///
/// Returns [`NetworkError::InvalidTolerance`] for a bad unify tolerance,
/// or [`NetworkError::Index`] if the unifier's index cannot be built.
pub fn normalize(network: &Network, config: &NormalizeConfig) -> Result<NormalizeResult, NetworkError> {
    normalize_with_diagnostics(network, config, &NoClock).map(|(result, _)| result)
}
