//! Node statistics.

use std::collections::HashSet;

use crate::geojson::NodeCollection;
use crate::leaf::segment_degrees;
use crate::segments::unique_segments;
use crate::types::{Coordinate, Network, NodeAndEdgeCount};

/// Distinct coordinates in first-seen order.
#[must_use]
pub fn nodes(network: &Network) -> NodeCollection {
    let mut seen = HashSet::new();
    NodeCollection(
        network
            .iter()
            .flat_map(|edge| edge.coordinates.iter().copied())
            .filter(|&c| seen.insert(c))
            .collect(),
    )
}

/// Degree of every node over the unique segment set, in first-seen order.
///
/// Coordinates that belong to no segment (single-coordinate edges) have
/// degree 0.
#[must_use]
pub fn node_degrees(network: &Network) -> Vec<(Coordinate, usize)> {
    let degrees = segment_degrees(&unique_segments(network));
    nodes(network)
        .0
        .into_iter()
        .map(|c| (c, degrees.get(&c).copied().unwrap_or(0)))
        .collect()
}

/// Count distinct coordinates and distinct undirected segments.
#[must_use]
pub fn node_and_edge_count(network: &Network) -> NodeAndEdgeCount {
    NodeAndEdgeCount {
        node_count: nodes(network).len(),
        edge_count: unique_segments(network).len(),
    }
}
