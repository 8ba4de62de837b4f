//! Decomposition of a network into unique undirected two-point segments.

use std::collections::HashSet;

use crate::types::{Coordinate, Edge, Network};

/// Direction-independent identity of the segment between `a` and `b`.
///
/// The endpoints are ordered lexicographically on `(lng, lat)`, so
/// `segment_key(a, b) == segment_key(b, a)`.
#[must_use]
pub fn segment_key(a: Coordinate, b: Coordinate) -> (Coordinate, Coordinate) {
    if b < a { (b, a) } else { (a, b) }
}

/// Split every edge into its consecutive coordinate pairs, dropping
/// any pair already produced in either direction.
///
/// Surviving segments keep the direction in which they were first
/// encountered and appear in scan order. Each segment is a new edge
/// with empty properties; single-coordinate edges contribute nothing.
#[must_use]
pub fn unique_segments(network: &Network) -> Network {
    let mut seen = HashSet::new();
    let mut segments = Vec::new();

    for edge in network {
        for (a, b) in edge.segments() {
            if seen.insert(segment_key(a, b)) {
                segments.push(Edge::new(vec![a, b]));
            }
        }
    }

    tracing::debug!(
        edges = network.len(),
        segments = segments.len(),
        "decomposed network into unique segments"
    );
    Network::new(segments)
}
