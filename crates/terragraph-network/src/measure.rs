//! Great-circle lengths of edges.

use crate::segments::unique_segments;
use crate::types::{Edge, Network, NetworkError};

/// Sum of great-circle distances between consecutive coordinates, in
/// kilometers.
///
/// # Errors
///
/// Returns [`NetworkError::MalformedGeometry`] if the edge has fewer than
/// two coordinates.
pub fn route_length(edge: &Edge) -> Result<f64, NetworkError> {
    if edge.len() < 2 {
        return Err(NetworkError::MalformedGeometry {
            found: edge.len(),
            required: 2,
        });
    }
    Ok(edge.segments().map(|(a, b)| a.distance_km(b)).sum())
}

/// The longest unique segment, or `None` for a network without segments.
///
/// Ties resolve to the segment encountered first.
#[must_use]
pub fn longest_edge(network: &Network) -> Option<Edge> {
    extreme_segment(network, |candidate, best| candidate > best)
}

/// The shortest unique segment, or `None` for a network without segments.
///
/// Ties resolve to the segment encountered first.
#[must_use]
pub fn shortest_edge(network: &Network) -> Option<Edge> {
    extreme_segment(network, |candidate, best| candidate < best)
}

fn extreme_segment(network: &Network, better: impl Fn(f64, f64) -> bool) -> Option<Edge> {
    let mut best: Option<(f64, Edge)> = None;
    for segment in unique_segments(network) {
        // Unique segments always have two coordinates.
        let Ok(length) = route_length(&segment) else {
            continue;
        };
        if best.as_ref().is_none_or(|(best_length, _)| better(length, *best_length)) {
            best = Some((length, segment));
        }
    }
    best.map(|(_, segment)| segment)
}
