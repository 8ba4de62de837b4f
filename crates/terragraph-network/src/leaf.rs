//! Leaf segment classification and iterative pruning.
//!
//! Works on the unique segment set of a network (see
//! [`unique_segments`]). A node's degree is the number of segment
//! endpoints at that coordinate; a segment with an endpoint of degree 1
//! is a *leaf*, any other segment is *internal*.
//!
//! Pruning repeatedly discards the leaves and reclassifies what is left.
//! Each round can only shrink the segment set, and once no leaves remain
//! (the 2-core) further rounds change nothing.

use std::collections::HashMap;

use crate::segments::unique_segments;
use crate::types::{Coordinate, Network};

/// The unique segments of a network split into leaves and internals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafClassification {
    /// Segments with an endpoint of degree 1.
    pub leaves: Network,
    /// All other segments.
    pub internal: Network,
}

/// Classify the unique segments of `network`.
#[must_use]
pub fn classify_leaves(network: &Network) -> LeafClassification {
    classify_segments(unique_segments(network))
}

/// The leaf segments of `network`.
#[must_use]
pub fn leaf_edges(network: &Network) -> Network {
    classify_leaves(network).leaves
}

/// Remove leaf segments `depth` times, reclassifying after each round.
///
/// `depth == 0` returns the unique segments unchanged.
#[must_use]
pub fn prune(network: &Network, depth: usize) -> Network {
    let mut segments = unique_segments(network);
    for round in 0..depth {
        let LeafClassification { leaves, internal } = classify_segments(segments);
        segments = internal;
        if leaves.is_empty() {
            tracing::debug!(round, segments = segments.len(), "pruning reached a fixed point");
            break;
        }
    }
    segments
}

/// Endpoint counts over a set of two-point segments.
pub(crate) fn segment_degrees(segments: &Network) -> HashMap<Coordinate, usize> {
    let mut degrees = HashMap::new();
    for segment in segments {
        if let (Some(&start), Some(&end)) = (segment.coordinates.first(), segment.coordinates.last())
            && segment.len() >= 2
        {
            *degrees.entry(start).or_insert(0) += 1;
            *degrees.entry(end).or_insert(0) += 1;
        }
    }
    degrees
}

fn classify_segments(segments: Network) -> LeafClassification {
    let degrees = segment_degrees(&segments);
    let is_leaf = |c: &Coordinate| degrees.get(c).copied() == Some(1);

    let mut classification = LeafClassification::default();
    for segment in segments {
        let leaf = segment.coordinates.first().is_some_and(is_leaf)
            || segment.coordinates.last().is_some_and(is_leaf);
        if leaf {
            classification.leaves.push(segment);
        } else {
            classification.internal.push(segment);
        }
    }
    classification
}
