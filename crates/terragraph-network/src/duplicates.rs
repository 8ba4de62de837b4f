//! Removal of duplicated and overlapping line features.
//!
//! An edge is dropped when its whole coordinate run appears, forward or
//! reversed, as a contiguous run inside another edge that outranks it.
//! Longer edges outrank shorter ones; among equal lengths the earlier
//! edge wins. Coordinates are compared exactly.
//!
//! Every pair of edges is compared, so cost grows with
//! `edges² × coordinates`. This is an offline cleaning pass.

use crate::types::{Coordinate, Network};

/// Returns the network without exact duplicates or contained
/// subsections, preserving the order and properties of the survivors.
#[must_use]
pub fn remove_duplicates_and_subsections(network: &Network) -> Network {
    let edges = network.edges();

    let kept: Network = edges
        .iter()
        .enumerate()
        .filter(|&(i, edge)| {
            !edges.iter().enumerate().any(|(j, other)| {
                j != i
                    && outranks(j, other.len(), i, edge.len())
                    && contains_run(&other.coordinates, &edge.coordinates)
            })
        })
        .map(|(_, edge)| edge.clone())
        .collect();

    tracing::debug!(
        before = network.len(),
        after = kept.len(),
        "removed duplicate and subsection edges"
    );
    kept
}

/// Whether edge `j` takes precedence over edge `i` when one contains the other.
const fn outranks(j: usize, len_j: usize, i: usize, len_i: usize) -> bool {
    len_j > len_i || (len_j == len_i && j < i)
}

/// Whether `needle` occurs contiguously in `haystack`, in either direction.
fn contains_run(haystack: &[Coordinate], needle: &[Coordinate]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| {
        window == needle || window.iter().eq(needle.iter().rev())
    })
}
