//! Connected components of a network.
//!
//! Two edges are adjacent when they share any coordinate, not only an
//! endpoint. The adjacency graph has one node per edge and is traversed
//! with petgraph's iterative depth-first search, so very large
//! components cannot exhaust the call stack.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Dfs, VisitMap};

use crate::types::{Coordinate, Network};

/// Build the edge adjacency graph. Node `i` is edge `i` of the network.
fn adjacency(network: &Network) -> UnGraph<(), ()> {
    let mut graph = UnGraph::with_capacity(network.len(), network.len());
    for _ in network {
        graph.add_node(());
    }

    // Linking every edge to the first edge seen at a coordinate is enough
    // for reachability.
    let mut first_at: HashMap<Coordinate, usize> = HashMap::new();
    for (i, edge) in network.iter().enumerate() {
        for &coordinate in &edge.coordinates {
            match first_at.entry(coordinate) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(slot) => {
                    let j = *slot.get();
                    if j != i {
                        graph.update_edge(NodeIndex::new(j), NodeIndex::new(i), ());
                    }
                }
            }
        }
    }
    graph
}

/// Number of connected components.
///
/// Always equals `connected_components(network).len()`.
#[must_use]
pub fn connected_component_count(network: &Network) -> usize {
    petgraph::algo::connected_components(&adjacency(network))
}

/// Partition the network into connected sub-networks.
///
/// Edges keep their input order within each component. Components are
/// sorted by ascending edge count; components of equal size stay in the
/// order of their first edge.
#[must_use]
pub fn connected_components(network: &Network) -> Vec<Network> {
    let graph = adjacency(network);
    let edges = network.edges();

    let mut dfs = Dfs::empty(&graph);
    let mut components: Vec<Network> = Vec::new();

    for start in graph.node_indices() {
        if dfs.discovered.is_visited(&start) {
            continue;
        }
        dfs.move_to(start);
        let mut members = Vec::new();
        while let Some(node) = dfs.next(&graph) {
            members.push(node.index());
        }
        members.sort_unstable();
        components.push(members.into_iter().map(|i| edges[i].clone()).collect());
    }

    components.sort_by_key(Network::len);

    tracing::debug!(
        edges = network.len(),
        components = components.len(),
        "computed connected components"
    );
    components
}
