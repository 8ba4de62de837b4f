//! [`Graph`]: a held network with the analysis operations as methods.

use crate::bounding_box::{BoundingBox, network_in_bounding_box};
use crate::connected::{connected_component_count, connected_components};
use crate::duplicates::remove_duplicates_and_subsections;
use crate::geojson::NodeCollection;
use crate::leaf::{leaf_edges, prune};
use crate::measure::{longest_edge, route_length, shortest_edge};
use crate::nodes::{node_and_edge_count, node_degrees, nodes};
use crate::segments::unique_segments;
use crate::types::{Coordinate, Edge, Network, NetworkError, NodeAndEdgeCount};
use crate::unify::unify;

/// Owns the current network and answers questions about it.
///
/// Every query reads the held network and returns a fresh value; only
/// [`set_network`](Self::set_network) changes what is held.
///
/// ```
/// use terragraph_network::{Coordinate, Edge, Graph, Network};
///
/// let graph = Graph::new(Network::new(vec![
///     Edge::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]),
///     Edge::new(vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]),
/// ]));
/// assert_eq!(graph.connected_component_count(), 1);
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    network: Network,
}

impl Graph {
    /// Hold `network`.
    #[must_use]
    pub const fn new(network: Network) -> Self {
        Self { network }
    }

    /// The held network.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Replace the held network.
    pub fn set_network(&mut self, network: Network) {
        self.network = network;
    }

    /// Give up the held network.
    #[must_use]
    pub fn into_network(self) -> Network {
        self.network
    }

    /// Edges lying entirely inside `[min_lng, min_lat, max_lng, max_lat]`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidBoundingBox`] if a minimum is not
    /// below its maximum.
    pub fn network_in_bounding_box(&self, bbox: [f64; 4]) -> Result<Network, NetworkError> {
        let bbox = BoundingBox::try_from(bbox)?;
        Ok(network_in_bounding_box(&self.network, &bbox))
    }

    /// The network without duplicate or contained edges.
    #[must_use]
    pub fn without_duplicates_or_subsections(&self) -> Network {
        remove_duplicates_and_subsections(&self.network)
    }

    /// Connected sub-networks, smallest first.
    #[must_use]
    pub fn connected_components(&self) -> Vec<Network> {
        connected_components(&self.network)
    }

    /// Number of connected sub-networks.
    #[must_use]
    pub fn connected_component_count(&self) -> usize {
        connected_component_count(&self.network)
    }

    /// Distinct coordinates and unique segments, counted together.
    #[must_use]
    pub fn node_and_edge_count(&self) -> NodeAndEdgeCount {
        node_and_edge_count(&self.network)
    }

    /// Number of distinct coordinates.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_and_edge_count().node_count
    }

    /// Number of unique undirected segments.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.node_and_edge_count().edge_count
    }

    /// Distinct coordinates as point features.
    #[must_use]
    pub fn nodes(&self) -> NodeCollection {
        nodes(&self.network)
    }

    /// Each distinct coordinate with the number of unique segments
    /// touching it, in first-seen order.
    #[must_use]
    pub fn node_degrees(&self) -> Vec<(Coordinate, usize)> {
        node_degrees(&self.network)
    }

    /// Unique undirected segments.
    #[must_use]
    pub fn edges(&self) -> Network {
        unique_segments(&self.network)
    }

    /// Longest unique segment; the first one wins a tie. `None` for an
    /// empty network.
    #[must_use]
    pub fn longest_edge(&self) -> Option<Edge> {
        longest_edge(&self.network)
    }

    /// Shortest unique segment, with the same tie rule as
    /// [`longest_edge`](Self::longest_edge).
    #[must_use]
    pub fn shortest_edge(&self) -> Option<Edge> {
        shortest_edge(&self.network)
    }

    /// Length in kilometers of [`longest_edge`](Self::longest_edge).
    #[must_use]
    pub fn longest_edge_length(&self) -> Option<f64> {
        self.longest_edge().and_then(|edge| route_length(&edge).ok())
    }

    /// Length in kilometers of [`shortest_edge`](Self::shortest_edge).
    #[must_use]
    pub fn shortest_edge_length(&self) -> Option<f64> {
        self.shortest_edge().and_then(|edge| route_length(&edge).ok())
    }

    /// Great-circle length of any edge, in kilometers.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::MalformedGeometry`] for an edge with fewer
    /// than two coordinates.
    pub fn route_length(edge: &Edge) -> Result<f64, NetworkError> {
        route_length(edge)
    }

    /// Unique segments with an endpoint of degree 1.
    #[must_use]
    pub fn leaf_edges(&self) -> Network {
        leaf_edges(&self.network)
    }

    /// Unique segments left after `depth` rounds of leaf removal.
    ///
    /// `None` and `Some(0)` both prune a single round.
    #[must_use]
    pub fn pruned_edges(&self, depth: Option<usize>) -> Network {
        prune(&self.network, depth.unwrap_or(1).max(1))
    }

    /// The network with coordinates within `tolerance_meters` snapped
    /// together.
    ///
    /// # Errors
    ///
    /// See [`unify`].
    pub fn unified_network(&self, tolerance_meters: f64) -> Result<Network, NetworkError> {
        unify(&self.network, tolerance_meters)
    }
}

impl From<Network> for Graph {
    fn from(network: Network) -> Self {
        Self::new(network)
    }
}
