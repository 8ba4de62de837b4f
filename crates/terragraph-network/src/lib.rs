//! terragraph-network: Topology cleaning and analysis for line networks (sans-IO).
//!
//! A [`Network`] is an ordered list of polyline [`Edge`]s whose shared
//! coordinates are the graph's nodes. Networks are read from and written
//! to GeoJSON `FeatureCollection`s of `LineString` features via serde.
//!
//! Every operation is a pure function from a borrowed network to a new
//! value:
//!
//! - [`unique_segments`]: undirected two-point segments, deduplicated
//! - [`remove_duplicates_and_subsections`]: drop contained edges
//! - [`connected_components`] / [`connected_component_count`]
//! - [`classify_leaves`] / [`prune`]: leaf segments and iterative erosion
//! - [`unify`]: snap coordinates within a tolerance using the spatial
//!   index from `terragraph-index`
//! - [`network_in_bounding_box`], [`nodes`], [`node_and_edge_count`],
//!   [`route_length`]
//!
//! [`Graph`] wraps a held network and exposes the same operations as
//! methods, and [`normalize`] chains them into a configurable pipeline.
//!
//! This crate has **no I/O dependencies**; reading files and printing
//! results lives in `terragraph-bench`.

pub mod bounding_box;
pub mod connected;
pub mod diagnostics;
pub mod duplicates;
pub mod geojson;
pub mod graph;
pub mod leaf;
pub mod measure;
pub mod nodes;
pub mod normalize;
pub mod segments;
pub mod types;
pub mod unify;

pub use bounding_box::{BoundingBox, network_in_bounding_box};
pub use connected::{connected_component_count, connected_components};
pub use diagnostics::{Clock, NormalizeDiagnostics, normalize_with_diagnostics};
pub use duplicates::remove_duplicates_and_subsections;
pub use geojson::NodeCollection;
pub use graph::Graph;
pub use leaf::{LeafClassification, classify_leaves, leaf_edges, prune};
pub use measure::{longest_edge, route_length, shortest_edge};
pub use nodes::{node_and_edge_count, node_degrees, nodes};
pub use normalize::{NetworkSummary, NormalizeConfig, NormalizeResult, normalize};
pub use segments::{segment_key, unique_segments};
pub use types::{Coordinate, Edge, Network, NetworkError, NodeAndEdgeCount, Properties};
pub use unify::unify;
