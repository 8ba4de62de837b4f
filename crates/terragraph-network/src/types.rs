//! Shared types for terragraph networks.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use terragraph_index::IndexError;

/// Free-form feature properties, carried through untouched.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A geographic position in degrees.
///
/// Equality, hashing and ordering compare the raw bit patterns of both
/// components, so two coordinates are the same node only when they are
/// bit-for-bit identical. Ordering is lexicographic on
/// `(lng, lat)` using [`f64::total_cmp`].
#[derive(Debug, Clone, Copy)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// The coordinate as a `[lng, lat]` pair.
    #[must_use]
    pub const fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Great-circle distance to another coordinate, in kilometers.
    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        terragraph_index::distance::haversine(self.to_array(), other.to_array())
    }

    const fn bits(self) -> (u64, u64) {
        (self.lng.to_bits(), self.lat.to_bits())
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lng
            .total_cmp(&other.lng)
            .then_with(|| self.lat.total_cmp(&other.lat))
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Self { x: c.lng, y: c.lat }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Self { lng: c.x, lat: c.y }
    }
}

/// One line feature of a network: an ordered run of coordinates plus
/// its properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edge {
    /// Vertices in drawing order.
    pub coordinates: Vec<Coordinate>,
    /// Properties of the source feature.
    pub properties: Properties,
}

impl Edge {
    /// Create an edge with empty properties.
    #[must_use]
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            properties: Properties::new(),
        }
    }

    /// Create an edge carrying `properties`.
    #[must_use]
    pub const fn with_properties(coordinates: Vec<Coordinate>, properties: Properties) -> Self {
        Self {
            coordinates,
            properties,
        }
    }

    /// Number of coordinates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Returns `true` if the edge has no coordinates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Consecutive coordinate pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        self.coordinates.windows(2).map(|w| (w[0], w[1]))
    }

    /// The edge as a `geo::LineString`. Properties are dropped.
    #[must_use]
    pub fn to_line_string(&self) -> geo::LineString<f64> {
        self.coordinates.iter().copied().map(geo::Coord::from).collect()
    }
}

impl From<geo::LineString<f64>> for Edge {
    fn from(line: geo::LineString<f64>) -> Self {
        Self::new(line.0.into_iter().map(Coordinate::from).collect())
    }
}

/// An ordered collection of edges.
///
/// Serializes as a GeoJSON `FeatureCollection` of `LineString`
/// features (see [`crate::geojson`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network(Vec<Edge>);

impl Network {
    /// Create a network from a vector of edges.
    #[must_use]
    pub const fn new(edges: Vec<Edge>) -> Self {
        Self(edges)
    }

    /// Returns `true` if the network has no edges.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edges.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.0
    }

    /// Iterate over the edges.
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.0.iter()
    }

    /// Append an edge.
    pub fn push(&mut self, edge: Edge) {
        self.0.push(edge);
    }

    /// Total coordinate count across all edges.
    #[must_use]
    pub fn coordinate_count(&self) -> usize {
        self.0.iter().map(Edge::len).sum()
    }

    /// Consumes the network and returns the underlying vector of edges.
    #[must_use]
    pub fn into_edges(self) -> Vec<Edge> {
        self.0
    }
}

impl FromIterator<Edge> for Network {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Network {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Network {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Unique node and segment counts of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeAndEdgeCount {
    /// Distinct coordinates.
    pub node_count: usize,
    /// Distinct undirected segments.
    pub edge_count: usize,
}

/// Errors that can occur while analyzing or transforming a network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// A bounding box whose minimum is not below its maximum on some axis.
    #[error(
        "invalid bounding box [{min_lng}, {min_lat}, {max_lng}, {max_lat}]: min values must be less than max values"
    )]
    InvalidBoundingBox {
        /// Western edge.
        min_lng: f64,
        /// Southern edge.
        min_lat: f64,
        /// Eastern edge.
        max_lng: f64,
        /// Northern edge.
        max_lat: f64,
    },

    /// An edge with too few coordinates for the requested operation.
    #[error("edge has {found} coordinates, at least {required} are required")]
    MalformedGeometry {
        /// Coordinates present.
        found: usize,
        /// Coordinates needed.
        required: usize,
    },

    /// A unification radius that is negative or not finite.
    #[error("unification tolerance must be a finite, non-negative number of meters, got {0}")]
    InvalidTolerance(f64),

    /// Failure inside the spatial index.
    #[error(transparent)]
    Index(#[from] IndexError),
}
