//! GeoJSON wire format.
//!
//! A [`Network`] is exchanged as a `FeatureCollection` whose features
//! each carry a `LineString` geometry; [`NodeCollection`] is the same
//! envelope around `Point` geometries. Feature `properties` pass through
//! verbatim (a `null` or missing bag reads as empty). Positions with more
//! than two components are accepted and truncated to `[lng, lat]`.
//!
//! The domain types implement `Serialize`/`Deserialize` through private
//! proxy structs that mirror the JSON layout, so the public types stay
//! free of wire-format details.

use std::fmt;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Coordinate, Edge, Network, Properties};

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.lng)?;
        tuple.serialize_element(&self.lat)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(PositionVisitor)
    }
}

struct PositionVisitor;

impl<'de> Visitor<'de> for PositionVisitor {
    type Value = Coordinate;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a position array of at least two numbers")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Coordinate, A::Error> {
        let lng: f64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let lat: f64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        // Altitude and any further dimensions are not part of the model.
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Coordinate::new(lng, lat))
    }
}

#[derive(Serialize, Deserialize)]
enum CollectionTag {
    FeatureCollection,
}

#[derive(Serialize, Deserialize)]
enum FeatureTag {
    Feature,
}

#[derive(Serialize)]
struct CollectionOut<'a, G> {
    #[serde(rename = "type")]
    kind: CollectionTag,
    features: Vec<FeatureOut<'a, G>>,
}

#[derive(Serialize)]
struct FeatureOut<'a, G> {
    #[serde(rename = "type")]
    kind: FeatureTag,
    geometry: G,
    properties: &'a Properties,
}

#[derive(Deserialize)]
struct CollectionIn<G> {
    #[serde(rename = "type")]
    _kind: CollectionTag,
    features: Vec<FeatureIn<G>>,
}

#[derive(Deserialize)]
struct FeatureIn<G> {
    #[serde(rename = "type")]
    _kind: FeatureTag,
    geometry: G,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum LineStringOut<'a> {
    LineString { coordinates: &'a [Coordinate] },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum LineStringIn {
    LineString { coordinates: Vec<Coordinate> },
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum PointOut {
    Point { coordinates: Coordinate },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum PointIn {
    Point { coordinates: Coordinate },
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CollectionOut {
            kind: CollectionTag::FeatureCollection,
            features: self
                .iter()
                .map(|edge| FeatureOut {
                    kind: FeatureTag::Feature,
                    geometry: LineStringOut::LineString {
                        coordinates: &edge.coordinates,
                    },
                    properties: &edge.properties,
                })
                .collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let collection = CollectionIn::<LineStringIn>::deserialize(deserializer)?;
        Ok(collection
            .features
            .into_iter()
            .map(|feature| {
                let LineStringIn::LineString { coordinates } = feature.geometry;
                Edge::with_properties(coordinates, feature.properties.unwrap_or_default())
            })
            .collect())
    }
}

/// Distinct network nodes, serialized as a `FeatureCollection` of `Point`
/// features with empty properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCollection(pub Vec<Coordinate>);

impl NodeCollection {
    /// Number of nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NodeCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let empty = Properties::new();
        CollectionOut {
            kind: CollectionTag::FeatureCollection,
            features: self
                .0
                .iter()
                .map(|&coordinates| FeatureOut {
                    kind: FeatureTag::Feature,
                    geometry: PointOut::Point { coordinates },
                    properties: &empty,
                })
                .collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let collection = CollectionIn::<PointIn>::deserialize(deserializer)?;
        Ok(Self(
            collection
                .features
                .into_iter()
                .map(|feature| {
                    let PointIn::Point { coordinates } = feature.geometry;
                    coordinates
                })
                .collect(),
        ))
    }
}
