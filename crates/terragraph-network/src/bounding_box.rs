//! Clipping a network to a longitude/latitude window.

use geo::{Intersects, Rect};
use serde::{Deserialize, Serialize};

use crate::types::{Edge, Network, NetworkError};

/// An axis-aligned window `[min_lng, min_lat, max_lng, max_lat]`.
///
/// Serializes as the four-number array used by GeoJSON `bbox` members.
/// Construction rejects windows that are empty on either axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    rect: Rect<f64>,
}

impl BoundingBox {
    /// Create a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidBoundingBox`] unless
    /// `min_lng < max_lng` and `min_lat < max_lat`.
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Result<Self, NetworkError> {
        // NaN bounds fail both comparisons.
        let ordered = min_lng < max_lng && min_lat < max_lat;
        if !ordered {
            return Err(NetworkError::InvalidBoundingBox {
                min_lng,
                min_lat,
                max_lng,
                max_lat,
            });
        }
        Ok(Self {
            rect: Rect::new(
                geo::coord! { x: min_lng, y: min_lat },
                geo::coord! { x: max_lng, y: max_lat },
            ),
        })
    }

    /// The box as `[min_lng, min_lat, max_lng, max_lat]`.
    #[must_use]
    pub fn to_array(self) -> [f64; 4] {
        let min = self.rect.min();
        let max = self.rect.max();
        [min.x, min.y, max.x, max.y]
    }

    /// Whether every coordinate of `edge` lies inside the box, boundary
    /// included. An edge without coordinates is trivially inside.
    #[must_use]
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        edge.coordinates
            .iter()
            .all(|&c| self.rect.intersects(&geo::Coord::from(c)))
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = NetworkError;

    fn try_from([min_lng, min_lat, max_lng, max_lat]: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(min_lng, min_lat, max_lng, max_lat)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

/// Keep only the edges lying entirely inside `bbox`.
#[must_use]
pub fn network_in_bounding_box(network: &Network, bbox: &BoundingBox) -> Network {
    let kept: Network = network
        .iter()
        .filter(|edge| bbox.contains_edge(edge))
        .cloned()
        .collect();
    tracing::debug!(
        before = network.len(),
        after = kept.len(),
        bbox = ?bbox.to_array(),
        "clipped network to bounding box"
    );
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn line(coords: &[[f64; 2]]) -> Edge {
        Edge::new(coords.iter().map(|&p| Coordinate::from(p)).collect())
    }

    fn window() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    #[test]
    fn rejects_empty_windows() {
        assert!(matches!(
            BoundingBox::new(10.0, 0.0, 0.0, 10.0),
            Err(NetworkError::InvalidBoundingBox { .. })
        ));
        assert!(BoundingBox::new(0.0, 5.0, 10.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn partially_outside_edge_is_excluded() {
        let network = Network::new(vec![line(&[[1.0, 1.0], [2.0, 2.0], [15.0, 15.0]])]);
        assert!(network_in_bounding_box(&network, &window()).is_empty());
    }

    #[test]
    fn boundary_is_inclusive() {
        let network = Network::new(vec![line(&[[0.0, 0.0], [10.0, 10.0]])]);
        assert_eq!(network_in_bounding_box(&network, &window()), network);
    }

    #[test]
    fn keeps_order_and_properties() {
        let mut inside = line(&[[2.0, 2.0], [3.0, 3.0]]);
        inside.properties.insert("k".into(), serde_json::json!("v"));
        let network = Network::new(vec![
            line(&[[1.0, 1.0], [20.0, 1.0]]),
            inside.clone(),
            line(&[[5.0, 5.0], [6.0, 6.0]]),
        ]);
        let kept = network_in_bounding_box(&network, &window());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.edges()[0], inside);
    }

    #[test]
    fn empty_network_stays_empty() {
        assert!(network_in_bounding_box(&Network::default(), &window()).is_empty());
    }

    #[test]
    fn serializes_as_array() {
        let json = serde_json::to_string(&window()).unwrap();
        assert_eq!(json, "[0.0,0.0,10.0,10.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, window());
        assert!(serde_json::from_str::<BoundingBox>("[5.0,0.0,1.0,1.0]").is_err());
    }
}
