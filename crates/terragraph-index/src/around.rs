//! Geographic nearest-neighbor search over a [`KdBush`] of
//! `(longitude, latitude)` points.
//!
//! # Algorithm
//!
//! Best-first traversal driven by a [`TinyQueue`] holding two kinds of
//! entries:
//!
//! - **Tree nodes**, keyed by a lower bound on the great-circle distance
//!   from the query to the node's bounding box.
//! - **Points**, keyed by their true great-circle distance.
//!
//! Each iteration expands the closest node (pushing its median point and
//! two children, or every point of a leaf), then emits points while a
//! point sits at the top of the queue. Because every node bound is
//! admissible, a point at the top is closer than anything not yet
//! discovered, so results come out in ascending distance order. The
//! search stops at `max_results`, or once the closest remaining entry is
//! beyond `max_distance_km`.
//!
//! Distances are compared as haversines (`sin²(θ/2)` of the central
//! angle), which are monotone in arc length and avoid an `asin` per
//! candidate.
//!
//! # Antimeridian
//!
//! Node boxes are built from split values in stored degrees and never
//! wrap. The box bound treats a query longitude as inside a box if any
//! `±360°` shift of it is, and otherwise measures the longitude gap to the
//! nearer box edge with the periodic haversine, so a box at `179°` is
//! correctly seen as close to a query at `-179°`.

use std::cmp::Ordering;

use crate::distance::{EARTH_RADIUS_KM, haversin};
use crate::error::IndexError;
use crate::kdbush::KdBush;
use crate::queue::TinyQueue;

/// Limits for an [`around`] query. Both default to unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AroundOptions {
    /// Stop after this many results.
    pub max_results: Option<usize>,
    /// Ignore points farther than this great-circle distance.
    pub max_distance_km: Option<f64>,
}

impl AroundOptions {
    /// No limits: every indexed point, nearest first.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_results: None,
            max_distance_km: None,
        }
    }

    /// Limit the number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Limit the search radius, in kilometers.
    #[must_use]
    pub const fn with_max_distance_km(mut self, max_distance_km: f64) -> Self {
        self.max_distance_km = Some(max_distance_km);
        self
    }
}

/// Ids of indexed points ordered by great-circle distance from
/// `(lng, lat)`, nearest first.
///
/// Returns an empty vector when nothing satisfies the limits.
///
/// # Errors
///
/// Returns [`IndexError::NotFinished`] if the index has not been finished.
///
/// # Examples
///
/// ```
/// use terragraph_index::{AroundOptions, KdBush, around};
///
/// let mut index = KdBush::new(3)?;
/// index.add(0.0, 0.0)?;
/// index.add(10.0, 10.0)?;
/// index.add(1.0, 1.0)?;
/// index.finish()?;
///
/// let nearest = around(&index, 0.2, 0.2, AroundOptions::unbounded().with_max_results(2))?;
/// assert_eq!(nearest, vec![0, 2]);
/// # Ok::<(), terragraph_index::IndexError>(())
/// ```
pub fn around(
    index: &KdBush,
    lng: f64,
    lat: f64,
    options: AroundOptions,
) -> Result<Vec<usize>, IndexError> {
    around_with(index, lng, lat, options, |_| true)
}

/// Like [`around`], but only ids accepted by `predicate` are returned.
///
/// Rejected ids never count toward `max_results`.
///
/// # Errors
///
/// Returns [`IndexError::NotFinished`] if the index has not been finished.
pub fn around_with(
    index: &KdBush,
    lng: f64,
    lat: f64,
    options: AroundOptions,
    mut predicate: impl FnMut(usize) -> bool,
) -> Result<Vec<usize>, IndexError> {
    index.ensure_finished()?;

    let mut result = Vec::new();
    let max_results = options.max_results.unwrap_or(usize::MAX);
    let Some(extent) = index.extent() else {
        return Ok(result);
    };
    if max_results == 0 {
        return Ok(result);
    }
    // A negative or NaN radius admits nothing.
    if options.max_distance_km.is_some_and(|km| km.is_nan() || km < 0.0) {
        return Ok(result);
    }
    let max_hav = options
        .max_distance_km
        .map_or(f64::INFINITY, max_haversin);

    let cos_lat = lat.to_radians().cos();
    let query = Query { lng, lat, cos_lat };
    let mut queue = TinyQueue::with_comparator(compare_entries as fn(&Entry, &Entry) -> Ordering);

    let mut node = Some(Node {
        left: 0,
        right: index.len() - 1,
        axis: 0,
        min_lng: extent.min_x,
        min_lat: extent.min_y,
        max_lng: extent.max_x,
        max_lat: extent.max_y,
    });

    while let Some(current) = node.take() {
        let Node { left, right, .. } = current;

        if right - left <= index.node_size() {
            for pos in left..=right {
                let id = index.id_at(pos);
                if predicate(id) {
                    let (x, y) = index.point_at(pos);
                    queue.push(Entry {
                        dist: query.point_dist(x, y),
                        item: Item::Point(id),
                    });
                }
            }
        } else {
            let m = (left + right) / 2;
            let (mid_lng, mid_lat) = index.point_at(m);

            let id = index.id_at(m);
            if predicate(id) {
                queue.push(Entry {
                    dist: query.point_dist(mid_lng, mid_lat),
                    item: Item::Point(id),
                });
            }

            let (lower, upper) = current.split(m, mid_lng, mid_lat);
            queue.push(Entry {
                dist: query.box_dist(&lower),
                item: Item::Node(lower),
            });
            queue.push(Entry {
                dist: query.box_dist(&upper),
                item: Item::Node(upper),
            });
        }

        while let Some(Entry {
            dist,
            item: Item::Point(id),
        }) = queue.peek()
        {
            if *dist > max_hav {
                return Ok(result);
            }
            result.push(*id);
            queue.pop();
            if result.len() >= max_results {
                return Ok(result);
            }
        }

        node = match queue.pop() {
            Some(Entry {
                dist,
                item: Item::Node(next),
            }) if dist <= max_hav => Some(next),
            _ => None,
        };
    }

    tracing::trace!(lng, lat, found = result.len(), "around query exhausted");
    Ok(result)
}

/// Great-circle distance in kilometers, using the same formulation as the
/// query engine.
#[must_use]
pub fn great_circle_km(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let query = Query {
        lng: lng1,
        lat: lat1,
        cos_lat: lat1.to_radians().cos(),
    };
    let h = query.point_dist(lng2, lat2);
    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Haversine threshold for a kilometer radius; radii reaching the
/// antipode admit everything.
fn max_haversin(km: f64) -> f64 {
    let theta = km / EARTH_RADIUS_KM;
    if theta >= std::f64::consts::PI {
        f64::INFINITY
    } else {
        haversin(theta)
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: usize,
    right: usize,
    axis: u8,
    min_lng: f64,
    min_lat: f64,
    max_lng: f64,
    max_lat: f64,
}

impl Node {
    /// Children of a non-leaf node split at tree position `m`.
    const fn split(&self, m: usize, mid_lng: f64, mid_lat: f64) -> (Self, Self) {
        let axis = 1 - self.axis;
        let lower = Self {
            left: self.left,
            right: m - 1,
            axis,
            min_lng: self.min_lng,
            min_lat: self.min_lat,
            max_lng: if self.axis == 0 { mid_lng } else { self.max_lng },
            max_lat: if self.axis == 1 { mid_lat } else { self.max_lat },
        };
        let upper = Self {
            left: m + 1,
            right: self.right,
            axis,
            min_lng: if self.axis == 0 { mid_lng } else { self.min_lng },
            min_lat: if self.axis == 1 { mid_lat } else { self.min_lat },
            max_lng: self.max_lng,
            max_lat: self.max_lat,
        };
        (lower, upper)
    }
}

#[derive(Debug)]
enum Item {
    Node(Node),
    Point(usize),
}

#[derive(Debug)]
struct Entry {
    dist: f64,
    item: Item,
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    a.dist.total_cmp(&b.dist)
}

struct Query {
    lng: f64,
    lat: f64,
    cos_lat: f64,
}

impl Query {
    /// Haversine of the central angle to a point.
    fn point_dist(&self, lng: f64, lat: f64) -> f64 {
        partial_dist(haversin((self.lng - lng).to_radians()), self.cos_lat, self.lat, lat)
    }

    /// Lower bound on the haversine to any point inside `node`'s box.
    fn box_dist(&self, node: &Node) -> f64 {
        if lng_in_span(self.lng, node.min_lng, node.max_lng) {
            if self.lat < node.min_lat {
                return haversin((self.lat - node.min_lat).to_radians());
            }
            if self.lat > node.max_lat {
                return haversin((self.lat - node.max_lat).to_radians());
            }
            return 0.0;
        }

        // Periodic, so the nearer edge wins even across the antimeridian.
        let hav_dlng = haversin((self.lng - node.min_lng).to_radians())
            .min(haversin((self.lng - node.max_lng).to_radians()));
        let extremum_lat = vertex_lat(self.lat, hav_dlng);

        if extremum_lat > node.min_lat && extremum_lat < node.max_lat {
            return partial_dist(hav_dlng, self.cos_lat, self.lat, extremum_lat);
        }
        partial_dist(hav_dlng, self.cos_lat, self.lat, node.min_lat).min(partial_dist(
            hav_dlng,
            self.cos_lat,
            self.lat,
            node.max_lat,
        ))
    }
}

/// Whether `lng`, shifted by any multiple of 360°, lies in `[min, max]`.
fn lng_in_span(lng: f64, min: f64, max: f64) -> bool {
    if max - min >= 360.0 {
        return true;
    }
    min + (lng - min).rem_euclid(360.0) <= max
}

fn partial_dist(hav_dlng: f64, cos_lat1: f64, lat1: f64, lat2: f64) -> f64 {
    (cos_lat1 * lat2.to_radians().cos()).mul_add(hav_dlng, haversin((lat1 - lat2).to_radians()))
}

/// Latitude at which the great circle through the query point reaches
/// its closest approach to a meridian `dlng` away.
fn vertex_lat(lat: f64, hav_dlng: f64) -> f64 {
    let cos_dlng = 2.0f64.mul_add(-hav_dlng, 1.0);
    if cos_dlng <= 0.0 {
        return if lat > 0.0 { 90.0 } else { -90.0 };
    }
    (lat.to_radians().tan() / cos_dlng).atan().to_degrees()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::distance::haversine;
    use crate::kdbush::{CoordKind, DEFAULT_NODE_SIZE};

    const POINTS: [[f64; 2]; 8] = [
        [0.0, 0.0],
        [1.0, 1.0],
        [2.0, 2.0],
        [3.0, 3.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [3.0, 2.0],
        [2.0, 3.0],
    ];

    fn build(points: &[[f64; 2]], node_size: usize) -> KdBush {
        let mut index =
            KdBush::with_options(points.len(), node_size, CoordKind::Float64).unwrap();
        for p in points {
            index.add(p[0], p[1]).unwrap();
        }
        index.finish().unwrap();
        index
    }

    fn scattered(n: usize, center: [f64; 2], spread: f64) -> Vec<[f64; 2]> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit - 0.5
        };
        (0..n)
            .map(|_| {
                [
                    next().mul_add(spread, center[0]),
                    next().mul_add(spread, center[1]),
                ]
            })
            .collect()
    }

    fn assert_sorted_by_distance(points: &[[f64; 2]], ids: &[usize], q: [f64; 2]) {
        for pair in ids.windows(2) {
            let a = haversine(q, points[pair[0]]);
            let b = haversine(q, points[pair[1]]);
            assert!(a <= b + 1e-9, "{a} > {b}");
        }
    }

    #[test]
    fn returns_points_within_radius() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let d = great_circle_km(0.0, 0.0, 1.0, 1.0);
        let mut found = around(
            &index,
            0.0,
            0.0,
            AroundOptions::unbounded().with_max_distance_km(d + 1.0),
        )
        .unwrap();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 4, 5]);
    }

    #[test]
    fn unbounded_returns_every_point_sorted() {
        let index = build(&POINTS, 2);
        let found = around(&index, 0.0, 0.0, AroundOptions::default()).unwrap();
        assert_eq!(found.len(), POINTS.len());
        let mut sorted = found.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..POINTS.len()).collect::<Vec<_>>());
        assert_sorted_by_distance(&POINTS, &found, [0.0, 0.0]);
    }

    #[test]
    fn empty_when_nothing_in_radius() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let found = around(
            &index,
            10.0,
            10.0,
            AroundOptions::unbounded().with_max_distance_km(1.0),
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn respects_max_results() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let found = around(&index, 0.0, 0.0, AroundOptions::unbounded().with_max_results(2)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], 0);
    }

    #[test]
    fn zero_max_results_is_empty() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let found = around(&index, 0.0, 0.0, AroundOptions::unbounded().with_max_results(0)).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn negative_or_nan_radius_is_empty() {
        let index = build(&[[0.0, 0.0], [0.5, 0.0], [10.0, 0.0]], 2);
        for km in [-100.0, f64::NAN] {
            let found = around(&index, 0.0, 0.0, AroundOptions::unbounded().with_max_distance_km(km))
                .unwrap();
            assert!(found.is_empty(), "radius {km} returned {found:?}");
        }
    }

    #[test]
    fn zero_radius_finds_coincident_point() {
        let index = build(&[[0.0, 0.0], [0.5, 0.0]], 2);
        let found = around(&index, 0.0, 0.0, AroundOptions::unbounded().with_max_distance_km(0.0))
            .unwrap();
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn known_distance() {
        assert!((great_circle_km(0.0, 0.0, 1.0, 1.0) - 157.2493).abs() < 0.01);
    }

    #[test]
    fn unfinished_index_is_rejected() {
        let index = KdBush::new(1).unwrap();
        assert_eq!(
            around(&index, 0.0, 0.0, AroundOptions::default()),
            Err(IndexError::NotFinished)
        );
    }

    #[test]
    fn empty_index_returns_empty() {
        let mut index = KdBush::new(0).unwrap();
        index.finish().unwrap();
        assert!(around(&index, 0.0, 0.0, AroundOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn predicate_filters_without_consuming_results() {
        let index = build(&POINTS, 2);
        let found = around_with(
            &index,
            0.0,
            0.0,
            AroundOptions::unbounded().with_max_results(2),
            |id| id % 2 == 1,
        )
        .unwrap();
        // (0, 1) is closer to the origin than (1, 1).
        assert_eq!(found, vec![5, 1]);
    }

    #[test]
    fn nearest_ten_around_london() {
        let london = [-0.1278, 51.5074];
        let points = scattered(1_000, london, 2.0);
        let index = build(&points, 16);
        let found = around(
            &index,
            london[0],
            london[1],
            AroundOptions::unbounded().with_max_results(10),
        )
        .unwrap();
        assert_eq!(found.len(), 10);

        let mut brute: Vec<usize> = (0..points.len()).collect();
        let dist = |id: usize| great_circle_km(london[0], london[1], points[id][0], points[id][1]);
        brute.sort_by(|&a, &b| dist(a).total_cmp(&dist(b)));
        assert_eq!(found, brute[..10].to_vec());
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let london = [-0.1278, 51.5074];
        let points = scattered(1_000, london, 2.0);
        let index = build(&points, 16);
        let radius = 10.0;
        let found = around(
            &index,
            london[0],
            london[1],
            AroundOptions::unbounded().with_max_distance_km(radius),
        )
        .unwrap();

        let expected = points
            .iter()
            .filter(|p| great_circle_km(london[0], london[1], p[0], p[1]) <= radius)
            .count();
        assert_eq!(found.len(), expected);
        for &id in &found {
            assert!(great_circle_km(london[0], london[1], points[id][0], points[id][1]) <= radius);
        }
    }

    #[test]
    fn finds_neighbors_across_antimeridian() {
        let mut points: Vec<[f64; 2]> = scattered(500, [0.0, 0.0], 300.0)
            .into_iter()
            .map(|[x, y]| [x, y / 4.0])
            .collect();
        points.push([179.95, 0.0]);
        points.push([-179.95, 0.1]);
        let east = points.len() - 2;
        let west = points.len() - 1;
        let index = build(&points, 4);

        let found = around(
            &index,
            -179.99,
            0.0,
            AroundOptions::unbounded().with_max_distance_km(50.0),
        )
        .unwrap();
        assert!(found.contains(&east), "missed point east of the antimeridian");
        assert!(found.contains(&west));
    }

    #[test]
    fn shifted_query_longitude_is_not_pruned() {
        // A query stored as -185° is the same meridian as 175°.
        let points = [[175.0, 10.0], [0.0, 0.0], [10.0, 10.0], [-60.0, 5.0]];
        let index = build(&points, 2);
        let found = around(
            &index,
            -185.0,
            10.0,
            AroundOptions::unbounded().with_max_distance_km(1.0),
        )
        .unwrap();
        assert_eq!(found, vec![0]);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn unbounded_around_returns_every_point_in_distance_order(
                points in prop::collection::vec((-180.0f64..180.0, -85.0f64..85.0), 1..200),
                q in (-180.0f64..180.0, -85.0f64..85.0),
                node_size in 2usize..16,
            ) {
                let points: Vec<[f64; 2]> = points.into_iter().map(|(x, y)| [x, y]).collect();
                let index = build(&points, node_size);
                let found = around(&index, q.0, q.1, AroundOptions::default()).unwrap();

                let mut sorted = found.clone();
                sorted.sort_unstable();
                prop_assert_eq!(sorted, (0..points.len()).collect::<Vec<_>>());
                for pair in found.windows(2) {
                    let a = great_circle_km(q.0, q.1, points[pair[0]][0], points[pair[0]][1]);
                    let b = great_circle_km(q.0, q.1, points[pair[1]][0], points[pair[1]][1]);
                    prop_assert!(a <= b + 1e-6);
                }
            }

            #[test]
            fn great_circle_is_symmetric(
                a in (-180.0f64..180.0, -90.0f64..90.0),
                b in (-180.0f64..180.0, -90.0f64..90.0),
            ) {
                let ab = great_circle_km(a.0, a.1, b.0, b.1);
                let ba = great_circle_km(b.0, b.1, a.0, a.1);
                prop_assert!((ab - ba).abs() < 1e-6);
                prop_assert!(great_circle_km(a.0, a.1, a.0, a.1).abs() < 1e-9);
            }
        }
    }
}
