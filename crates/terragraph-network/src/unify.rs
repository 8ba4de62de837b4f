//! Snapping of nearby coordinates onto shared representatives.
//!
//! Edges are visited in order, and each edge's coordinates in sequence.
//! The first time a distinct coordinate is met it is mapped to the
//! nearest existing representative within the tolerance, or becomes a
//! representative itself when there is none. The mapping is global, so
//! coordinates of different edges that lie within the tolerance converge
//! on one value and the edges become connected.
//!
//! Within one edge the snapping never folds the line onto itself:
//!
//! - candidates exclude coordinates that appeared earlier in the same
//!   edge and representatives already used by it;
//! - an occurrence whose mapped representative was already used earlier
//!   in the edge keeps its own coordinate;
//! - an occurrence snapping onto the immediately preceding output
//!   coordinate is dropped instead of creating a zero-length segment.
//!
//! Distances are measured from original positions, so one pass is not
//! necessarily a fixed point.
//!
//! All distinct coordinates go into a single [`KdBush`] built for the
//! pass; candidate lookups use [`around_with`] with the tolerance as the
//! search radius.

use std::collections::{HashMap, HashSet};

use terragraph_index::{AroundOptions, KdBush, around_with};

use crate::types::{Coordinate, Edge, Network, NetworkError};

/// Snap coordinates closer than `tolerance_meters` onto shared
/// representatives.
///
/// Networks with fewer than two edges are returned unchanged. No edge
/// gains coordinates, and an edge that would collapse below two
/// coordinates keeps its original geometry. Properties are preserved.
///
/// # Errors
///
/// Returns [`NetworkError::InvalidTolerance`] for a negative or
/// non-finite tolerance, or [`NetworkError::Index`] if the spatial index
/// cannot be built.
pub fn unify(network: &Network, tolerance_meters: f64) -> Result<Network, NetworkError> {
    if !tolerance_meters.is_finite() || tolerance_meters < 0.0 {
        return Err(NetworkError::InvalidTolerance(tolerance_meters));
    }
    if network.len() < 2 {
        return Ok(network.clone());
    }

    let mut unifier = Unifier::new(network, tolerance_meters)?;
    let edges: Network = network
        .iter()
        .map(|edge| unifier.unify_edge(edge))
        .collect::<Result<_, _>>()?;

    tracing::debug!(
        edges = edges.len(),
        distinct = unifier.distinct.len(),
        representatives = unifier.registered.iter().filter(|r| **r).count(),
        tolerance_meters,
        "unified coordinates"
    );
    Ok(edges)
}

struct Unifier {
    /// Distinct coordinates, indexed by id.
    distinct: Vec<Coordinate>,
    ids: HashMap<Coordinate, usize>,
    index: KdBush,
    options: AroundOptions,
    /// Whether an id has become a representative.
    registered: Vec<bool>,
    /// Chosen representative per id, assigned on first encounter.
    mapping: Vec<Option<usize>>,
}

impl Unifier {
    fn new(network: &Network, tolerance_meters: f64) -> Result<Self, NetworkError> {
        let mut distinct = Vec::new();
        let mut ids = HashMap::new();
        for edge in network {
            for &c in &edge.coordinates {
                ids.entry(c).or_insert_with(|| {
                    distinct.push(c);
                    distinct.len() - 1
                });
            }
        }

        let mut index = KdBush::new(distinct.len())?;
        for c in &distinct {
            index.add(c.lng, c.lat)?;
        }
        index.finish()?;

        let n = distinct.len();
        Ok(Self {
            distinct,
            ids,
            index,
            options: AroundOptions::unbounded()
                .with_max_results(1)
                .with_max_distance_km(tolerance_meters / 1000.0),
            registered: vec![false; n],
            mapping: vec![None; n],
        })
    }

    fn unify_edge(&mut self, edge: &Edge) -> Result<Edge, NetworkError> {
        let mut seen = HashSet::new();
        let mut used = HashSet::new();
        let mut coordinates: Vec<Coordinate> = Vec::with_capacity(edge.len());
        let mut last = None;

        for c in &edge.coordinates {
            let id = self.ids[c];
            let mut rep = match self.mapping[id] {
                Some(rep) => rep,
                None => {
                    let rep = self.nearest_representative(id, &seen, &used)?.unwrap_or(id);
                    if rep == id {
                        self.registered[id] = true;
                    }
                    self.mapping[id] = Some(rep);
                    rep
                }
            };
            if rep != id && used.contains(&rep) {
                rep = id;
            }
            if last != Some(rep) {
                coordinates.push(self.distinct[rep]);
                used.insert(rep);
                last = Some(rep);
            }
            seen.insert(id);
        }

        if coordinates.len() < 2 && edge.len() >= 2 {
            return Ok(edge.clone());
        }
        Ok(Edge::with_properties(coordinates, edge.properties.clone()))
    }

    /// Closest registered representative within tolerance that this edge
    /// has neither visited nor already snapped to.
    fn nearest_representative(
        &self,
        id: usize,
        seen: &HashSet<usize>,
        used: &HashSet<usize>,
    ) -> Result<Option<usize>, NetworkError> {
        let c = self.distinct[id];
        let found = around_with(&self.index, c.lng, c.lat, self.options, |candidate| {
            self.registered[candidate] && !seen.contains(&candidate) && !used.contains(&candidate)
        })?;
        Ok(found.first().copied())
    }
}
