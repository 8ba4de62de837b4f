//! Flattened, static k-d tree over 2D points.
//!
//! [`KdBush`] stores points in two parallel buffers: an id permutation
//! and an interleaved `[x0, y0, x1, y1, ...]` coordinate array. There are
//! no node structs or pointers; the tree shape is implicit in the index
//! arithmetic. [`finish`](KdBush::finish) recursively partitions the
//! buffers around the median of each sub-range (x at even depth, y at odd
//! depth) using Floyd-Rivest selection, stopping once a sub-range holds at
//! most `node_size` points. Those leaf ranges are scanned linearly at
//! query time.
//!
//! # Lifecycle
//!
//! 1. [`KdBush::new`] / [`KdBush::with_options`] declares the capacity.
//! 2. [`add`](KdBush::add) is called exactly `capacity` times.
//! 3. [`finish`](KdBush::finish) sorts; afterwards the index is immutable.
//!
//! # Buffer layout
//!
//! [`to_bytes`](KdBush::to_bytes) writes an 8-byte header followed by the
//! id permutation, zero padding to an 8-byte boundary, and the coordinate
//! array (all little-endian):
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 1    | magic `0xdb`                            |
//! | 1      | 1    | `(VERSION << 4) \| coord kind tag`      |
//! | 2      | 2    | `node_size` (`u16`)                     |
//! | 4      | 4    | `num_items` (`u32`)                     |
//!
//! [`from_bytes`](KdBush::from_bytes) rebuilds an identical, already
//! finished index without re-sorting.

use crate::error::IndexError;

/// Default number of points per leaf bucket.
pub const DEFAULT_NODE_SIZE: usize = 64;

const MAGIC: u8 = 0xdb;
const VERSION: u8 = 1;
const HEADER_SIZE: usize = 8;
const MIN_NODE_SIZE: usize = 2;
const MAX_NODE_SIZE: usize = u16::MAX as usize;

/// Item counts below this use 16-bit ids.
const U16_ID_LIMIT: usize = 1 << 16;

/// Sub-ranges larger than this are narrowed with a recursive
/// Floyd-Rivest sample before partitioning.
const SELECT_SAMPLE_THRESHOLD: usize = 600;

/// Numeric storage used for the coordinate buffer.
///
/// Tags follow the typed-array ordering of the serialized format, so
/// only tags `7` and `8` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordKind {
    /// 32-bit floats: half the memory, ~1 m precision at global scale.
    Float32,
    /// 64-bit floats.
    #[default]
    Float64,
}

impl CoordKind {
    /// Serialized tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Float32 => 7,
            Self::Float64 => 8,
        }
    }

    /// Parse a serialized tag.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UnsupportedBufferKind`] for any tag other
    /// than those returned by [`tag`](Self::tag).
    pub const fn from_tag(tag: u8) -> Result<Self, IndexError> {
        match tag {
            7 => Ok(Self::Float32),
            8 => Ok(Self::Float64),
            other => Err(IndexError::UnsupportedBufferKind(other)),
        }
    }

    const fn byte_width(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Integer width used for the id permutation, chosen from the capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// 16-bit ids, for fewer than 65 536 points.
    U16,
    /// 32-bit ids.
    U32,
}

impl IdKind {
    /// The narrowest id width that can address `num_items` points.
    #[must_use]
    pub const fn for_capacity(num_items: usize) -> Self {
        if num_items < U16_ID_LIMIT {
            Self::U16
        } else {
            Self::U32
        }
    }

    const fn byte_width(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum IdBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IdBuffer {
    fn zeroed(kind: IdKind, len: usize) -> Self {
        match kind {
            IdKind::U16 => Self::U16(vec![0; len]),
            IdKind::U32 => Self::U32(vec![0; len]),
        }
    }

    fn get(&self, i: usize) -> usize {
        match self {
            Self::U16(ids) => usize::from(ids[i]),
            Self::U32(ids) => ids[i] as usize,
        }
    }

    // Ids are bounded by the capacity, which selected the width.
    #[allow(clippy::cast_possible_truncation)]
    fn set(&mut self, i: usize, id: usize) {
        match self {
            Self::U16(ids) => ids[i] = id as u16,
            Self::U32(ids) => ids[i] = id as u32,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        match self {
            Self::U16(ids) => ids.swap(i, j),
            Self::U32(ids) => ids.swap(i, j),
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            Self::U16(ids) => ids.iter().for_each(|id| out.extend(id.to_le_bytes())),
            Self::U32(ids) => ids.iter().for_each(|id| out.extend(id.to_le_bytes())),
        }
    }

    fn read_le(kind: IdKind, bytes: &[u8]) -> Self {
        match kind {
            IdKind::U16 => Self::U16(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            IdKind::U32 => Self::U32(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CoordBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl CoordBuffer {
    fn zeroed(kind: CoordKind, len: usize) -> Self {
        match kind {
            CoordKind::Float32 => Self::F32(vec![0.0; len]),
            CoordKind::Float64 => Self::F64(vec![0.0; len]),
        }
    }

    fn get(&self, i: usize) -> f64 {
        match self {
            Self::F32(c) => f64::from(c[i]),
            Self::F64(c) => c[i],
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set(&mut self, i: usize, value: f64) {
        match self {
            Self::F32(c) => c[i] = value as f32,
            Self::F64(c) => c[i] = value,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        match self {
            Self::F32(c) => c.swap(i, j),
            Self::F64(c) => c.swap(i, j),
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            Self::F32(c) => c.iter().for_each(|v| out.extend(v.to_le_bytes())),
            Self::F64(c) => c.iter().for_each(|v| out.extend(v.to_le_bytes())),
        }
    }

    fn read_le(kind: CoordKind, bytes: &[u8]) -> Self {
        match kind {
            CoordKind::Float32 => Self::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            CoordKind::Float64 => Self::F64(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        }
    }
}

/// Axis-aligned extent of the indexed points, in stored units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A static k-d tree over a fixed number of 2D points.
///
/// See the [module documentation](self) for the build lifecycle and
/// serialized layout.
#[derive(Debug, Clone, PartialEq)]
pub struct KdBush {
    num_items: usize,
    node_size: usize,
    coord_kind: CoordKind,
    ids: IdBuffer,
    coords: CoordBuffer,
    pos: usize,
    finished: bool,
    extent: Option<Extent>,
}

impl KdBush {
    /// Create an index for `num_items` points with default options
    /// ([`DEFAULT_NODE_SIZE`], [`CoordKind::Float64`]).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidCapacity`] if `num_items` does not fit
    /// the 32-bit item count of the serialized header.
    pub fn new(num_items: usize) -> Result<Self, IndexError> {
        Self::with_options(num_items, DEFAULT_NODE_SIZE, CoordKind::Float64)
    }

    /// Create an index with an explicit leaf size and coordinate storage.
    ///
    /// `node_size` is clamped to `2..=65535`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidCapacity`] if `num_items` does not fit
    /// the 32-bit item count of the serialized header.
    pub fn with_options(
        num_items: usize,
        node_size: usize,
        coord_kind: CoordKind,
    ) -> Result<Self, IndexError> {
        if u32::try_from(num_items).is_err() {
            return Err(IndexError::InvalidCapacity(num_items));
        }
        Ok(Self {
            num_items,
            node_size: node_size.clamp(MIN_NODE_SIZE, MAX_NODE_SIZE),
            coord_kind,
            ids: IdBuffer::zeroed(IdKind::for_capacity(num_items), num_items),
            coords: CoordBuffer::zeroed(coord_kind, num_items * 2),
            pos: 0,
            finished: false,
            extent: None,
        })
    }

    /// Add a point, returning its sequential id.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::AlreadyFinished`] after [`finish`](Self::finish),
    /// or [`IndexError::CountMismatch`] when the declared capacity is
    /// already full.
    pub fn add(&mut self, x: f64, y: f64) -> Result<usize, IndexError> {
        if self.finished {
            return Err(IndexError::AlreadyFinished);
        }
        let index = self.pos;
        if index >= self.num_items {
            return Err(IndexError::CountMismatch {
                added: index + 1,
                expected: self.num_items,
            });
        }
        self.ids.set(index, index);
        self.coords.set(2 * index, x);
        self.coords.set(2 * index + 1, y);
        self.pos += 1;
        Ok(index)
    }

    /// Sort the buffers into k-d order. Must be called exactly once,
    /// after exactly `capacity` points were added.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::AlreadyFinished`] on a second call, or
    /// [`IndexError::CountMismatch`] if the number of added points differs
    /// from the capacity.
    pub fn finish(&mut self) -> Result<(), IndexError> {
        if self.finished {
            return Err(IndexError::AlreadyFinished);
        }
        if self.pos != self.num_items {
            return Err(IndexError::CountMismatch {
                added: self.pos,
                expected: self.num_items,
            });
        }
        if self.num_items > 0 {
            sort(
                &mut self.ids,
                &mut self.coords,
                self.node_size,
                0,
                self.num_items - 1,
                0,
            );
        }
        self.extent = compute_extent(&self.coords, self.num_items);
        self.finished = true;
        tracing::debug!(
            num_items = self.num_items,
            node_size = self.node_size,
            "spatial index finished"
        );
        Ok(())
    }

    /// Number of points the index holds (its declared capacity).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.num_items
    }

    /// Returns `true` if the index was declared with zero capacity.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Maximum number of points scanned linearly per leaf.
    #[must_use]
    pub const fn node_size(&self) -> usize {
        self.node_size
    }

    /// Coordinate storage kind.
    #[must_use]
    pub const fn coord_kind(&self) -> CoordKind {
        self.coord_kind
    }

    /// Id width, derived from the capacity.
    #[must_use]
    pub const fn id_kind(&self) -> IdKind {
        match self.ids {
            IdBuffer::U16(_) => IdKind::U16,
            IdBuffer::U32(_) => IdKind::U32,
        }
    }

    /// Returns `true` once [`finish`](Self::finish) succeeded.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The id permutation in tree order.
    #[must_use]
    pub fn ids(&self) -> Vec<usize> {
        (0..self.num_items).map(|i| self.ids.get(i)).collect()
    }

    /// The interleaved coordinate buffer in tree order, widened to `f64`.
    #[must_use]
    pub fn coords(&self) -> Vec<f64> {
        (0..self.num_items * 2).map(|i| self.coords.get(i)).collect()
    }

    /// Original id stored at tree position `pos`.
    pub(crate) fn id_at(&self, pos: usize) -> usize {
        self.ids.get(pos)
    }

    /// `(x, y)` stored at tree position `pos`.
    pub(crate) fn point_at(&self, pos: usize) -> (f64, f64) {
        (self.coords.get(2 * pos), self.coords.get(2 * pos + 1))
    }

    pub(crate) const fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub(crate) const fn ensure_finished(&self) -> Result<(), IndexError> {
        if self.finished {
            Ok(())
        } else {
            Err(IndexError::NotFinished)
        }
    }

    /// Ids of all points inside the box, boundary inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn range(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Result<Vec<usize>, IndexError> {
        self.ensure_finished()?;
        let inside = |x: f64, y: f64| x >= min_x && x <= max_x && y >= min_y && y <= max_y;
        Ok(self.collect_where(inside, |axis, value| {
            if axis == 0 {
                (min_x <= value, max_x >= value)
            } else {
                (min_y <= value, max_y >= value)
            }
        }))
    }

    /// Ids of all points within planar Euclidean distance `r` of
    /// `(qx, qy)`, in stored units.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    pub fn within(&self, qx: f64, qy: f64, r: f64) -> Result<Vec<usize>, IndexError> {
        self.ensure_finished()?;
        let r2 = r * r;
        let inside = |x: f64, y: f64| {
            let dx = x - qx;
            let dy = y - qy;
            dx.mul_add(dx, dy * dy) <= r2
        };
        Ok(self.collect_where(inside, |axis, value| {
            let q = if axis == 0 { qx } else { qy };
            (q - r <= value, q + r >= value)
        }))
    }

    /// Shared stack-driven traversal for box-shaped queries.
    ///
    /// `descend(axis, split)` reports whether the query region reaches
    /// the lower and upper half of a node split at `split` on `axis`.
    fn collect_where(
        &self,
        inside: impl Fn(f64, f64) -> bool,
        descend: impl Fn(usize, f64) -> (bool, bool),
    ) -> Vec<usize> {
        let mut result = Vec::new();
        if self.num_items == 0 {
            return result;
        }
        let mut stack = vec![(0, self.num_items - 1, 0)];

        while let Some((left, right, axis)) = stack.pop() {
            if right - left <= self.node_size {
                for i in left..=right {
                    let (x, y) = self.point_at(i);
                    if inside(x, y) {
                        result.push(self.id_at(i));
                    }
                }
                continue;
            }

            let m = (left + right) / 2;
            let (x, y) = self.point_at(m);
            if inside(x, y) {
                result.push(self.id_at(m));
            }

            let split = if axis == 0 { x } else { y };
            let (lower, upper) = descend(axis, split);
            if lower {
                stack.push((left, m - 1, 1 - axis));
            }
            if upper {
                stack.push((m + 1, right, 1 - axis));
            }
        }

        result
    }

    /// Serialize into a single contiguous buffer.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFinished`] before [`finish`](Self::finish).
    // Capacity and node size were range-checked at construction.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> Result<Vec<u8>, IndexError> {
        self.ensure_finished()?;
        let ids_bytes = self.num_items * self.id_kind().byte_width();
        let padding = (8 - ids_bytes % 8) % 8;
        let mut out = Vec::with_capacity(
            HEADER_SIZE + ids_bytes + padding + self.num_items * 2 * self.coord_kind.byte_width(),
        );

        out.push(MAGIC);
        out.push((VERSION << 4) | self.coord_kind.tag());
        out.extend((self.node_size as u16).to_le_bytes());
        out.extend((self.num_items as u32).to_le_bytes());
        self.ids.write_le(&mut out);
        out.resize(out.len() + padding, 0);
        self.coords.write_le(&mut out);
        Ok(out)
    }

    /// Reconstruct a finished index from [`to_bytes`](Self::to_bytes)
    /// output without repeating the sort.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidBuffer`] for a bad magic byte,
    /// version, node size, payload length, or an id outside
    /// `0..num_items`, and
    /// [`IndexError::UnsupportedBufferKind`] for an unknown coordinate
    /// kind tag.
    pub fn from_bytes(data: &[u8]) -> Result<Self, IndexError> {
        let Some(header) = data.get(..HEADER_SIZE) else {
            return Err(IndexError::InvalidBuffer(format!(
                "expected at least {HEADER_SIZE} header bytes, got {}",
                data.len()
            )));
        };
        if header[0] != MAGIC {
            return Err(IndexError::InvalidBuffer(
                "data does not appear to be in a KDBush format".to_owned(),
            ));
        }
        let version = header[1] >> 4;
        if version != VERSION {
            return Err(IndexError::InvalidBuffer(format!(
                "got v{version} data when expected v{VERSION}"
            )));
        }
        let coord_kind = CoordKind::from_tag(header[1] & 0x0f)?;
        let node_size = usize::from(u16::from_le_bytes([header[2], header[3]]));
        if node_size < MIN_NODE_SIZE {
            return Err(IndexError::InvalidBuffer(format!(
                "node size {node_size} is below the minimum of {MIN_NODE_SIZE}"
            )));
        }
        let num_items = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let id_kind = IdKind::for_capacity(num_items);
        let ids_bytes = num_items * id_kind.byte_width();
        let padding = (8 - ids_bytes % 8) % 8;
        let coords_start = HEADER_SIZE + ids_bytes + padding;
        let coords_bytes = num_items * 2 * coord_kind.byte_width();
        if data.len() != coords_start + coords_bytes {
            return Err(IndexError::InvalidBuffer(format!(
                "expected {} bytes for {num_items} items, got {}",
                coords_start + coords_bytes,
                data.len()
            )));
        }

        let ids = IdBuffer::read_le(id_kind, &data[HEADER_SIZE..HEADER_SIZE + ids_bytes]);
        if let Some(id) = (0..num_items).map(|i| ids.get(i)).find(|&id| id >= num_items) {
            return Err(IndexError::InvalidBuffer(format!(
                "id {id} out of range for {num_items} items"
            )));
        }
        let coords = CoordBuffer::read_le(coord_kind, &data[coords_start..]);
        let extent = compute_extent(&coords, num_items);

        Ok(Self {
            num_items,
            node_size,
            coord_kind,
            ids,
            coords,
            pos: num_items,
            finished: true,
            extent,
        })
    }
}

fn compute_extent(coords: &CoordBuffer, num_items: usize) -> Option<Extent> {
    (0..num_items).fold(None, |acc, i| {
        let x = coords.get(2 * i);
        let y = coords.get(2 * i + 1);
        Some(match acc {
            None => Extent {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
            Some(e) => Extent {
                min_x: e.min_x.min(x),
                min_y: e.min_y.min(y),
                max_x: e.max_x.max(x),
                max_y: e.max_y.max(y),
            },
        })
    })
}

/// Recursively partition `left..=right` around its median on `axis`.
fn sort(
    ids: &mut IdBuffer,
    coords: &mut CoordBuffer,
    node_size: usize,
    left: usize,
    right: usize,
    axis: usize,
) {
    if right - left <= node_size {
        return;
    }
    let m = (left + right) / 2;
    select(ids, coords, m, left, right, axis);
    sort(ids, coords, node_size, left, m - 1, 1 - axis);
    sort(ids, coords, node_size, m + 1, right, 1 - axis);
}

/// Floyd-Rivest selection: rearrange `left..=right` so that position `k`
/// holds the value that would be there if the range were sorted on `axis`,
/// with no larger value before it and no smaller value after it.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn select(
    ids: &mut IdBuffer,
    coords: &mut CoordBuffer,
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    while right > left {
        if right - left > SELECT_SAMPLE_THRESHOLD {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = n.ln();
            let s = 0.5 * (2.0 * z / 3.0).exp();
            let sign = if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 };
            let sd = 0.5 * (z * s * (n - s) / n).sqrt() * sign;
            let new_left = left.max((k as f64 - m * s / n + sd).floor().max(0.0) as usize);
            let new_right = right.min((k as f64 + (n - m) * s / n + sd).floor().max(0.0) as usize);
            select(ids, coords, k, new_left, new_right, axis);
        }

        let t = coords.get(2 * k + axis);
        let mut i = left;
        let mut j = right;

        swap_item(ids, coords, left, k);
        if coords.get(2 * right + axis) > t {
            swap_item(ids, coords, left, right);
        }

        while i < j {
            swap_item(ids, coords, i, j);
            i += 1;
            j -= 1;
            while coords.get(2 * i + axis) < t {
                i += 1;
            }
            while coords.get(2 * j + axis) > t {
                j -= 1;
            }
        }

        if coords.get(2 * left + axis) == t {
            swap_item(ids, coords, left, j);
        } else {
            j += 1;
            swap_item(ids, coords, j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            if j == 0 {
                break;
            }
            right = j - 1;
        }
    }
}

fn swap_item(ids: &mut IdBuffer, coords: &mut CoordBuffer, i: usize, j: usize) {
    ids.swap(i, j);
    coords.swap(2 * i, 2 * j);
    coords.swap(2 * i + 1, 2 * j + 1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

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

    /// Deterministic pseudo-random points (xorshift) for larger trees.
    fn scattered(n: usize) -> Vec<[f64; 2]> {
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit
        };
        (0..n)
            .map(|_| [next().mul_add(360.0, -180.0), next().mul_add(170.0, -85.0)])
            .collect()
    }

    #[test]
    fn builds_a_permutation_of_ids() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let mut ids = index.ids();
        ids.sort_unstable();
        assert_eq!(ids, (0..POINTS.len()).collect::<Vec<_>>());
        assert_eq!(index.coords().len(), POINTS.len() * 2);
    }

    #[test]
    fn coords_follow_their_ids() {
        let index = build(&POINTS, 2);
        for (pos, id) in index.ids().into_iter().enumerate() {
            let (x, y) = index.point_at(pos);
            assert_eq!([x, y], POINTS[id]);
        }
    }

    #[test]
    fn add_returns_sequential_ids() {
        let mut index = KdBush::new(3).unwrap();
        assert_eq!(index.add(0.0, 0.0).unwrap(), 0);
        assert_eq!(index.add(1.0, 0.0).unwrap(), 1);
        assert_eq!(index.add(2.0, 0.0).unwrap(), 2);
    }

    #[test]
    fn finish_with_wrong_count_fails() {
        let mut index = KdBush::new(POINTS.len()).unwrap();
        index.add(0.0, 0.0).unwrap();
        assert_eq!(
            index.finish(),
            Err(IndexError::CountMismatch {
                added: 1,
                expected: 8
            })
        );
    }

    #[test]
    fn add_after_finish_fails() {
        let mut index = build(&POINTS, DEFAULT_NODE_SIZE);
        assert_eq!(index.add(5.0, 5.0), Err(IndexError::AlreadyFinished));
        assert_eq!(index.finish(), Err(IndexError::AlreadyFinished));
    }

    #[test]
    fn add_beyond_capacity_fails() {
        let mut index = KdBush::new(1).unwrap();
        index.add(0.0, 0.0).unwrap();
        assert!(matches!(
            index.add(1.0, 1.0),
            Err(IndexError::CountMismatch { expected: 1, .. })
        ));
    }

    #[test]
    fn queries_before_finish_fail() {
        let index = KdBush::new(1).unwrap();
        assert_eq!(index.range(0.0, 0.0, 1.0, 1.0), Err(IndexError::NotFinished));
        assert_eq!(index.to_bytes(), Err(IndexError::NotFinished));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let too_many = u32::MAX as usize + 1;
        assert_eq!(
            KdBush::new(too_many),
            Err(IndexError::InvalidCapacity(too_many))
        );
    }

    #[test]
    fn float32_storage() {
        let mut index = KdBush::with_options(POINTS.len(), 64, CoordKind::Float32).unwrap();
        for p in POINTS {
            index.add(p[0], p[1]).unwrap();
        }
        index.finish().unwrap();
        assert_eq!(index.coord_kind(), CoordKind::Float32);
        assert_eq!(index.range(0.0, 0.0, 1.0, 1.0).unwrap().len(), 4);
    }

    #[test]
    fn id_width_follows_capacity() {
        assert_eq!(KdBush::new(8).unwrap().id_kind(), IdKind::U16);
        assert_eq!(KdBush::new(70_000).unwrap().id_kind(), IdKind::U32);
    }

    #[test]
    fn node_size_is_clamped() {
        assert_eq!(KdBush::with_options(4, 0, CoordKind::Float64).unwrap().node_size(), 2);
    }

    #[test]
    fn empty_index_finishes_and_answers_nothing() {
        let mut index = KdBush::new(0).unwrap();
        index.finish().unwrap();
        assert!(index.is_empty());
        assert!(index.range(-1.0, -1.0, 1.0, 1.0).unwrap().is_empty());
        assert!(index.within(0.0, 0.0, 10.0).unwrap().is_empty());
    }

    #[test]
    fn range_is_boundary_inclusive() {
        let index = build(&POINTS, 2);
        let mut found = index.range(0.0, 0.0, 1.0, 1.0).unwrap();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 4, 5]);
    }

    #[test]
    fn range_matches_brute_force_on_large_input() {
        let points = scattered(2_000);
        let index = build(&points, 16);
        let (min_x, min_y, max_x, max_y) = (-20.0, -10.0, 40.0, 30.0);

        let mut found = index.range(min_x, min_y, max_x, max_y).unwrap();
        found.sort_unstable();
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p[0] >= min_x && p[0] <= max_x && p[1] >= min_y && p[1] <= max_y)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn within_matches_brute_force_on_large_input() {
        let points = scattered(2_000);
        let index = build(&points, 16);
        let (qx, qy, r) = (10.0, 5.0, 25.0);

        let mut found = index.within(qx, qy, r).unwrap();
        found.sort_unstable();
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[0] - qx).hypot(p[1] - qy) <= r)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn bytes_reconstruct_identical_index() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let bytes = index.to_bytes().unwrap();
        let restored = KdBush::from_bytes(&bytes).unwrap();

        assert_eq!(restored.ids(), index.ids());
        assert_eq!(restored.coords(), index.coords());
        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.node_size(), index.node_size());
        assert!(restored.is_finished());
    }

    #[test]
    fn bytes_header_layout() {
        let index = build(&POINTS, DEFAULT_NODE_SIZE);
        let bytes = index.to_bytes().unwrap();
        assert_eq!(bytes[0], 0xdb);
        assert_eq!(bytes[1], 0x18);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 64);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 8);
        // 8 header + 16 ids (already 8-aligned) + 128 coords.
        assert_eq!(bytes.len(), 8 + 16 + 128);
    }

    #[test]
    fn reconstructed_large_index_answers_identically() {
        let points = scattered(70_000);
        let index = build(&points, 64);
        let restored = KdBush::from_bytes(&index.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.id_kind(), IdKind::U32);
        assert_eq!(
            restored.range(0.0, 0.0, 5.0, 5.0).unwrap(),
            index.range(0.0, 0.0, 5.0, 5.0).unwrap()
        );
    }

    #[test]
    fn from_bytes_rejects_bad_magic() {
        let mut bytes = build(&POINTS, 64).to_bytes().unwrap();
        bytes[0] = 0x00;
        assert!(matches!(
            KdBush::from_bytes(&bytes),
            Err(IndexError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn from_bytes_rejects_unknown_kind() {
        let mut bytes = build(&POINTS, 64).to_bytes().unwrap();
        bytes[1] = (1 << 4) | 3;
        assert_eq!(
            KdBush::from_bytes(&bytes),
            Err(IndexError::UnsupportedBufferKind(3))
        );
    }

    #[test]
    fn from_bytes_rejects_truncated_payload() {
        let bytes = build(&POINTS, 64).to_bytes().unwrap();
        assert!(matches!(
            KdBush::from_bytes(&bytes[..bytes.len() - 1]),
            Err(IndexError::InvalidBuffer(_))
        ));
        assert!(matches!(
            KdBush::from_bytes(&bytes[..4]),
            Err(IndexError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn from_bytes_rejects_out_of_range_id() {
        let mut bytes = build(&POINTS, 64).to_bytes().unwrap();
        // First id slot; 8 items use 16-bit ids.
        bytes[HEADER_SIZE..HEADER_SIZE + 2].copy_from_slice(&8u16.to_le_bytes());
        assert_eq!(
            KdBush::from_bytes(&bytes),
            Err(IndexError::InvalidBuffer("id 8 out of range for 8 items".to_owned()))
        );
    }
}
