//! terragraph-index: Static spatial index for geographic points (sans-IO).
//!
//! Provides the building blocks for proximity queries over
//! `(longitude, latitude)` pairs:
//!
//! - [`TinyQueue`]: comparator-driven binary min-heap.
//! - [`KdBush`]: flattened, immutable k-d tree with planar range and
//!   radius queries plus a compact serialized form.
//! - [`around`]: great-circle nearest-neighbor search over a [`KdBush`],
//!   correct across the antimeridian.
//!
//! The index is built once (`add` every point, then `finish`) and is
//! read-only afterwards, so a finished [`KdBush`] can be shared between
//! threads freely.

pub mod around;
pub mod distance;
pub mod error;
pub mod kdbush;
pub mod queue;

pub use around::{AroundOptions, around, around_with, great_circle_km};
pub use error::IndexError;
pub use kdbush::{CoordKind, DEFAULT_NODE_SIZE, IdKind, KdBush};
pub use queue::TinyQueue;
