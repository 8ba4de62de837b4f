//! Errors raised while building, querying, or decoding a spatial index.

/// Errors that can occur while working with a [`KdBush`](crate::KdBush).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// The requested item count cannot be stored in the index header.
    #[error("unexpected number of items: {0}")]
    InvalidCapacity(usize),

    /// A serialized index names a coordinate storage kind this crate
    /// does not implement.
    #[error("unsupported coordinate buffer kind tag: {0}")]
    UnsupportedBufferKind(u8),

    /// `finish` was called after a different number of `add` calls than
    /// the declared capacity, or `add` overflowed the capacity.
    #[error("added {added} items when expected {expected}")]
    CountMismatch {
        /// Number of points added so far.
        added: usize,
        /// Capacity declared at construction.
        expected: usize,
    },

    /// The index was already finished; it cannot accept further points
    /// or be finished again.
    #[error("index is already finished")]
    AlreadyFinished,

    /// The index must be finished before it can be queried or serialized.
    #[error("index has not been finished")]
    NotFinished,

    /// A serialized buffer is truncated or carries a bad header.
    #[error("invalid index buffer: {0}")]
    InvalidBuffer(String),
}
