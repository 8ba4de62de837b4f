//! Binary min-heap ordered by a caller-supplied comparator.
//!
//! [`TinyQueue`] backs the best-first traversal in [`crate::around`].
//! Unlike [`std::collections::BinaryHeap`] it is a *min*-heap and takes
//! the ordering as a closure, so items that are not `Ord` (for example
//! anything keyed on an `f64` distance) can be queued without a wrapper
//! type.
//!
//! Items that compare equal are popped in an unspecified order.

use std::cmp::Ordering;

/// A binary min-heap parameterized by a comparator.
///
/// The item for which the comparator reports [`Ordering::Less`] against
/// every other item is the one returned by [`peek`](Self::peek) and
/// [`pop`](Self::pop).
pub struct TinyQueue<T, F = fn(&T, &T) -> Ordering> {
    data: Vec<T>,
    compare: F,
}

impl<T: Ord> TinyQueue<T> {
    /// Create an empty queue using the natural ordering of `T`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(T::cmp)
    }
}

impl<T: Ord> Default for TinyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> TinyQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Create an empty queue ordered by `compare`.
    #[must_use]
    pub const fn with_comparator(compare: F) -> Self {
        Self {
            data: Vec::new(),
            compare,
        }
    }

    /// Build a queue from existing items in O(n).
    #[must_use]
    pub fn from_vec(data: Vec<T>, compare: F) -> Self {
        let mut queue = Self { data, compare };
        for pos in (0..queue.data.len() / 2).rev() {
            queue.down(pos);
        }
        queue
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Add an item.
    pub fn push(&mut self, item: T) {
        self.data.push(item);
        self.up(self.data.len() - 1);
    }

    /// Remove and return the minimum item, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.data.len().checked_sub(1)?;
        self.data.swap(0, last);
        let top = self.data.pop();
        if !self.data.is_empty() {
            self.down(0);
        }
        top
    }

    /// The minimum item without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.data[a], &self.data[b]) == Ordering::Less
    }

    fn up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.data.swap(pos, parent);
            pos = parent;
        }
    }

    fn down(&mut self, mut pos: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let best = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(best, pos) {
                break;
            }
            self.data.swap(pos, best);
            pos = best;
        }
    }
}

impl<T: std::fmt::Debug, F> std::fmt::Debug for TinyQueue<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinyQueue")
            .field("len", &self.data.len())
            .field("top", &self.data.first())
            .finish()
    }
}
