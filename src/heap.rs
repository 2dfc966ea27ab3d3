//! The min-heap used by the spans builder to merge several sets' iterators
//! in position order: a closed sum type for the payload, plugged into
//! `std::collections::BinaryHeap<Reverse<_>>` via a custom `Ord` over just
//! the ordering key.

use std::cmp::Ordering;

use crate::decoration::Decoration;
use crate::iter::{DecorationSetIter, LocalSet};

/// One element waiting in the heap: either a cursor over a node's local
/// decorations (ordered by the absolute position of its current item), or
/// a decoration that has started and is waiting to end (ordered by its
/// absolute end).
pub(crate) enum Heapable {
    /// A cursor over one node's local list, plus the iterator that can
    /// produce the next node once this one is exhausted. Each input set
    /// owns exactly one of these, threaded through the heap by value.
    Cursor {
        local: LocalSet,
        iter: DecorationSetIter,
    },
    /// A decoration that has started and is waiting to end.
    Ending { id: u64 },
}

/// A decoration that is currently "active" (its start has been reached,
/// its end has not), tagged with a unique id so it can be removed from the
/// active list by identity rather than by structural equality.
#[derive(Clone)]
pub(crate) struct ActiveDecoration {
    pub id: u64,
    pub from: usize,
    pub to: usize,
    pub decoration: Decoration,
}

pub(crate) struct HeapEntry {
    pub heap_pos: usize,
    pub bias: i64,
    pub seq: u64,
    pub payload: Heapable,
}

impl HeapEntry {
    fn key(&self) -> (usize, i64, u64) {
        (self.heap_pos, self.bias, self.seq)
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}
