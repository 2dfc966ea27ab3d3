use smallvec::SmallVec;

use crate::decoration::Decoration;
use crate::set::DecorationSet;

/// The target size `BASE_NODE_SIZE` and the point below which a node
/// collapses into a flat leaf.
pub(crate) const BASE_NODE_SIZE: usize = 32;

/// One node of the persistent tree. `local` is sorted by
/// `(from, desc.bias)` and stored in node-local coordinates; `children`
/// are ordered, disjoint, adjacent sub-intervals starting at node offset
/// 0.
#[derive(Debug)]
pub(crate) struct Node {
    pub length: usize,
    pub size: usize,
    pub local: SmallVec<[Decoration; 4]>,
    pub children: SmallVec<[DecorationSet; 2]>,
}

impl Node {
    pub(crate) fn empty() -> Node {
        Node {
            length: 0,
            size: 0,
            local: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The target size of a child subtree when this node's total size
    /// grows past `BASE_NODE_SIZE`.
    pub(crate) fn child_size(size: usize) -> usize {
        (size / BASE_NODE_SIZE).max(BASE_NODE_SIZE)
    }

    pub(crate) fn recompute_size(&self) -> usize {
        self.local.len() + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}
