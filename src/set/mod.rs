//! The persistent decoration tree and its public operations.

mod map;
mod node;
mod rebalance;
mod update;

use std::rc::Rc;

use smallvec::SmallVec;

use crate::change::ChangeSet;
use crate::decoration::Decoration;

pub(crate) use node::{Node, BASE_NODE_SIZE};

/// An immutable, persistent tree indexing decorations by position. Cheap
/// to clone (an `Rc` bump); every mutating-looking operation returns a new
/// `DecorationSet`, structure-shared with `self` wherever unchanged.
#[derive(Debug, Clone)]
pub struct DecorationSet(Rc<Node>);

/// `filter(from, to, desc)` — invoked on every existing decoration whose
/// interval intersects the update's filter window, in absolute
/// coordinates. Returning `false` drops it.
pub type Filter<'a> = dyn Fn(usize, usize, &crate::desc::DecorationDesc) -> bool + 'a;

impl DecorationSet {
    /// The sentinel zero-length, zero-size set.
    pub fn empty() -> DecorationSet {
        DecorationSet(Rc::new(Node::empty()))
    }

    /// Build a set from a single decoration or an unsorted batch, by
    /// delegating to `update` on `empty`.
    pub fn of(decorations: impl IntoIterator<Item = Decoration>) -> DecorationSet {
        DecorationSet::empty().update(decorations.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.length
    }

    pub fn is_empty(&self) -> bool {
        self.0.length == 0
    }

    pub fn size(&self) -> usize {
        self.0.size
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    pub(crate) fn from_node(node: Node) -> DecorationSet {
        DecorationSet(Rc::new(node))
    }

    pub(crate) fn children(&self) -> &[DecorationSet] {
        &self.0.children
    }

    pub(crate) fn local(&self) -> &[Decoration] {
        &self.0.local
    }

    pub fn local_len(&self) -> usize {
        self.0.local.len()
    }

    pub fn local_at(&self, index: usize) -> Option<&Decoration> {
        self.0.local.get(index)
    }

    /// Add `additions` and/or drop decorations matching a filter, over
    /// `[filter_from, filter_to)`. `additions` may be unsorted; a sorted
    /// copy is taken internally. When nothing changes, returns `self`
    /// (structural sharing, no new allocation).
    pub fn update(&self, additions: Vec<Decoration>) -> DecorationSet {
        self.update_filtered(additions, None, 0, self.len())
    }

    /// Drop every decoration intersecting `[from, to)` for which `filter`
    /// returns `false`; decorations outside the window are preserved
    /// without calling `filter`.
    pub fn filter(&self, filter: &Filter<'_>, from: usize, to: usize) -> DecorationSet {
        self.update_filtered(Vec::new(), Some(filter), from, to)
    }

    /// The full contract: add `additions` and drop anything `filter`
    /// rejects within `[filter_from, filter_to)`, in one pass.
    pub fn update_filtered(
        &self,
        mut additions: Vec<Decoration>,
        filter: Option<&Filter<'_>>,
        filter_from: usize,
        filter_to: usize,
    ) -> DecorationSet {
        if additions.is_empty() && filter.is_none() {
            return self.clone();
        }
        additions.sort_by_key(|d| d.sort_key());
        let max_to = additions.iter().map(|d| d.to).max().unwrap_or(0);
        let new_length = self.len().max(max_to);
        let base = if new_length > self.len() {
            self.grow(new_length - self.len())
        } else {
            self.clone()
        };
        update::update_node(
            &base,
            0,
            &additions,
            filter,
            filter_from as i64,
            filter_to as i64,
        )
    }

    /// Remap every decoration through `changes`, dropping any whose mapped
    /// interval is no longer valid.
    pub fn map(&self, changes: &ChangeSet) -> DecorationSet {
        if changes.is_empty() || self.size() == 0 {
            return self.clone();
        }
        let new_end = changes.map_pos(self.len(), 1);
        // Escapees still outstanding at the root mapped outside the
        // document entirely; dropped, not an error.
        let (new_root, _escaped) = map::map_node(self, 0, 0, new_end, changes);
        new_root
    }

    /// Extend `length` by `delta`, keeping the same contents. Used to
    /// absorb length donated by a dropped neighbor.
    pub fn grow(&self, delta: usize) -> DecorationSet {
        if delta == 0 {
            return self.clone();
        }
        DecorationSet(Rc::new(Node {
            length: self.0.length + delta,
            size: self.0.size,
            local: self.0.local.clone(),
            children: self.0.children.clone(),
        }))
    }

    /// Depth-first collection of every decoration in this subtree,
    /// translated by `offset` plus cumulative child offsets, appended to
    /// `target` in arbitrary order. Callers that need sorted output must
    /// sort afterwards (used by leaf collapse, which does).
    pub(crate) fn collect_into(&self, offset: usize, target: &mut Vec<Decoration>) {
        target.extend(self.0.local.iter().map(|d| d.moved(offset as i64)));
        let mut child_offset = offset;
        for child in &self.0.children {
            child.collect_into(child_offset, target);
            child_offset += child.len();
        }
    }

    /// All decorations in `[from, to)`, ordered by position. A thin
    /// convenience wrapper over `DecorationSetIter` for callers that want
    /// raw decorations rather than merged spans.
    pub fn decorations_in_range(&self, from: usize, to: usize) -> Vec<(usize, Decoration)> {
        let mut out = Vec::new();
        let mut iter = crate::iter::DecorationSetIter::new(self.clone());
        let mut skip = from;
        while let Some(mut local) = iter.next(skip) {
            skip = 0;
            while let Some(d) = local.current() {
                let abs_from = local.offset() + d.from;
                let abs_to = local.offset() + d.to;
                if abs_from >= to {
                    return out;
                }
                if abs_to > from {
                    out.push((local.offset(), d.clone()));
                }
                local.advance();
            }
        }
        out.sort_by(|a, b| {
            let da = &a.1;
            let db = &b.1;
            (a.0 + da.from, da.desc.bias()).cmp(&(b.0 + db.from, db.desc.bias()))
        });
        out
    }
}

pub(crate) fn sorted_smallvec(mut v: Vec<Decoration>) -> SmallVec<[Decoration; 4]> {
    v.sort_by_key(|d| d.sort_key());
    v.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::RangeSpec;

    #[test]
    fn empty_set_is_empty() {
        let s = DecorationSet::empty();
        assert_eq!(s.len(), 0);
        assert_eq!(s.size(), 0);
        assert!(s.children().is_empty());
        assert!(s.local().is_empty());
    }

    #[test]
    fn of_single_decoration() {
        let d = Decoration::range(5, 10, RangeSpec::new()).unwrap();
        let s = DecorationSet::of([d]);
        assert_eq!(s.size(), 1);
        assert_eq!(s.len(), 10);
    }
}
