use smallvec::SmallVec;

use crate::decoration::Decoration;
use crate::set::node::{Node, BASE_NODE_SIZE};
use crate::set::DecorationSet;

/// Drop any child with `size == 0`: if it still carries length, donate
/// that length to the previous surviving sibling (if any — a leading
/// empty child with nonzero length can't donate backwards, so it's kept
/// as a placeholder).
pub(crate) fn drop_empty_children(
    children: SmallVec<[DecorationSet; 2]>,
) -> SmallVec<[DecorationSet; 2]> {
    let mut out: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    for child in children {
        if child.size() == 0 {
            if child.len() == 0 {
                continue;
            }
            if let Some(prev) = out.last_mut() {
                *prev = prev.grow(child.len());
                continue;
            }
        }
        out.push(child);
    }
    out
}

/// Pairwise-join adjacent small leaf siblings into one flat leaf: a run of
/// leaves whose combined size still fits `BASE_NODE_SIZE` is flattened
/// into a single new leaf. Any parent-local decoration that now falls
/// entirely inside the merged span is reparented into it. Non-leaf
/// children are left untouched — joining is a leaf-only operation, never a
/// flattening of an internal child's own structure.
fn join_small_leaf_siblings(
    children: SmallVec<[DecorationSet; 2]>,
    local: &mut Vec<Decoration>,
) -> SmallVec<[DecorationSet; 2]> {
    let mut out: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    let mut cursor = 0usize;
    let mut i = 0usize;
    while i < children.len() {
        let child = &children[i];
        if !child.node().is_leaf() {
            out.push(child.clone());
            cursor += child.len();
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut combined_size = child.size();
        while j < children.len() && children[j].node().is_leaf() {
            let next_size = children[j].size();
            if combined_size + next_size > BASE_NODE_SIZE {
                break;
            }
            combined_size += next_size;
            j += 1;
        }
        if j == i + 1 {
            out.push(child.clone());
            cursor += child.len();
            i += 1;
            continue;
        }
        let group_start = cursor;
        let mut merged: Vec<Decoration> = Vec::new();
        let mut merged_len = 0usize;
        for c in &children[i..j] {
            c.collect_into(merged_len, &mut merged);
            merged_len += c.len();
        }
        let group_end = group_start + merged_len;
        local.retain(|d| {
            if d.from >= group_start && d.to <= group_end {
                merged.push(d.moved(-(group_start as i64)));
                false
            } else {
                true
            }
        });
        merged.sort_by_key(|d| d.sort_key());
        let merged_size = merged.len();
        out.push(DecorationSet::from_node(Node {
            length: merged_len,
            size: merged_size,
            local: merged.into(),
            children: SmallVec::new(),
        }));
        cursor = group_end;
        i = j;
    }
    out
}

/// Nest a maximal run of adjacent siblings — leaf or internal — whose
/// combined size fits `child_size` under one new internal node, without
/// flattening any sibling's own structure. This is what actually bounds a
/// node's fan-out: unlike joining, it applies regardless of whether the
/// siblings being grouped are leaves, so a long run of small internal
/// children (left behind by joining, or by a filter that hollowed them
/// out) still gets folded under an intermediate level instead of being
/// carried as direct children forever.
fn group_small_sibling_runs(
    children: SmallVec<[DecorationSet; 2]>,
    child_size: usize,
    local: &mut Vec<Decoration>,
) -> SmallVec<[DecorationSet; 2]> {
    let mut out: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    let mut cursor = 0usize;
    let mut i = 0usize;
    while i < children.len() {
        let child = &children[i];
        let mut j = i + 1;
        let mut combined_size = child.size();
        while j < children.len() {
            let next_size = children[j].size();
            if combined_size + next_size > child_size {
                break;
            }
            combined_size += next_size;
            j += 1;
        }
        if j == i + 1 {
            out.push(child.clone());
            cursor += child.len();
            i += 1;
            continue;
        }
        let group_start = cursor;
        let mut group_len = 0usize;
        let mut grouped_children: SmallVec<[DecorationSet; 2]> = SmallVec::new();
        for c in &children[i..j] {
            grouped_children.push(c.clone());
            group_len += c.len();
        }
        let group_end = group_start + group_len;
        let mut grouped_local: Vec<Decoration> = Vec::new();
        local.retain(|d| {
            if d.from >= group_start && d.to <= group_end {
                grouped_local.push(d.moved(-(group_start as i64)));
                false
            } else {
                true
            }
        });
        grouped_local.sort_by_key(|d| d.sort_key());
        let size =
            grouped_local.len() + grouped_children.iter().map(|c| c.size()).sum::<usize>();
        out.push(DecorationSet::from_node(Node {
            length: group_len,
            size,
            local: grouped_local.into(),
            children: grouped_children,
        }));
        cursor = group_end;
        i = j;
    }
    out
}

/// Rebalance a node's children after an update: drop/donate empties, join
/// small leaf runs flat, then nest any remaining run of small siblings
/// (leaf or internal) under an intermediate node so fan-out stays bounded.
pub(crate) fn rebalance_children(
    mut local: Vec<Decoration>,
    children: SmallVec<[DecorationSet; 2]>,
    child_size: usize,
) -> (Vec<Decoration>, SmallVec<[DecorationSet; 2]>) {
    let children = drop_empty_children(children);
    let joined = join_small_leaf_siblings(children, &mut local);
    let grouped = group_small_sibling_runs(joined, child_size, &mut local);
    (local, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::RangeSpec;
    use crate::set::DecorationSet;

    fn leaf(from: usize, to: usize, len: usize) -> DecorationSet {
        let d = Decoration::range(from, to, RangeSpec::new()).unwrap();
        DecorationSet::from_node(Node {
            length: len,
            size: 1,
            local: smallvec::smallvec![d],
            children: SmallVec::new(),
        })
    }

    #[test]
    fn small_leaf_runs_join_flat() {
        let children: SmallVec<[DecorationSet; 2]> = (0..5).map(|_| leaf(0, 1, 2)).collect();
        let (local, out) = rebalance_children(Vec::new(), children, 32);
        assert!(local.is_empty());
        assert_eq!(out.len(), 1);
        assert!(out[0].node().is_leaf());
        assert_eq!(out[0].size(), 5);
    }

    #[test]
    fn internal_children_are_nested_not_flattened_when_small() {
        let inner_a = leaf(0, 1, 2);
        let inner_b = leaf(0, 1, 2);
        let internal = DecorationSet::from_node(Node {
            length: 4,
            size: 2,
            local: SmallVec::new(),
            children: smallvec::smallvec![inner_a, inner_b],
        });
        let other = leaf(0, 1, 2);
        let children: SmallVec<[DecorationSet; 2]> =
            smallvec::smallvec![internal.clone(), other.clone()];

        let (_, out) = rebalance_children(Vec::new(), children, 32);
        // Grouped under one new node; the internal child's own two-child
        // structure is preserved, not flattened into a leaf.
        assert_eq!(out.len(), 1);
        assert!(!out[0].node().is_leaf());
        assert_eq!(out[0].children().len(), 2);
    }
}
