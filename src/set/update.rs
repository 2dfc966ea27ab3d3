//! The recursive `update` algorithm: insert sorted additions, filter
//! existing decorations over a window, rebalance.

use smallvec::SmallVec;

use crate::decoration::Decoration;
use crate::set::node::Node;
use crate::set::rebalance::rebalance_children;
use crate::set::{sorted_smallvec, DecorationSet, Filter};

/// `additions` are sorted by `(from, desc.bias)` and given in the
/// coordinate frame of `set` (i.e. relative to the start of `set`, which
/// sits at absolute offset `base`). `filter_from`/`filter_to` are in the
/// same absolute frame as `base`.
pub(crate) fn update_node(
    set: &DecorationSet,
    base: i64,
    additions: &[Decoration],
    filter: Option<&Filter<'_>>,
    filter_from: i64,
    filter_to: i64,
) -> DecorationSet {
    let node = set.node();
    let length = node.length;

    // 1. Local filter pass.
    let mut local: Option<Vec<Decoration>> = None;
    if let Some(f) = filter {
        for (i, d) in node.local.iter().enumerate() {
            let abs_from = base + d.from as i64;
            let abs_to = base + d.to as i64;
            if abs_to < filter_from || abs_from > filter_to {
                continue;
            }
            if !f(abs_from as usize, abs_to as usize, &d.desc) {
                local.get_or_insert_with(|| node.local[..i].to_vec());
                continue;
            }
            if let Some(l) = local.as_mut() {
                l.push(d.clone());
            }
        }
    }
    let mut local: Vec<Decoration> = local.unwrap_or_else(|| node.local.to_vec());

    if node.is_leaf() && additions.is_empty() {
        if filter.is_none() {
            return set.clone();
        }
        local.sort_by_key(|d| d.sort_key());
        return DecorationSet::from_node(Node {
            length,
            size: local.len(),
            local: local.into(),
            children: SmallVec::new(),
        });
    }

    let child_size = Node::child_size(set.size().max(1));

    // 2. Distribute additions to children.
    let mut children: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    let mut child_offset: usize = 0;
    let mut add_idx = 0usize;

    for child in set.children() {
        let child_base_abs = base + child_offset as i64;
        let child_end_abs = child_base_abs + child.len() as i64;

        // Gather additions whose absolute `from` falls within this child's
        // span and whose `to` also fits (the rest escape to parent local).
        let mut group: Vec<Decoration> = Vec::new();
        let mut idx = add_idx;
        while idx < additions.len() {
            let d = &additions[idx];
            let abs_from = base + d.from as i64;
            if abs_from >= child_end_abs {
                break;
            }
            let abs_to = base + d.to as i64;
            if abs_to > child_end_abs {
                // Escapes into the parent's local list, in this node's
                // coordinates.
                let local_from = (abs_from - base) as usize;
                let local_to = (abs_to - base) as usize;
                local.push(Decoration::from_parts(local_from, local_to, d.desc.clone()));
                idx += 1;
                continue;
            }
            group.push(Decoration::from_parts(
                (abs_from - child_base_abs) as usize,
                (abs_to - child_base_abs) as usize,
                d.desc.clone(),
            ));
            idx += 1;
        }
        add_idx = idx;

        let filter_touches = filter.is_some()
            && filter_from < child_end_abs
            && filter_to > child_base_abs;

        let new_child = if group.is_empty() && !filter_touches {
            child.clone()
        } else {
            update_node(
                child,
                child_base_abs,
                &group,
                filter,
                filter_from,
                filter_to,
            )
        };
        children.push(new_child);
        child_offset += child.len();
    }

    // 3. Tail additions: from this point `add_idx..` are all positioned at
    // or past the end of the last existing child (or there were no
    // children at all). Chunk them into fresh leaves.
    if add_idx < additions.len() {
        let tail = &additions[add_idx..];
        let mut new_children = append_decorations(tail, child_offset, child_size, &mut local);
        children.append(&mut new_children);
    }

    local.sort_by_key(|d| d.sort_key());

    let size = local.len() + children.iter().map(|c| c.size()).sum::<usize>();

    // 4. Leaf collapse.
    if size <= crate::set::BASE_NODE_SIZE {
        let mut collected = local;
        let mut offset = 0usize;
        for c in &children {
            c.collect_into(offset, &mut collected);
            offset += c.len();
        }
        collected.sort_by_key(|d| d.sort_key());
        return DecorationSet::from_node(Node {
            length,
            size: collected.len(),
            local: sorted_smallvec(collected),
            children: SmallVec::new(),
        });
    }

    // 5. Rebalance.
    let (local, children) = rebalance_children(local, children, child_size);
    let size = local.len() + children.iter().map(|c| c.size()).sum::<usize>();

    DecorationSet::from_node(Node {
        length,
        size,
        local: sorted_smallvec(local),
        children,
    })
}

/// Chunk `tail` additions (already sorted, all positioned at or past
/// `start_offset` in this node's coordinates) into fresh leaf children of
/// at most `child_size` decorations each. An addition whose `to` would
/// exceed the chunk's span escapes into `local` instead of forcing the
/// chunk wider.
fn append_decorations(
    tail: &[Decoration],
    start_offset: usize,
    child_size: usize,
    local: &mut Vec<Decoration>,
) -> SmallVec<[DecorationSet; 2]> {
    let mut out: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    let mut i = 0usize;
    let mut chunk_start = start_offset;

    while i < tail.len() {
        let mut chunk: Vec<Decoration> = Vec::new();
        let mut chunk_end = chunk_start;
        let mut count = 0usize;

        while i < tail.len() && count < child_size {
            let d = &tail[i];
            chunk.push(d.clone());
            chunk_end = chunk_end.max(d.to);
            i += 1;
            count += 1;
        }

        if chunk.is_empty() {
            break;
        }

        // Any addition in this chunk whose `to` reaches past the `from` of
        // the first addition belonging to the *next* chunk escapes to
        // local instead of being force-fit (prevents negative/overlapping
        // child coordinates).
        let next_from = tail.get(i).map(|d| d.from);
        if let Some(next_from) = next_from {
            let mut kept = Vec::with_capacity(chunk.len());
            for d in chunk {
                if d.to > next_from {
                    local.push(Decoration::from_parts(
                        chunk_start + d.from,
                        chunk_start + d.to,
                        d.desc.clone(),
                    ));
                } else {
                    kept.push(d);
                }
            }
            chunk = kept;
        }

        if chunk.is_empty() {
            chunk_start = next_from.unwrap_or(chunk_end);
            continue;
        }

        // The child's span runs from the running contiguous offset
        // (`chunk_start`, i.e. where the previous chunk left off) through
        // the last kept addition's end — NOT from this chunk's first
        // addition — so children keep tiling the parent with no gaps,
        // even when there's dead space before the first decoration.
        let span_end = chunk.iter().map(|d| d.to).max().unwrap();
        let mut rel: Vec<Decoration> = chunk
            .iter()
            .map(|d| d.moved(-(chunk_start as i64)))
            .collect();
        rel.sort_by_key(|d| d.sort_key());
        let len = span_end - chunk_start;
        out.push(DecorationSet::from_node(Node {
            length: len,
            size: rel.len(),
            local: rel.into(),
            children: SmallVec::new(),
        }));
        chunk_start = span_end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::RangeSpec;

    #[test]
    fn update_on_empty_builds_sorted_local() {
        let set = DecorationSet::empty();
        let additions = vec![
            Decoration::range(10, 20, RangeSpec::new()).unwrap(),
            Decoration::range(0, 5, RangeSpec::new()).unwrap(),
        ];
        let updated = set.update(additions);
        assert_eq!(updated.size(), 2);
        assert_eq!(updated.len(), 20);
        assert_eq!(updated.local_at(0).unwrap().from, 0);
        assert_eq!(updated.local_at(1).unwrap().from, 10);
    }

    #[test]
    fn filter_drops_matching_decorations() {
        let set = DecorationSet::of([
            Decoration::range(0, 5, RangeSpec::new()).unwrap(),
            Decoration::range(10, 15, RangeSpec::new()).unwrap(),
        ]);
        let filtered = set.filter(&|from, _to, _desc| from != 0, 0, 15);
        assert_eq!(filtered.size(), 1);
    }

    #[test]
    fn leaf_collapses_when_size_grows_past_threshold_then_shrinks_back() {
        let mut set = DecorationSet::empty();
        let additions: Vec<Decoration> = (0..40)
            .map(|i| Decoration::range(i * 10, i * 10 + 5, RangeSpec::new()).unwrap())
            .collect();
        set = set.update(additions);
        assert_eq!(set.size(), 40);
        assert!(
            !set.children().is_empty(),
            "a 40-decoration set should split into children"
        );

        let filtered = set.filter(&|from, _to, _desc| (from / 10) % 2 == 0, 0, set.len());
        assert_eq!(filtered.size(), 20);
        assert!(
            filtered.children().is_empty(),
            "a 20-decoration set should collapse back to a flat leaf"
        );
    }
}
