//! The recursive `map` algorithm: remap an entire set through a change
//! list, re-homing decorations whose owning node no longer fits them.

use smallvec::SmallVec;

use crate::change::ChangeSet;
use crate::decoration::Decoration;
use crate::set::node::Node;
use crate::set::DecorationSet;

/// Map `set`, whose content lives at old absolute offset `old_start` and
/// whose new absolute window is `[new_start, new_end)`, through `changes`.
/// Returns the remapped node plus any decorations that no longer fit
/// inside `[new_start, new_end)` ("escaped"), given in the *caller's*
/// absolute frame so the caller can re-home them.
pub(crate) fn map_node(
    set: &DecorationSet,
    old_start: usize,
    new_start: usize,
    new_end: usize,
    changes: &ChangeSet,
) -> (DecorationSet, Vec<Decoration>) {
    let node = set.node();
    let new_length = new_end - new_start;

    let mut new_local: Vec<Decoration> = Vec::new();
    let mut escaped: Vec<Decoration> = Vec::new();

    // 1. Map every local decoration.
    for d in node.local.iter() {
        let old_abs_from = old_start + d.from;
        let old_abs_to = old_start + d.to;
        let new_abs_from = changes.map_pos(old_abs_from, d.desc.bias());
        let new_abs_to = changes.map_pos(old_abs_to, d.desc.end_bias());

        if !d.spec_is_point() && new_abs_from >= new_abs_to {
            // Mapped range collapsed to empty (or inverted) — dropped, not
            // an error: the underlying text was deleted.
            continue;
        }

        if new_abs_from >= new_start && new_abs_to <= new_end {
            new_local.push(Decoration::from_parts(
                new_abs_from - new_start,
                new_abs_to - new_start,
                d.desc.clone(),
            ));
        } else {
            escaped.push(Decoration::from_parts(new_abs_from, new_abs_to, d.desc.clone()));
        }
    }

    // 2./3. Map children, collecting their escapees.
    let mut new_children: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    let mut old_child_start = old_start;

    for child in set.children() {
        let old_child_end = old_child_start + child.len();
        let new_child_start_mapped = changes.map_pos(old_child_start, 1);
        let new_child_end_mapped = changes.map_pos(old_child_end, 1);

        let (mapped_child, mut child_escaped) =
            if changes.touches(old_child_start, old_child_end) {
                map_node(
                    child,
                    old_child_start,
                    new_child_start_mapped,
                    new_child_end_mapped,
                    changes,
                )
            } else {
                // Untouched: retain contents, just resize to the new span.
                let new_len = new_child_end_mapped - new_child_start_mapped;
                let delta = new_len as i64 - child.len() as i64;
                let resized = if delta >= 0 {
                    child.grow(delta as usize)
                } else {
                    // A neighboring change shifted this child's end inward
                    // without touching it directly; shrink by truncating
                    // length (no decorations to drop since nothing here
                    // maps past the new end when untouched).
                    DecorationSet::from_node(Node {
                        length: new_len,
                        size: child.size(),
                        local: child.node().local.clone(),
                        children: child.node().children.clone(),
                    })
                };
                (resized, Vec::new())
            };

        // Translate child escapees into this node's new-frame coordinates
        // and try to re-home them here; anything still out of range keeps
        // escaping upward.
        for e in child_escaped.drain(..) {
            let local_from = e.from as i64 - new_start as i64;
            let local_to = e.to as i64 - new_start as i64;
            if local_from >= 0 && local_to <= new_length as i64 {
                new_local.push(Decoration::from_parts(
                    local_from as usize,
                    local_to as usize,
                    e.desc.clone(),
                ));
            } else {
                escaped.push(e);
            }
        }

        new_children.push(mapped_child);
        old_child_start = old_child_end;
    }

    // 4. Drop or donate empty children: a zero-size child with zero length
    // is dropped outright; a zero-size child that still carries length
    // donates it to the previous sibling (or, if it's the first child
    // with no previous sibling to donate to, is kept as a placeholder).
    let mut filtered_children: SmallVec<[DecorationSet; 2]> = SmallVec::new();
    for child in new_children.into_iter() {
        if child.size() == 0 && child.len() > 0 {
            if let Some(prev) = filtered_children.last_mut() {
                *prev = prev.grow(child.len());
                continue;
            }
        } else if child.size() == 0 {
            continue;
        }
        filtered_children.push(child);
    }

    new_local.sort_by_key(|d| d.sort_key());
    let size = new_local.len() + filtered_children.iter().map(|c| c.size()).sum::<usize>();

    let new_node = DecorationSet::from_node(Node {
        length: new_length,
        size,
        local: new_local.into(),
        children: filtered_children,
    });

    (new_node, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::desc::{PointSpec, RangeSpec};

    #[test]
    fn exclusive_end_does_not_absorb_insertion() {
        let set = DecorationSet::of([Decoration::range(5, 10, RangeSpec::new()).unwrap()]);
        let cs = ChangeSet::new(vec![Change::new(10, 10, 3)]);
        let mapped = set.map(&cs);
        let d = mapped.local_at(0).unwrap();
        assert_eq!((d.from, d.to), (5, 10));
    }

    #[test]
    fn inclusive_end_absorbs_insertion() {
        let set = DecorationSet::of([Decoration::range(
            5,
            10,
            RangeSpec {
                inclusive_end: true,
                ..Default::default()
            },
        )
        .unwrap()]);
        let cs = ChangeSet::new(vec![Change::new(10, 10, 3)]);
        let mapped = set.map(&cs);
        let d = mapped.local_at(0).unwrap();
        assert_eq!((d.from, d.to), (5, 13));
    }

    #[test]
    fn fully_deleted_range_drops() {
        let set = DecorationSet::of([Decoration::range(5, 10, RangeSpec::new()).unwrap()]);
        let cs = ChangeSet::new(vec![Change::new(4, 11, 0)]);
        let mapped = set.map(&cs);
        assert_eq!(mapped.size(), 0);
    }

    #[test]
    fn point_sticks_by_side() {
        let left = DecorationSet::of([Decoration::point(
            10,
            PointSpec {
                side: -1,
                line_attributes: None,
            },
        )]);
        let cs = ChangeSet::new(vec![Change::new(10, 10, 2)]);
        let mapped = left.map(&cs);
        assert_eq!(mapped.local_at(0).unwrap().from, 10);

        let right = DecorationSet::of([Decoration::point(
            10,
            PointSpec {
                side: 1,
                line_attributes: None,
            },
        )]);
        let mapped = right.map(&cs);
        assert_eq!(mapped.local_at(0).unwrap().from, 12);
    }

    #[test]
    fn no_changes_returns_self() {
        let set = DecorationSet::of([Decoration::range(5, 10, RangeSpec::new()).unwrap()]);
        let mapped = set.map(&ChangeSet::new(vec![]));
        assert_eq!(mapped.size(), 1);
    }

    fn leaf_with(length: usize, d: Decoration) -> DecorationSet {
        DecorationSet::from_node(Node {
            length,
            size: 1,
            local: smallvec::smallvec![d],
            children: SmallVec::new(),
        })
    }

    /// A two-child tree where the edit falls entirely inside the second
    /// child: the first must go through the untouched resize-only branch
    /// (`grow`/truncate, no recursion) and come out byte-for-byte the same
    /// bar its new length, while the second recurses and shifts.
    #[test]
    fn touched_child_recurses_untouched_child_only_resizes() {
        let child0 = leaf_with(10, Decoration::range(2, 6, RangeSpec::new()).unwrap());
        let child1 = leaf_with(10, Decoration::range(2, 6, RangeSpec::new()).unwrap());
        let root = DecorationSet::from_node(Node {
            length: 20,
            size: 2,
            local: SmallVec::new(),
            children: smallvec::smallvec![child0, child1],
        });

        // Insert 4 chars at absolute position 15, inside child1 [10, 20)
        // and clear of child0 [0, 10) entirely.
        let cs = ChangeSet::new(vec![Change::new(15, 15, 4)]);
        let mapped = root.map(&cs);

        assert_eq!(mapped.len(), 24);
        assert_eq!(mapped.children().len(), 2);

        let c0 = &mapped.children()[0];
        assert_eq!(c0.len(), 10, "untouched child keeps its old length");
        let d0 = c0.local_at(0).unwrap();
        assert_eq!((d0.from, d0.to), (2, 6), "untouched child's contents are unchanged");

        let c1 = &mapped.children()[1];
        assert_eq!(c1.len(), 14);
        let d1 = c1.local_at(0).unwrap();
        assert_eq!((d1.from, d1.to), (2, 10), "touched child's decoration shifts past the insertion");
    }

    /// A decoration anchored to the exact boundary between two children,
    /// with a bias that refuses to absorb an insertion landing on that
    /// boundary: its mapped start trails behind the child's own new
    /// window (which does absorb, via the fixed `assoc = 1` used for child
    /// bounds), so it escapes its owning child and is re-homed as the
    /// root's own local decoration. Both children end up empty, and the
    /// "drop or donate" step folds the second's length into the first.
    #[test]
    fn escapee_crosses_the_child_boundary_and_is_rehomed_at_the_parent() {
        let child0 = DecorationSet::from_node(Node {
            length: 10,
            size: 0,
            local: SmallVec::new(),
            children: SmallVec::new(),
        });
        let child1 = leaf_with(
            10,
            Decoration::range(
                0,
                5,
                RangeSpec {
                    inclusive_start: true,
                    ..Default::default()
                },
            )
            .unwrap(),
        );
        let root = DecorationSet::from_node(Node {
            length: 20,
            size: 1,
            local: SmallVec::new(),
            children: smallvec::smallvec![child0, child1],
        });

        // Insert 3 chars exactly at the child0/child1 boundary (absolute 10).
        let cs = ChangeSet::new(vec![Change::new(10, 10, 3)]);
        let mapped = root.map(&cs);

        assert_eq!(mapped.len(), 23);
        assert_eq!(mapped.size(), 1);
        let rehomed = mapped.local_at(0).unwrap();
        assert_eq!((rehomed.from, rehomed.to), (10, 18));

        // Both children came out empty; donation folds them into one.
        assert_eq!(mapped.children().len(), 1);
        assert_eq!(mapped.children()[0].size(), 0);
        assert_eq!(mapped.children()[0].len(), 23);
    }
}
