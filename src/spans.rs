//! Merge overlapping range decorations in `[from, to]` into a flat,
//! non-overlapping sequence of styled spans.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::heap::{ActiveDecoration, HeapEntry, Heapable};
use crate::iter::DecorationSetIter;
use crate::set::DecorationSet;

/// One contiguous output span: `[from, to)` plus the merged styling of
/// every decoration active across it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedRange {
    pub from: usize,
    pub to: usize,
    pub tag_name: Option<String>,
    pub attributes: Option<BTreeMap<String, String>>,
    pub collapsed: bool,
}

impl DecoratedRange {
    /// Merge `active`'s descriptors by overlay: later `tag_name` wins; for
    /// `attributes`, `style` values are joined with `;`, `class` values
    /// with a space, everything else overwrites. When `active` holds a
    /// collapsed decoration, every other decoration is ignored and the
    /// returned span just carries the collapsed one's own styling, clipped
    /// to `[from, to)` — callers are expected to have already merged any
    /// run of boundaries a collapsed decoration spans into one `build`
    /// call (see `emit_boundary`) rather than calling this once per
    /// interior boundary.
    fn build(from: usize, to: usize, active: &[ActiveDecoration]) -> DecoratedRange {
        if let Some(collapsed) = active
            .iter()
            .find(|a| a.decoration.desc.collapsed())
        {
            return DecoratedRange {
                from: collapsed.from.max(from),
                to: collapsed.to.min(to),
                tag_name: collapsed.decoration.desc.tag_name().map(|s| s.to_string()),
                attributes: collapsed.decoration.desc.attributes().cloned(),
                collapsed: true,
            };
        }

        let mut tag_name = None;
        let mut attributes: Option<BTreeMap<String, String>> = None;
        for a in active {
            if !a.decoration.desc.affects_spans() {
                continue;
            }
            if let Some(t) = a.decoration.desc.tag_name() {
                tag_name = Some(t.to_string());
            }
            if let Some(attrs) = a.decoration.desc.attributes() {
                let out = attributes.get_or_insert_with(BTreeMap::new);
                for (k, v) in attrs {
                    match out.get_mut(k.as_str()) {
                        Some(existing) if k == "style" => {
                            existing.push(';');
                            existing.push_str(v);
                        }
                        Some(existing) if k == "class" => {
                            existing.push(' ');
                            existing.push_str(v);
                        }
                        _ => {
                            out.insert(k.clone(), v.clone());
                        }
                    }
                }
            }
        }
        DecoratedRange {
            from,
            to,
            tag_name,
            attributes,
            collapsed: false,
        }
    }
}

fn seed(heap: &mut BinaryHeap<Reverse<HeapEntry>>, set: &DecorationSet, from: usize, seq: &mut u64) {
    let mut iter = DecorationSetIter::new(set.clone());
    if let Some(local) = iter.next(from) {
        push_cursor(heap, local, iter, seq);
    }
}

fn push_cursor(
    heap: &mut BinaryHeap<Reverse<HeapEntry>>,
    mut local: crate::iter::LocalSet,
    mut iter: DecorationSetIter,
    seq: &mut u64,
) {
    loop {
        match local.current() {
            Some(d) => {
                let heap_pos = local.offset() + d.from;
                let bias = d.desc.bias();
                *seq += 1;
                heap.push(Reverse(HeapEntry {
                    heap_pos,
                    bias,
                    seq: *seq,
                    payload: Heapable::Cursor { local, iter },
                }));
                return;
            }
            None => match iter.next(0) {
                Some(next_local) => {
                    local = next_local;
                    continue;
                }
                None => return,
            },
        }
    }
}

/// Called right before the merge loop breaks out early (the query window
/// ends mid-decoration): if a collapsed decoration is still active at that
/// point, its deferred span must be stretched to cover through `to` too,
/// since the loop won't see its actual `Ending` event to do that itself.
fn settle_collapse_at_query_end(
    collapse: &mut Option<(usize, usize, ActiveDecoration)>,
    pos: usize,
    to: usize,
    active: &[ActiveDecoration],
) {
    if let Some(c) = active.iter().find(|a| a.decoration.desc.collapsed()) {
        match collapse {
            Some((_, end, _)) => *end = to,
            None => *collapse = Some((pos, to, c.clone())),
        }
    }
}

/// Emit the span covering `[*pos, boundary)`, deferring while a collapsed
/// decoration is active so the whole run it covers becomes one span
/// instead of one per interior boundary. `collapse` tracks the run in
/// progress: its start position and the collapsed decoration responsible
/// for it. Only the first collapsed decoration found in a run is tracked —
/// a second collapsed decoration taking over without a gap is treated as
/// part of the same run rather than starting a new one.
fn emit_boundary(
    out: &mut Vec<DecoratedRange>,
    pos: &mut usize,
    collapse: &mut Option<(usize, usize, ActiveDecoration)>,
    boundary: usize,
    active: &[ActiveDecoration],
) {
    if boundary <= *pos {
        return;
    }
    if let Some(c) = active.iter().find(|a| a.decoration.desc.collapsed()) {
        match collapse {
            Some((_, end, _)) => *end = boundary,
            None => *collapse = Some((*pos, boundary, c.clone())),
        }
        *pos = boundary;
        return;
    }
    if let Some((start, end, c)) = collapse.take() {
        out.push(DecoratedRange::build(start, end, std::slice::from_ref(&c)));
        *pos = end;
    }
    if boundary > *pos {
        out.push(DecoratedRange::build(*pos, boundary, active));
        *pos = boundary;
    }
}

/// `decoratedSpansInRange(sets, from, to)`: a contiguous, non-overlapping
/// sequence of `DecoratedRange` covering `[from, to]`.
pub fn decorated_spans_in_range(sets: &[DecorationSet], from: usize, to: usize) -> Vec<DecoratedRange> {
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    let mut seq: u64 = 0;
    for set in sets {
        seed(&mut heap, set, from, &mut seq);
    }

    let mut active: Vec<ActiveDecoration> = Vec::new();
    let mut next_id: u64 = 0;
    let mut out = Vec::new();
    let mut pos = from;
    let mut collapse: Option<(usize, usize, ActiveDecoration)> = None;

    while let Some(Reverse(entry)) = heap.pop() {
        match entry.payload {
            Heapable::Cursor { mut local, iter } => {
                let d = local.current().cloned().expect("seeded with a current item");
                local.advance();
                push_cursor(&mut heap, local, iter, &mut seq);

                let abs_from = entry.heap_pos;
                let abs_to = abs_from - d.from + d.to;

                if abs_to < from {
                    continue;
                }
                if abs_from > to {
                    settle_collapse_at_query_end(&mut collapse, pos, to, &active);
                    break;
                }

                if !d.spec_is_point() && d.desc.affects_spans() {
                    if abs_from > pos {
                        emit_boundary(&mut out, &mut pos, &mut collapse, abs_from, &active);
                    }
                    let id = next_id;
                    next_id += 1;
                    active.push(ActiveDecoration {
                        id,
                        from: abs_from,
                        to: abs_to,
                        decoration: d.clone(),
                    });
                    seq += 1;
                    heap.push(Reverse(HeapEntry {
                        heap_pos: abs_to,
                        bias: d.desc.bias(),
                        seq,
                        payload: Heapable::Ending { id },
                    }));
                }
            }
            Heapable::Ending { id } => {
                let ending_to = entry.heap_pos;
                if ending_to >= to {
                    settle_collapse_at_query_end(&mut collapse, pos, to, &active);
                    break;
                }
                if ending_to > pos {
                    emit_boundary(&mut out, &mut pos, &mut collapse, ending_to, &active);
                }
                active.retain(|a| a.id != id);
            }
        }
    }

    if let Some((start, end, c)) = collapse.take() {
        let clipped_end = end.min(to);
        out.push(DecoratedRange::build(start, clipped_end, std::slice::from_ref(&c)));
        pos = clipped_end;
    }
    if pos < to {
        out.push(DecoratedRange::build(pos, to, &active));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::Decoration;
    use crate::desc::RangeSpec;
    use std::collections::BTreeMap;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn non_overlapping_ranges_merge_classes() {
        let a = DecorationSet::of([Decoration::range(
            0,
            10,
            RangeSpec::new().with_attributes(attrs(&[("class", "a")])),
        )
        .unwrap()]);
        let b = DecorationSet::of([Decoration::range(
            5,
            15,
            RangeSpec::new().with_attributes(attrs(&[("class", "b")])),
        )
        .unwrap()]);

        let spans = decorated_spans_in_range(&[a, b], 0, 15);
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].from, spans[0].to), (0, 5));
        assert_eq!(
            spans[0].attributes.as_ref().unwrap().get("class").unwrap(),
            "a"
        );
        assert_eq!((spans[1].from, spans[1].to), (5, 10));
        assert_eq!(
            spans[1].attributes.as_ref().unwrap().get("class").unwrap(),
            "a b"
        );
        assert_eq!((spans[2].from, spans[2].to), (10, 15));
        assert_eq!(
            spans[2].attributes.as_ref().unwrap().get("class").unwrap(),
            "b"
        );
    }

    #[test]
    fn coverage_has_no_gaps_or_overlaps() {
        let set = DecorationSet::of([
            Decoration::range(0, 5, RangeSpec::new().with_attributes(attrs(&[("class", "x")]))).unwrap(),
        ]);
        let spans = decorated_spans_in_range(&[set], 0, 10);
        let mut cursor = 0;
        for span in &spans {
            assert_eq!(span.from, cursor);
            cursor = span.to;
        }
        assert_eq!(cursor, 10);
    }

    #[test]
    fn plain_range_without_attributes_does_not_affect_spans() {
        let set = DecorationSet::of([Decoration::range(0, 10, RangeSpec::new()).unwrap()]);
        let spans = decorated_spans_in_range(&[set], 0, 10);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].attributes.is_none());
        assert!(!spans[0].collapsed);
    }

    #[test]
    fn collapsed_range_emits_one_span_despite_interior_boundaries() {
        let collapsed = DecorationSet::of([Decoration::range(
            0,
            20,
            RangeSpec {
                collapsed: true,
                ..Default::default()
            },
        )
        .unwrap()]);
        let interior = DecorationSet::of([Decoration::range(
            10,
            15,
            RangeSpec::new().with_attributes(attrs(&[("class", "x")])),
        )
        .unwrap()]);

        let spans = decorated_spans_in_range(&[collapsed, interior], 0, 20);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].from, spans[0].to), (0, 20));
        assert!(spans[0].collapsed);
    }

    #[test]
    fn collapsed_range_clips_to_the_query_window() {
        let collapsed = DecorationSet::of([Decoration::range(
            0,
            30,
            RangeSpec {
                collapsed: true,
                ..Default::default()
            },
        )
        .unwrap()]);

        let spans = decorated_spans_in_range(&[collapsed], 5, 20);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].from, spans[0].to), (5, 20));
        assert!(spans[0].collapsed);
    }
}
