//! Ordered traversal of a `DecorationSet`, left-first, with an initial
//! skip that prunes whole subtrees.
//!
//! Rather than a continuation pointer threaded through each yielded
//! cursor, an explicit work stack captures the same left-first order:
//! popping a frame yields that node's local list and pushes whichever of
//! its children weren't bypassed by the skip.

use crate::set::DecorationSet;

/// A cursor over one node's `local` list, tagged with that node's absolute
/// offset in the document.
pub struct LocalSet {
    set: DecorationSet,
    idx: usize,
    offset: usize,
}

impl LocalSet {
    pub fn current(&self) -> Option<&crate::decoration::Decoration> {
        self.set.local().get(self.idx)
    }

    pub fn advance(&mut self) {
        self.idx += 1;
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

struct Frame {
    set: DecorationSet,
    offset: usize,
    skip: usize,
}

/// Left-first, skip-pruning walk over one `DecorationSet`.
pub struct DecorationSetIter {
    stack: Vec<Frame>,
    started: bool,
}

impl DecorationSetIter {
    pub fn new(root: DecorationSet) -> Self {
        DecorationSetIter {
            stack: vec![Frame {
                set: root,
                offset: 0,
                skip: 0,
            }],
            started: false,
        }
    }

    /// Pop the next node to visit and yield a cursor over its `local`
    /// list, having pushed its children (those not entirely skipped) for
    /// future calls. `skip` is only honored on the very first call — every
    /// pruning decision after that was already baked into the pushed
    /// frames by the call that produced them.
    pub fn next(&mut self, skip: usize) -> Option<LocalSet> {
        let frame = self.stack.pop()?;
        let effective_skip = if self.started { frame.skip } else { skip };
        self.started = true;

        // Find the first child not entirely bypassed: bypass while
        // `remaining > child.length` (strict); `remaining == child.length`
        // still recurses into it.
        let mut remaining = effective_skip;
        let mut split = None;
        for (i, child) in frame.set.children().iter().enumerate() {
            if remaining > child.len() {
                remaining -= child.len();
            } else {
                split = Some(i);
                break;
            }
        }

        if let Some(k) = split {
            let mut to_push: Vec<Frame> = Vec::with_capacity(frame.set.children().len() - k);
            let mut child_offset = frame.offset;
            for child in &frame.set.children()[..k] {
                child_offset += child.len();
            }
            for (i, child) in frame.set.children()[k..].iter().enumerate() {
                let this_skip = if i == 0 { remaining } else { 0 };
                to_push.push(Frame {
                    set: child.clone(),
                    offset: child_offset,
                    skip: this_skip,
                });
                child_offset += child.len();
            }
            for f in to_push.into_iter().rev() {
                self.stack.push(f);
            }
        }

        Some(LocalSet {
            set: frame.set,
            idx: 0,
            offset: frame.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::Decoration;
    use crate::desc::RangeSpec;
    use crate::set::DecorationSet;

    #[test]
    fn visits_every_local_decoration_in_order() {
        let additions: Vec<Decoration> = (0..40)
            .map(|i| Decoration::range(i * 10, i * 10 + 5, RangeSpec::new()).unwrap())
            .collect();
        let set = DecorationSet::empty().update(additions);
        assert!(!set.children().is_empty());

        let mut iter = DecorationSetIter::new(set);
        let mut seen = Vec::new();
        let mut skip = 0;
        while let Some(mut local) = iter.next(skip) {
            skip = 0;
            while let Some(d) = local.current() {
                seen.push(local.offset() + d.from);
                local.advance();
            }
        }
        let expected: Vec<usize> = (0..40).map(|i| i * 10).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn skip_bypasses_leading_subtree() {
        let additions: Vec<Decoration> = (0..40)
            .map(|i| Decoration::range(i * 10, i * 10 + 5, RangeSpec::new()).unwrap())
            .collect();
        let set = DecorationSet::empty().update(additions);

        let mut iter = DecorationSetIter::new(set);
        let mut seen = Vec::new();
        let mut skip = 320; // past the first (32-item) child entirely
        while let Some(mut local) = iter.next(skip) {
            skip = 0;
            while let Some(d) = local.current() {
                seen.push(local.offset() + d.from);
                local.advance();
            }
        }
        assert!(seen.iter().all(|&p| p >= 310));
    }
}
