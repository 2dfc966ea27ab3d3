use std::rc::Rc;

use crate::desc::{DecorationDesc, DecorationSpec, PointSpec, RangeSpec};
use crate::error::Error;

/// One annotation: an interval (or, when `from == to`, a point) paired with
/// its descriptor. Immutable; cheap to clone (the descriptor is
/// reference-counted).
#[derive(Debug, Clone)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub desc: Rc<DecorationDesc>,
}

impl Decoration {
    /// Build a range decoration. Fails if `from >= to` — empty ranges
    /// aren't representable; use `Decoration::point` instead.
    pub fn range(from: usize, to: usize, spec: RangeSpec) -> Result<Decoration, Error> {
        if from >= to {
            return Err(Error::EmptyRange { from, to });
        }
        Ok(Decoration {
            from,
            to,
            desc: Rc::new(DecorationDesc::from_spec(DecorationSpec::range(spec))),
        })
    }

    /// Build a point decoration. Always succeeds.
    pub fn point(pos: usize, spec: PointSpec) -> Decoration {
        Decoration {
            from: pos,
            to: pos,
            desc: Rc::new(DecorationDesc::from_spec(DecorationSpec::point(spec))),
        }
    }

    pub(crate) fn from_parts(from: usize, to: usize, desc: Rc<DecorationDesc>) -> Decoration {
        Decoration { from, to, desc }
    }

    pub fn spec_is_point(&self) -> bool {
        self.desc.is_point()
    }

    /// Return an equivalent decoration shifted by `offset`.
    pub fn moved(&self, offset: i64) -> Decoration {
        Decoration {
            from: (self.from as i64 + offset) as usize,
            to: (self.to as i64 + offset) as usize,
            desc: self.desc.clone(),
        }
    }

    /// Sort key used everywhere a decoration list must be ordered:
    /// `(from, desc.bias)` ascending.
    pub(crate) fn sort_key(&self) -> (usize, i64) {
        (self.from, self.desc.bias())
    }

    /// Position used to key this decoration in the spans-builder heap: its
    /// end.
    pub fn heap_pos(&self) -> usize {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_empty_interval() {
        assert!(Decoration::range(5, 5, RangeSpec::new()).is_err());
        assert!(Decoration::range(6, 5, RangeSpec::new()).is_err());
    }

    #[test]
    fn point_always_succeeds_with_from_eq_to() {
        let d = Decoration::point(10, PointSpec::default());
        assert_eq!(d.from, 10);
        assert_eq!(d.to, 10);
    }

    #[test]
    fn moved_shifts_both_ends() {
        let d = Decoration::range(5, 10, RangeSpec::new()).unwrap();
        let m = d.moved(3);
        assert_eq!((m.from, m.to), (8, 13));
    }
}
