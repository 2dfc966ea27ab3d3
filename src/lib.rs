//! An immutable, persistent index over positions in a text buffer.
//!
//! A [`DecorationSet`] stores annotations — styled ranges and points —
//! keyed by position. It supports bulk [`DecorationSet::update`] (add and
//! filter in one pass), [`DecorationSet::map`] across a list of edits, and
//! a merged-span query ([`decorated_spans_in_range`]) that flattens
//! several sets' overlapping ranges into one ordered, non-overlapping
//! sequence. Every operation returns a new root; nothing is ever mutated
//! in place, and unchanged subtrees are shared with the old root.

mod change;
mod decoration;
mod desc;
mod error;
mod heap;
mod iter;
mod set;
mod spans;

pub use change::{Change, ChangeSet};
pub use decoration::Decoration;
pub use desc::{DecorationDesc, DecorationSpec, PointSpec, RangeSpec, BIG};
pub use error::Error;
pub use set::{DecorationSet, Filter};
pub use spans::{decorated_spans_in_range, DecoratedRange};
