//! Decoration specs and the descriptors derived from them.

use std::collections::BTreeMap;

/// Bias magnitude large enough to dominate any realistic `PointSpec::side`
/// value, letting inclusive range endpoints and point sides coexist in a
/// single signed comparison key.
pub const BIG: i64 = 2_000_000_000;

/// The immutable specification for one range-shaped decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSpec {
    pub inclusive_start: bool,
    pub inclusive_end: bool,
    pub attributes: Option<BTreeMap<String, String>>,
    pub line_attributes: Option<BTreeMap<String, String>>,
    pub tag_name: Option<String>,
    pub collapsed: bool,
}

impl RangeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes(mut self, attrs: BTreeMap<String, String>) -> Self {
        self.attributes = Some(attrs);
        self
    }

    pub fn with_tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }
}

/// The immutable specification for one point-shaped decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointSpec {
    pub side: i64,
    pub line_attributes: Option<BTreeMap<String, String>>,
}

/// What kind of annotation a decoration represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationSpec {
    Range(RangeSpec),
    Point(PointSpec),
}

impl DecorationSpec {
    pub fn range(spec: RangeSpec) -> Self {
        DecorationSpec::Range(spec)
    }

    pub fn point(spec: PointSpec) -> Self {
        DecorationSpec::Point(spec)
    }
}

/// Derived once per spec: the bias values used for sort order and
/// position mapping, and whether this decoration contributes to the
/// merged span output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationDesc {
    Range {
        spec: RangeSpec,
        bias: i64,
        end_bias: i64,
        affects_spans: bool,
    },
    Point {
        spec: PointSpec,
        bias: i64,
    },
}

impl DecorationDesc {
    pub fn from_spec(spec: DecorationSpec) -> DecorationDesc {
        match spec {
            DecorationSpec::Range(r) => {
                let bias = if r.inclusive_start { -BIG } else { BIG };
                let end_bias = if r.inclusive_end { BIG } else { -BIG };
                let affects_spans =
                    r.attributes.is_some() || r.tag_name.is_some() || r.collapsed;
                DecorationDesc::Range {
                    spec: r,
                    bias,
                    end_bias,
                    affects_spans,
                }
            }
            DecorationSpec::Point(p) => {
                let bias = p.side;
                DecorationDesc::Point { spec: p, bias }
            }
        }
    }

    /// The bias used for sorting and for mapping the start (range) or only
    /// (point) position.
    pub fn bias(&self) -> i64 {
        match self {
            DecorationDesc::Range { bias, .. } => *bias,
            DecorationDesc::Point { bias, .. } => *bias,
        }
    }

    /// The bias used for mapping the end of a range. Points have no
    /// separate end, so this mirrors `bias()`.
    pub fn end_bias(&self) -> i64 {
        match self {
            DecorationDesc::Range { end_bias, .. } => *end_bias,
            DecorationDesc::Point { bias, .. } => *bias,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, DecorationDesc::Point { .. })
    }

    pub fn affects_spans(&self) -> bool {
        match self {
            DecorationDesc::Range { affects_spans, .. } => *affects_spans,
            DecorationDesc::Point { .. } => false,
        }
    }

    pub fn collapsed(&self) -> bool {
        match self {
            DecorationDesc::Range { spec, .. } => spec.collapsed,
            DecorationDesc::Point { .. } => false,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        match self {
            DecorationDesc::Range { spec, .. } => spec.tag_name.as_deref(),
            DecorationDesc::Point { .. } => None,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            DecorationDesc::Range { spec, .. } => spec.attributes.as_ref(),
            DecorationDesc::Point { .. } => None,
        }
    }
}
