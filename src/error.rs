use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

/// The one user-visible failure this crate can produce.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// `Decoration::range` was called with `from >= to`. Ranges must be
    /// non-empty; use `Decoration::point` for a zero-width annotation.
    EmptyRange { from: usize, to: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyRange { from, to } => {
                write!(f, "invalid range decoration: from={from} >= to={to}")
            }
        }
    }
}

impl StdError for Error {}
