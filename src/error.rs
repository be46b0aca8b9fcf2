use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// A corpus record that cannot be turned into an aligned sentence pair.
///
/// `index` is the record's position in the input (0-based, blank lines excluded).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("record {index}: missing {side} sentence")]
    MissingSide { index: usize, side: Side },

    #[error("record {index}: {side} sentence is not text")]
    NotText { index: usize, side: Side },

    #[error("record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

impl AlignmentError {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::MissingSide { index, .. }
            | Self::NotText { index, .. }
            | Self::InvalidRecord { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlignmentError, Side};

    #[test]
    fn message_names_record_and_side() {
        let err = AlignmentError::MissingSide {
            index: 7,
            side: Side::Target,
        };
        assert_eq!(err.to_string(), "record 7: missing target sentence");
        assert_eq!(err.index(), 7);
    }
}
