use std::path::PathBuf;

use thiserror::Error;

use crate::selection::RangeWindow;

/// Invalid configuration. Always fatal at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field}: lower bound {low} exceeds upper bound {high}")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },

    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("{field} must be at most {max} (got {value})")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A challenge that breaks the structural rules (inverted range, too many or
/// repeated required keys, non-letter keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidChallenge {
    #[error("minimum count {min} exceeds maximum count {max}")]
    InvertedRange { min: usize, max: usize },

    #[error("{count} required keys given, at most {max} allowed", max = crate::challenge::MAX_REQUIRED_KEYS)]
    TooManyKeys { count: usize },

    #[error("{keys} required keys do not fit in a maximum of {max} letters")]
    KeysExceedMaximum { keys: usize, max: usize },

    #[error("required key {key} appears more than once")]
    DuplicateKey { key: char },

    #[error("required key {key:?} is not a letter A-Z")]
    NotALetter { key: char },
}

/// Why a slot could not join (or become) the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("slot {index} is still revealing")]
    RejectedReveal { index: usize },

    #[error("slot {index} does not overlap the selected range {window}")]
    RejectedRangeConflict { index: usize, window: RangeWindow },

    #[error("slot {index} cannot be selected right now")]
    SlotNotSelectable { index: usize },

    #[error("there is no slot {index}")]
    UnknownSlot { index: usize },
}

impl SelectionError {
    pub fn index(&self) -> usize {
        match *self {
            Self::RejectedReveal { index }
            | Self::RejectedRangeConflict { index, .. }
            | Self::SlotNotSelectable { index }
            | Self::UnknownSlot { index } => index,
        }
    }
}
