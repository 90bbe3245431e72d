//! Error types for session setup, scoring and export.

use std::path::PathBuf;

/// Everything the engine can refuse to do.
///
/// All variants except `Io`, `Csv` and `Config` are precondition violations: the caller
/// handed the engine something it must never see, so nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("participant id must be a positive integer, got {0}")]
    InvalidParticipantId(i64),

    #[error("grid rows and columns must each be within 1..={max}, got {rows}x{cols}", max = crate::session::MAX_GRID_SIDE)]
    InvalidGrid { rows: u32, cols: u32 },

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("cell {cell} is outside the grid (1..={total})")]
    CellOutOfRange { cell: u32, total: u32 },

    #[error("cannot summarize or export an empty record set")]
    EmptyRecords,

    #[error("rating {value} is outside the 1..=7 scale")]
    RatingOutOfRange { value: u8 },

    #[error("survey item {index} does not exist (section has {count})")]
    NoSuchSurveyItem { index: usize, count: usize },

    #[error("survey is incomplete: {0}")]
    IncompleteSurvey(String),

    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration file malformed: {path}: {details}")]
    Config { path: PathBuf, details: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
