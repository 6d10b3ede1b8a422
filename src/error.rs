use std::path::PathBuf;

use thiserror::Error;

use crate::games::GameKind;

#[derive(Error, Debug)]
pub enum MmdError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed data in {}: {detail}", .path.display())]
    MalformedData { path: PathBuf, detail: String },

    #[error("Strategy has {got} entries but the game enumerates {expected} pure strategies")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Strategy weight {weight} at position {position} is not a probability weight")]
    InvalidWeight { position: usize, weight: f64 },

    #[error("Behavioral sequence misaligned with legal-action mask: consumed {consumed} of {available} entries")]
    Alignment { consumed: usize, available: usize },

    #[error("Row {row} of tabular policy sums to {sum}")]
    RowSum { row: usize, sum: f64 },

    #[error("Solver run failed ({command}): {reason}")]
    ProducerFailure { command: String, reason: String },

    #[error("Cache entry {location} is already being computed (remove the lock if it is stale)")]
    KeyBusy { location: String },

    #[error("No reference game available for {0}")]
    NoReference(GameKind),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid game tree: {0}")]
    InvalidTree(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type MmdResult<T> = Result<T, MmdError>;
