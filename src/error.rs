use thiserror::Error;

use crate::processor::driver::RecomputeOutcome;

/// Errors surfaced by the period store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors surfaced by the recompute engine.
///
/// Missing references, empty periods and weeks beyond the fourth of a month
/// are not errors; they are modeled as absent values and skipped.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store failed mid-run. `completed` holds the counts of records
    /// already committed before the failure, so callers never lose track of
    /// work that was durably written.
    #[error("store failure after {completed:?} committed: {source}")]
    Store {
        completed: RecomputeOutcome,
        #[source]
        source: StoreError,
    },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn store(completed: RecomputeOutcome, source: StoreError) -> Self {
        EngineError::Store { completed, source }
    }
}
