use crate::category::Category;
use thiserror::Error;

pub type Result<T, E = ExportError> = std::result::Result<T, E>;

/// Error taxonomy of the export pipeline.
///
/// "Nothing to export" is deliberately absent: it is a normal terminal
/// state, modeled as a `RunOutcome` variant, not an error.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Invalid configuration, detected before any I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Error surfaced by either store. Not retried; already-materialized
    /// intermediate files remain valid for a rerun.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Malformed payload, timestamp or filename. Fatal for the run: a
    /// skipped record would corrupt the idempotence guarantee.
    #[error("decode error: {0}")]
    Decode(String),

    /// A capture id scheduled for insert was already present in the
    /// destination store. Indicates a deduplication bug, never expected.
    #[error("duplicate provenance id {id} for {category}")]
    DuplicateProvenance { category: Category, id: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Decode(e.to_string())
    }
}
