use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the trace lens pipeline.
///
/// Absence of data (no traces directory, no matching test, no matching
/// records) is never an error; those paths resolve to empty results.
#[derive(Debug, Error)]
pub enum TraceLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The latest snapshot file is not a JSON array of trace records.
    #[error("malformed trace snapshot {}: {source}", path.display())]
    MalformedSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record parsed as JSON but violates a structural rule.
    #[error("invalid trace record #{index} in {}: {reason}", path.display())]
    InvalidTrace {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("locale collation unavailable: {0}")]
    Collation(String),

    #[error("Unsupported language for {0}")]
    UnsupportedLanguage(String),
}

pub type Result<T> = std::result::Result<T, TraceLensError>;
