//! Domain-level error taxonomy for rolemine.

use std::path::PathBuf;

/// A role document (or one revision entry inside it) that does not have the
/// expected shape.
///
/// Malformed documents are recovered locally: the offending node is skipped,
/// reported through this record, and the corpus pass continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("malformed document {origin}{}: {reason}", entry_suffix(.entry))]
pub struct MalformedDocument {
    /// Where the document came from (file path or caller-supplied label).
    pub origin: String,
    /// Index of the offending revision entry, `None` when the whole document
    /// is unusable.
    pub entry: Option<usize>,
    /// Human-readable description of the shape problem.
    pub reason: String,
}

impl MalformedDocument {
    /// The whole document is unusable.
    pub fn document(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entry: None,
            reason: reason.into(),
        }
    }

    /// A single revision entry is unusable; the rest of the document survives.
    pub fn entry(origin: impl Into<String>, entry: usize, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entry: Some(entry),
            reason: reason.into(),
        }
    }
}

fn entry_suffix(entry: &Option<usize>) -> String {
    match entry {
        Some(idx) => format!(" (entry {})", idx),
        None => String::new(),
    }
}

/// rolemine domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MineError {
    #[error("corpus location does not exist: {}", path.display())]
    MissingCorpusLocation { path: PathBuf },

    #[error(transparent)]
    MalformedDocument(#[from] MalformedDocument),

    #[error("invalid option {key}: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for rolemine domain operations.
pub type MineResult<T> = std::result::Result<T, MineError>;
