use crate::file::error::FileError;
use thiserror::Error;

/// Failures while counting or reading source documents.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File-backed source failure.
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// The requested collection does not exist in the source.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A record could not be decoded into a document.
    #[error("Invalid document in `{collection}` at record {position}: {reason}")]
    InvalidDocument {
        collection: String,
        position: u64,
        reason: String,
    },

    /// Generic source error.
    #[error("Source error: {0}")]
    Generic(String),
}
