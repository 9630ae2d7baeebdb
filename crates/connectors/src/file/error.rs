use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Collection name `{0}` is not a plain file name")]
    InvalidCollectionName(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
