//! Read side of a migration: a streaming cursor over one collection.

use crate::error::SourceError;
use async_trait::async_trait;
use model::core::document::Document;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short description used in logs.
    fn name(&self) -> String;

    /// Number of documents currently in `collection`.
    async fn count(&self, collection: &str) -> Result<u64, SourceError>;

    /// Opens a forward-only cursor over `collection` that yields chunks of
    /// at most `fetch_size` documents.
    async fn open_cursor(
        &self,
        collection: &str,
        fetch_size: usize,
    ) -> Result<Box<dyn DocumentCursor>, SourceError>;
}

/// Owned by exactly one producer; never shared between tasks.
#[async_trait]
pub trait DocumentCursor: Send {
    /// Next chunk of documents, or `None` once the cursor is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Vec<Document>>, SourceError>;
}
