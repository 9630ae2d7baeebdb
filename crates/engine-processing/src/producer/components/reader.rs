use crate::error::ProducerError;
use connectors::source::DocumentCursor;
use model::core::document::Document;

/// Regroups cursor chunks into batches of exactly `batch_size` documents;
/// only the last batch may be smaller. The fetch size of the cursor is
/// independent of the batch size.
pub struct CursorReader {
    collection: String,
    cursor: Box<dyn DocumentCursor>,
    batch_size: usize,
    pending: Vec<Document>,
    exhausted: bool,
}

impl CursorReader {
    pub fn new(collection: impl Into<String>, cursor: Box<dyn DocumentCursor>, batch_size: usize) -> Self {
        Self {
            collection: collection.into(),
            cursor,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            exhausted: false,
        }
    }

    /// Next batch, or `None` once the cursor is drained. Read failures are
    /// returned as-is; they are never retried.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Document>>, ProducerError> {
        while self.pending.len() < self.batch_size && !self.exhausted {
            let chunk = self
                .cursor
                .next_chunk()
                .await
                .map_err(|source| ProducerError::Read {
                    collection: self.collection.clone(),
                    source,
                })?;

            match chunk {
                Some(docs) => self.pending.extend(docs),
                None => self.exhausted = true,
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }

        let take = self.batch_size.min(self.pending.len());
        let rest = self.pending.split_off(take);
        Ok(Some(std::mem::replace(&mut self.pending, rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{memory::MemorySource, source::DocumentSource};

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                let mut doc = Document::new();
                doc.insert("n", i as i64);
                doc
            })
            .collect()
    }

    async fn sizes(total: usize, fetch: usize, batch: usize) -> Vec<usize> {
        let source = MemorySource::new().with_collection("c", docs(total));
        let cursor = source.open_cursor("c", fetch).await.unwrap();
        let mut reader = CursorReader::new("c", cursor, batch);

        let mut out = Vec::new();
        while let Some(b) = reader.next_batch().await.unwrap() {
            out.push(b.len());
        }
        out
    }

    #[tokio::test]
    async fn test_batches_are_exact_regardless_of_fetch_size() {
        assert_eq!(sizes(2500, 5000, 1000).await, vec![1000, 1000, 500]);
        assert_eq!(sizes(2500, 300, 1000).await, vec![1000, 1000, 500]);
        assert_eq!(sizes(2000, 7, 1000).await, vec![1000, 1000]);
    }

    #[tokio::test]
    async fn test_empty_collection_yields_nothing() {
        assert!(sizes(0, 10, 10).await.is_empty());
    }
}
