//! Source backed by documents already held in memory, for in-process callers.

use crate::{
    error::SourceError,
    source::{DocumentCursor, DocumentSource},
};
use async_trait::async_trait;
use model::core::document::Document;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<String, Arc<Vec<Document>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections.insert(name.into(), Arc::new(documents));
        self
    }

    fn collection(&self, name: &str) -> Result<Arc<Vec<Document>>, SourceError> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::CollectionNotFound(name.to_string()))
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    fn name(&self) -> String {
        "memory".into()
    }

    async fn count(&self, collection: &str) -> Result<u64, SourceError> {
        Ok(self.collection(collection)?.len() as u64)
    }

    async fn open_cursor(
        &self,
        collection: &str,
        fetch_size: usize,
    ) -> Result<Box<dyn DocumentCursor>, SourceError> {
        Ok(Box::new(MemoryCursor {
            documents: self.collection(collection)?,
            position: 0,
            fetch_size: fetch_size.max(1),
        }))
    }
}

pub struct MemoryCursor {
    documents: Arc<Vec<Document>>,
    position: usize,
    fetch_size: usize,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next_chunk(&mut self) -> Result<Option<Vec<Document>>, SourceError> {
        if self.position >= self.documents.len() {
            return Ok(None);
        }
        let end = (self.position + self.fetch_size).min(self.documents.len());
        let chunk = self.documents[self.position..end].to_vec();
        self.position = end;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_cover_every_document_once() {
        let docs: Vec<Document> = (0..7)
            .map(|i| {
                let mut d = Document::new();
                d.insert("n", i as i64);
                d
            })
            .collect();
        let source = MemorySource::new().with_collection("c", docs);

        let mut cursor = source.open_cursor("c", 3).await.unwrap();
        let mut sizes = Vec::new();
        while let Some(chunk) = cursor.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
        }

        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(source.count("c").await.unwrap(), 7);
    }
}
