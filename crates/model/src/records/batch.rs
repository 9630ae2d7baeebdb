use crate::core::document::Document;

/// A bounded, ordered group of source documents read in one producer cycle
/// and written atomically by one consumer.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: String,
    /// Position of this batch in the producer's output, starting at 0.
    pub seq: u64,
    pub source_collection: String,
    pub target_table: String,
    pub documents: Vec<Document>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl Batch {
    pub fn new(
        seq: u64,
        source_collection: impl Into<String>,
        target_table: impl Into<String>,
        documents: Vec<Document>,
    ) -> Self {
        let source_collection = source_collection.into();
        Self {
            id: format!("{source_collection}-{seq:06}"),
            seq,
            source_collection,
            target_table: target_table.into(),
            documents,
            ts: chrono::Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
