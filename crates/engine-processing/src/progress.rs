use engine_core::{error::StoreError, state::MigrationStore};
use model::execution::{migration::MigrationProgress, status::ProgressStatus};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Writes one collection's progress record. Shared by the collection task
/// and every consumer of that collection.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_id: Uuid,
    table: String,
    store: Arc<dyn MigrationStore>,
}

impl ProgressTracker {
    pub fn new(progress: &MigrationProgress, store: Arc<dyn MigrationStore>) -> Self {
        Self {
            progress_id: progress.id,
            table: progress.table_name.clone(),
            store,
        }
    }

    pub async fn set_total(&self, total: u64) -> Result<(), StoreError> {
        self.store.set_rows_total(self.progress_id, total).await
    }

    /// Adds `rows` to the processed counter. The add happens at the store, so
    /// concurrent consumers never lose each other's updates. A failure is
    /// logged and does not interrupt consumption.
    pub async fn record_processed(&self, rows: u64, consumer_id: usize) -> Option<u64> {
        match self.store.add_rows_processed(self.progress_id, rows).await {
            Ok(total) => Some(total),
            Err(e) => {
                warn!(
                    table = %self.table,
                    consumer_id,
                    rows,
                    error = %e,
                    "Failed to update progress"
                );
                None
            }
        }
    }

    pub async fn finish(
        &self,
        status: ProgressStatus,
        rows_processed: u64,
    ) -> Result<MigrationProgress, StoreError> {
        self.store
            .finish_progress(self.progress_id, status, rows_processed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::state::memory::MemoryStore;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let store: Arc<dyn MigrationStore> = Arc::new(MemoryStore::new());
        let progress = MigrationProgress::start(Uuid::new_v4(), "orders", "orders");
        store.create_progress(&progress).await.unwrap();
        let tracker = ProgressTracker::new(&progress, store.clone());

        let mut handles = Vec::new();
        for consumer_id in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    tracker.record_processed(10, consumer_id).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stored = store.load_progress(progress.id).await.unwrap().unwrap();
        assert_eq!(stored.rows_processed, 2000);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_record_is_logged_not_raised() {
        let store: Arc<dyn MigrationStore> = Arc::new(MemoryStore::new());
        let progress = MigrationProgress::start(Uuid::new_v4(), "orders", "orders");
        let tracker = ProgressTracker::new(&progress, store);

        assert_eq!(tracker.record_processed(5, 0).await, None);
        assert!(logs_contain("Failed to update progress"));
    }
}
