use crate::{
    error::ProducerError,
    producer::{
        DataProducer,
        components::{coordinator::BatchCoordinator, reader::CursorReader},
        config::ProducerConfig,
    },
};
use async_trait::async_trait;
use connectors::source::DocumentSource;
use engine_core::metrics::Metrics;
use model::{records::batch::Batch, transform::mapping::CollectionMapping};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The single reader of one source collection.
///
/// It never signals termination itself: the channel closes when the producer
/// drops its sender, whether it finished or failed.
pub struct DocumentProducer {
    collection: String,
    target_table: String,
    source: Arc<dyn DocumentSource>,
    config: ProducerConfig,
    batch_tx: Option<mpsc::Sender<Batch>>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl DocumentProducer {
    pub fn new(
        mapping: &CollectionMapping,
        source: Arc<dyn DocumentSource>,
        config: ProducerConfig,
        batch_tx: mpsc::Sender<Batch>,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: mapping.source_collection.clone(),
            target_table: mapping.target_table.clone(),
            source,
            config,
            batch_tx: Some(batch_tx),
            metrics,
            cancel,
        }
    }

    async fn produce(&self, coordinator: &mut BatchCoordinator) -> Result<u64, ProducerError> {
        let cursor = self
            .source
            .open_cursor(&self.collection, self.config.fetch_size)
            .await
            .map_err(|source| ProducerError::Read {
                collection: self.collection.clone(),
                source,
            })?;
        let mut reader = CursorReader::new(&self.collection, cursor, self.config.batch_size);

        loop {
            if self.cancel.is_cancelled() {
                return Err(ProducerError::Interrupted {
                    collection: self.collection.clone(),
                    produced: self.metrics.produced(),
                });
            }

            let Some(documents) = reader.next_batch().await? else {
                break;
            };
            coordinator.send_batch(documents).await?;
        }

        Ok(self.metrics.produced())
    }
}

#[async_trait]
impl DataProducer for DocumentProducer {
    async fn run(&mut self) -> Result<u64, ProducerError> {
        let batch_tx = self
            .batch_tx
            .take()
            .ok_or_else(|| ProducerError::ChannelClosed {
                collection: self.collection.clone(),
            })?;
        let mut coordinator = BatchCoordinator::new(
            &self.collection,
            &self.target_table,
            batch_tx,
            self.metrics.clone(),
            self.cancel.clone(),
        );

        info!(collection = %self.collection, table = %self.target_table, "Producer started");
        let result = self.produce(&mut coordinator).await;
        coordinator.close_channel();

        match &result {
            Ok(produced) => info!(
                collection = %self.collection,
                produced,
                batches = coordinator.batches_sent(),
                "Producer completed"
            ),
            Err(e) => error!(
                collection = %self.collection,
                produced = self.metrics.produced(),
                error = %e,
                "Producer failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::batch_queue;
    use connectors::memory::MemorySource;
    use model::{core::document::Document, transform::mapping::ColumnMapping};
    use std::time::Duration;

    fn mapping() -> CollectionMapping {
        CollectionMapping::new("orders", "orders")
            .column(ColumnMapping::new("amount", "amount", "INTEGER"))
    }

    fn source(n: usize) -> Arc<dyn DocumentSource> {
        let docs = (0..n)
            .map(|i| {
                let mut doc = Document::new();
                doc.insert("amount", i as i64);
                doc
            })
            .collect();
        Arc::new(MemorySource::new().with_collection("orders", docs))
    }

    fn config(batch_size: usize) -> ProducerConfig {
        ProducerConfig::default()
            .with_batch_size(batch_size)
            .with_fetch_size(64)
    }

    #[tokio::test]
    async fn test_produces_ceil_n_over_b_batches() {
        let (tx, rx) = batch_queue(16);
        let metrics = Metrics::new("orders");
        let mut producer = DocumentProducer::new(
            &mapping(),
            source(2500),
            config(1000),
            tx,
            metrics.clone(),
            CancellationToken::new(),
        );

        assert_eq!(producer.run().await.unwrap(), 2500);

        let mut seen = Vec::new();
        while let Some(batch) = rx.recv().await {
            seen.push((batch.seq, batch.len()));
        }
        assert_eq!(seen, vec![(0, 1000), (1, 1000), (2, 500)]);
        assert_eq!(metrics.produced(), 2500);
    }

    #[tokio::test]
    async fn test_blocks_on_full_queue_then_interrupts() {
        let (tx, rx) = batch_queue(2);
        let metrics = Metrics::new("orders");
        let cancel = CancellationToken::new();
        let mut producer = DocumentProducer::new(
            &mapping(),
            source(100),
            config(10),
            tx,
            metrics.clone(),
            cancel.clone(),
        );
        let handle = tokio::spawn(async move { producer.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(metrics.produced(), 20);
        assert_eq!(rx.pending().await, 2);

        cancel.cancel();
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ProducerError::Interrupted { produced: 20, .. }));
    }

    #[tokio::test]
    async fn test_missing_collection_is_read_error_and_closes_channel() {
        let (tx, rx) = batch_queue(2);
        let mut producer = DocumentProducer::new(
            &CollectionMapping::new("ghost", "ghost"),
            source(1),
            config(10),
            tx,
            Metrics::new("ghost"),
            CancellationToken::new(),
        );

        assert!(matches!(producer.run().await, Err(ProducerError::Read { .. })));
        assert!(rx.recv().await.is_none());
    }
}
