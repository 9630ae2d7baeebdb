use crate::{
    consumer::{
        ConsumerSummary, DataConsumer, Termination, components::writer::BatchWriter,
        config::ConsumerConfig,
    },
    error::ConsumerError,
    progress::ProgressTracker,
    queue::BatchReceiver,
};
use async_trait::async_trait;
use engine_core::metrics::Metrics;
use model::records::batch::Batch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One worker of a collection's consumer pool.
pub struct DocumentConsumer {
    id: usize,
    receiver: BatchReceiver,
    writer: Arc<BatchWriter>,
    progress: ProgressTracker,
    metrics: Metrics,
    config: ConsumerConfig,
    cancel: CancellationToken,
}

impl DocumentConsumer {
    pub fn new(
        id: usize,
        receiver: BatchReceiver,
        writer: Arc<BatchWriter>,
        progress: ProgressTracker,
        metrics: Metrics,
        config: ConsumerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            receiver,
            writer,
            progress,
            metrics,
            config,
            cancel,
        }
    }

    /// Returns `false` when the consumer must stop.
    async fn process_batch(&self, batch: Batch, summary: &mut ConsumerSummary) -> bool {
        let rows = batch.len() as u64;

        match self.writer.write_batch(&batch).await {
            Ok(written) => {
                if written.attempts > 1 {
                    info!(
                        consumer_id = self.id,
                        batch_id = %batch.id,
                        rows = written.rows_written,
                        attempts = written.attempts,
                        duration_ms = written.duration.as_millis() as u64,
                        "Batch written after retries"
                    );
                }
                self.metrics.increment_consumed(rows);
                self.metrics.increment_batches(1);
                self.progress.record_processed(rows, self.id).await;
                summary.batches_written += 1;

                if summary.batches_written % self.config.log_every.max(1) == 0 {
                    debug!(
                        consumer_id = self.id,
                        table = %self.metrics.table(),
                        batches = summary.batches_written,
                        throughput = %format!("{:.2}", self.metrics.snapshot().throughput()),
                        "Consumer progress"
                    );
                }
                true
            }
            Err(ConsumerError::Interrupted { batch_id }) => {
                warn!(consumer_id = self.id, batch_id = %batch_id, "Consumer interrupted during retry backoff");
                false
            }
            Err(e) => {
                self.metrics.increment_errors(1);
                summary.batches_failed += 1;
                error!(
                    consumer_id = self.id,
                    table = %self.metrics.table(),
                    batch_id = %batch.id,
                    rows,
                    error = %e,
                    "Batch dropped after exhausting retries"
                );
                true
            }
        }
    }
}

#[async_trait]
impl DataConsumer for DocumentConsumer {
    async fn run(&mut self) -> ConsumerSummary {
        let mut summary = ConsumerSummary {
            consumer_id: self.id,
            batches_written: 0,
            batches_failed: 0,
            termination: Termination::Drained,
        };
        info!(consumer_id = self.id, table = %self.metrics.table(), "Consumer started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                batch = self.receiver.recv() => Some(batch),
            };

            let batch = match next {
                None => {
                    summary.termination = Termination::Cancelled;
                    break;
                }
                Some(None) => break,
                Some(Some(batch)) => batch,
            };

            if !self.process_batch(batch, &mut summary).await {
                summary.termination = Termination::Cancelled;
                break;
            }
        }

        info!(
            consumer_id = self.id,
            table = %self.metrics.table(),
            batches = summary.batches_written,
            failed = summary.batches_failed,
            termination = ?summary.termination,
            "Consumer finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::batch_queue;
    use async_trait::async_trait;
    use connectors::sql::base::{error::DbError, target::TargetStore};
    use engine_core::state::{MigrationStore, memory::MemoryStore};
    use model::{
        core::{document::Document, value::Value},
        execution::migration::MigrationProgress,
        transform::mapping::{CollectionMapping, ColumnMapping},
    };
    use planner::query::dialect::Postgres;
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tracing_test::traced_test;
    use uuid::Uuid;

    /// Fails the first `failures` writes, then records rows.
    #[derive(Default)]
    struct FlakyTarget {
        failures: AtomicUsize,
        calls: AtomicUsize,
        rows: Mutex<Vec<Vec<Value>>>,
    }

    #[async_trait]
    impl TargetStore for FlakyTarget {
        async fn execute(&self, _sql: &str) -> Result<(), DbError> {
            Ok(())
        }

        async fn write_batch(&self, _sql: &str, rows: &[Vec<Value>]) -> Result<u64, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(DbError::Write("connection reset".into()));
            }
            self.rows.lock().unwrap().extend(rows.iter().cloned());
            Ok(rows.len() as u64)
        }

        async fn ping(&self) -> Result<(), DbError> {
            Ok(())
        }
    }

    struct Harness {
        target: Arc<FlakyTarget>,
        store: Arc<MemoryStore>,
        progress: MigrationProgress,
        metrics: Metrics,
    }

    async fn run_pool(failures: usize, batches: usize, workers: usize) -> (Harness, Vec<ConsumerSummary>) {
        let mapping = CollectionMapping::new("orders", "orders")
            .column(ColumnMapping::new("amount", "amount", "INTEGER"));
        let target = Arc::new(FlakyTarget {
            failures: AtomicUsize::new(failures),
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let progress = MigrationProgress::start(Uuid::new_v4(), "orders", "orders");
        store.create_progress(&progress).await.unwrap();

        let metrics = Metrics::new("orders");
        let cancel = CancellationToken::new();
        let config = ConsumerConfig::default().with_retries(3, Duration::from_millis(1));
        let writer = Arc::new(BatchWriter::new(
            &mapping,
            &Postgres,
            target.clone(),
            config.retry_policy(),
            metrics.clone(),
            cancel.clone(),
        ));
        let tracker = ProgressTracker::new(&progress, store.clone());

        let (tx, rx) = batch_queue(batches.max(1));
        for seq in 0..batches {
            let docs = (0..10)
                .map(|i| {
                    let mut doc = Document::new();
                    doc.insert("amount", i as i64);
                    doc
                })
                .collect();
            tx.send(Batch::new(seq as u64, "orders", "orders", docs)).await.unwrap();
        }
        drop(tx);

        let mut handles = Vec::new();
        for id in 0..workers {
            let mut consumer = DocumentConsumer::new(
                id,
                rx.clone(),
                writer.clone(),
                tracker.clone(),
                metrics.clone(),
                config.clone(),
                cancel.clone(),
            );
            handles.push(tokio::spawn(async move { consumer.run().await }));
        }

        let mut summaries = Vec::new();
        for h in handles {
            summaries.push(h.await.unwrap());
        }

        (
            Harness {
                target,
                store,
                progress,
                metrics,
            },
            summaries,
        )
    }

    #[tokio::test]
    async fn test_all_workers_terminate_once_drained() {
        let (h, summaries) = run_pool(0, 7, 3).await;

        assert_eq!(summaries.len(), 3);
        assert!(summaries.iter().all(|s| s.termination == Termination::Drained));
        assert_eq!(summaries.iter().map(|s| s.batches_written).sum::<u64>(), 7);
        assert_eq!(h.metrics.consumed(), 70);
        assert_eq!(h.metrics.errors(), 0);

        let stored = h.store.load_progress(h.progress.id).await.unwrap().unwrap();
        assert_eq!(stored.rows_processed, 70);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_batch_succeeding_on_last_attempt_counts_once() {
        let (h, _) = run_pool(2, 1, 1).await;

        let snap = h.metrics.snapshot();
        assert_eq!(snap.consumed, 10);
        assert_eq!(snap.errors, 0);
        assert_eq!(snap.retry_count, 2);
        assert_eq!(h.target.calls.load(Ordering::SeqCst), 3);
        assert!(logs_contain("Batch written after retries"));
        assert!(logs_contain("attempts=3"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_exhausted_batch_is_dropped_and_counted() {
        let (h, summaries) = run_pool(3, 2, 1).await;

        let snap = h.metrics.snapshot();
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.consumed, 10);
        assert_eq!(h.target.rows.lock().unwrap().len(), 10);
        assert_eq!(summaries[0].batches_failed, 1);
        assert!(logs_contain("Batch dropped after exhausting retries"));
    }

    #[tokio::test]
    async fn test_cancelled_consumer_stops_without_draining() {
        let (_tx, rx) = batch_queue(1);
        let metrics = Metrics::new("orders");
        let cancel = CancellationToken::new();
        let writer = Arc::new(BatchWriter::new(
            &CollectionMapping::new("orders", "orders"),
            &Postgres,
            Arc::new(FlakyTarget::default()),
            ConsumerConfig::default().retry_policy(),
            metrics.clone(),
            cancel.clone(),
        ));
        let store: Arc<dyn MigrationStore> = Arc::new(MemoryStore::new());
        let progress = MigrationProgress::start(Uuid::new_v4(), "orders", "orders");
        let mut consumer = DocumentConsumer::new(
            0,
            rx,
            writer,
            ProgressTracker::new(&progress, store),
            metrics,
            ConsumerConfig::default(),
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { consumer.run().await });
        cancel.cancel();
        assert_eq!(handle.await.unwrap().termination, Termination::Cancelled);
    }
}
