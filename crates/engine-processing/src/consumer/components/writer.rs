use crate::{error::ConsumerError, retry::classify_consumer_error, transform::transcoder::Transcoder};
use connectors::sql::base::target::TargetStore;
use engine_core::{
    metrics::Metrics,
    retry::{RetryError, RetryPolicy},
};
use model::{core::value::Value, records::batch::Batch, transform::mapping::CollectionMapping};
use planner::query::{dialect::Dialect, generator::QueryGenerator};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub rows_written: u64,
    pub attempts: usize,
    pub duration: Duration,
}

/// Transcodes a batch and writes it to the target with bounded retry.
/// One writer is shared by every consumer of a collection.
pub struct BatchWriter {
    table: String,
    insert_sql: String,
    transcoder: Transcoder,
    target: Arc<dyn TargetStore>,
    retry: RetryPolicy,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl BatchWriter {
    pub fn new(
        mapping: &CollectionMapping,
        dialect: &dyn Dialect,
        target: Arc<dyn TargetStore>,
        retry: RetryPolicy,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            table: mapping.target_table.clone(),
            insert_sql: QueryGenerator::new(dialect).insert(mapping),
            transcoder: Transcoder::new(mapping),
            target,
            retry,
            metrics,
            cancel,
        }
    }

    /// Write one batch. Failed attempts are retried with linear backoff;
    /// every retry is counted in the metrics. A backoff cut short by
    /// cancellation yields [`ConsumerError::Interrupted`].
    pub async fn write_batch(&self, batch: &Batch) -> Result<WriteResult, ConsumerError> {
        let start = Instant::now();
        let rows = self.transcoder.transcode_all(&batch.documents);
        let attempts = AtomicUsize::new(0);

        let result = self
            .retry
            .run_until_cancelled(
                || {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    self.attempt(batch, &rows)
                },
                classify_consumer_error,
                &self.cancel,
            )
            .await;

        let attempts = attempts.into_inner();
        if attempts > 1 {
            self.metrics.increment_retries((attempts - 1) as u64);
        }

        match result {
            Ok(rows_written) => {
                let duration = start.elapsed();
                debug!(
                    batch_id = %batch.id,
                    table = %self.table,
                    rows = rows_written,
                    attempts,
                    duration_ms = duration.as_millis() as u64,
                    "Batch written"
                );
                Ok(WriteResult {
                    rows_written,
                    attempts,
                    duration,
                })
            }
            Err(RetryError::Interrupted(_)) => Err(ConsumerError::Interrupted {
                batch_id: batch.id.clone(),
            }),
            Err(RetryError::Fatal(e)) | Err(RetryError::AttemptsExceeded(e)) => {
                Err(ConsumerError::RetriesExhausted {
                    batch_id: batch.id.clone(),
                    attempts,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn attempt(&self, batch: &Batch, rows: &[Vec<Value>]) -> Result<u64, ConsumerError> {
        self.target
            .write_batch(&self.insert_sql, rows)
            .await
            .map_err(|source| ConsumerError::Write {
                table: self.table.clone(),
                batch_id: batch.id.clone(),
                source,
            })
    }
}
