use crate::error::ProducerError;
use engine_core::metrics::Metrics;
use model::{core::document::Document, records::batch::Batch};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Numbers batches and hands them to the consumer channel.
pub struct BatchCoordinator {
    collection: String,
    target_table: String,
    batch_tx: Option<mpsc::Sender<Batch>>,
    metrics: Metrics,
    cancel: CancellationToken,
    next_seq: u64,
}

impl BatchCoordinator {
    pub fn new(
        collection: impl Into<String>,
        target_table: impl Into<String>,
        batch_tx: mpsc::Sender<Batch>,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: collection.into(),
            target_table: target_table.into(),
            batch_tx: Some(batch_tx),
            metrics,
            cancel,
            next_seq: 0,
        }
    }

    /// Send a batch, waiting while the queue is full. `produced` grows by the
    /// batch size only once the batch is enqueued.
    pub async fn send_batch(&mut self, documents: Vec<Document>) -> Result<(), ProducerError> {
        let count = documents.len() as u64;
        let batch = Batch::new(self.next_seq, &self.collection, &self.target_table, documents);

        let tx = self
            .batch_tx
            .as_ref()
            .ok_or_else(|| ProducerError::ChannelClosed {
                collection: self.collection.clone(),
            })?;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(ProducerError::Interrupted {
                    collection: self.collection.clone(),
                    produced: self.metrics.produced(),
                });
            }
            sent = tx.send(batch) => sent.map_err(|_| ProducerError::ChannelClosed {
                collection: self.collection.clone(),
            })?,
        }

        self.next_seq += 1;
        self.metrics.increment_produced(count);
        Ok(())
    }

    /// Drop the sender so consumers observe the end of the stream once the
    /// queue drains.
    pub fn close_channel(&mut self) {
        self.batch_tx = None;
    }

    pub fn batches_sent(&self) -> u64 {
        self.next_seq
    }
}
