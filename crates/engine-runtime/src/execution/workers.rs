use crate::error::MigrationError;
use engine_processing::{
    consumer::{ConsumerSummary, DataConsumer},
    error::ProducerError,
    producer::DataProducer,
};
use tokio::task::{JoinHandle, JoinSet};
use tracing::info;

pub struct WorkerOutcome {
    pub produced: Result<u64, ProducerError>,
    pub consumers: Vec<ConsumerSummary>,
}

/// The producer task and consumer tasks of one collection. Owned by the
/// collection task and always joined before it reports.
pub struct WorkerPool {
    producer: JoinHandle<Result<u64, ProducerError>>,
    consumers: JoinSet<ConsumerSummary>,
}

impl WorkerPool {
    pub fn spawn(
        mut producer: Box<dyn DataProducer + Send>,
        consumers: Vec<Box<dyn DataConsumer + Send>>,
    ) -> Self {
        info!(consumers = consumers.len(), "Launching workers");

        let producer = tokio::spawn(async move { producer.run().await });
        let mut set = JoinSet::new();
        for mut consumer in consumers {
            set.spawn(async move { consumer.run().await });
        }

        Self {
            producer,
            consumers: set,
        }
    }

    /// Waits for the producer, then for every consumer. The producer's result
    /// is returned rather than raised so the queue is always drained first.
    pub async fn join(mut self) -> Result<WorkerOutcome, MigrationError> {
        let produced = self.producer.await?;

        let mut consumers = Vec::with_capacity(self.consumers.len());
        while let Some(summary) = self.consumers.join_next().await {
            consumers.push(summary?);
        }
        consumers.sort_by_key(|s| s.consumer_id);

        Ok(WorkerOutcome {
            produced,
            consumers,
        })
    }
}
