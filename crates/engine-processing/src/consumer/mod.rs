use async_trait::async_trait;

pub mod components;
pub mod config;
pub mod document;

pub use document::DocumentConsumer;

/// Why a consumer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The producer hung up and the queue was drained.
    Drained,
    /// Cancellation was requested between batches or during a retry backoff.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub consumer_id: usize,
    pub batches_written: u64,
    pub batches_failed: u64,
    pub termination: Termination,
}

#[async_trait]
pub trait DataConsumer {
    /// Executes the consumer's main loop. Batch failures are counted, never
    /// returned.
    async fn run(&mut self) -> ConsumerSummary;
}
