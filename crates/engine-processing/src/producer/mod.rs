use crate::error::ProducerError;
use async_trait::async_trait;

pub mod components;
pub mod config;
pub mod document;

pub use document::DocumentProducer;

#[async_trait]
pub trait DataProducer {
    /// Executes the producer's main loop and returns the number of documents
    /// enqueued.
    async fn run(&mut self) -> Result<u64, ProducerError>;
}
