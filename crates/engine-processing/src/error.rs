use connectors::{error::SourceError, sql::base::error::DbError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Failed to write batch '{batch_id}' to table '{table}': {source}")]
    Write {
        table: String,
        batch_id: String,
        #[source]
        source: DbError,
    },

    #[error("Batch '{batch_id}' dropped after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        batch_id: String,
        attempts: usize,
        #[source]
        source: Box<ConsumerError>,
    },

    #[error("Consumer interrupted while processing batch '{batch_id}'")]
    Interrupted { batch_id: String },
}

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Failed to read collection '{collection}': {source}")]
    Read {
        collection: String,
        #[source]
        source: SourceError,
    },

    #[error("The batch channel for '{collection}' was closed unexpectedly.")]
    ChannelClosed { collection: String },

    #[error("Producer for '{collection}' interrupted after {produced} document(s)")]
    Interrupted { collection: String, produced: u64 },
}
