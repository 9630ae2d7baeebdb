use connectors::{
    error::SourceError,
    sql::base::error::{ConnectorError, DbError},
};
use engine_config::settings::error::SettingsError;
use engine_core::error::StoreError;
use engine_processing::error::ProducerError;
use thiserror::Error;

/// Top‐level errors for the migration engine.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Missing migration, plan or target credentials. Raised before any work.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source or target unreachable. Fails the whole run.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectorError),

    /// Table creation failed. Fails only that collection.
    #[error("Failed to create table '{table}': {source}")]
    Ddl {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to count documents in '{collection}': {source}")]
    Count {
        collection: String,
        #[source]
        source: SourceError,
    },

    /// Cancellation stopped consumers before the queue was drained.
    #[error("Migration of '{collection}' interrupted: {consumed} of {produced} produced rows written")]
    Interrupted {
        collection: String,
        produced: u64,
        consumed: u64,
    },

    #[error("Producer error: {0}")]
    Producer(#[from] ProducerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
