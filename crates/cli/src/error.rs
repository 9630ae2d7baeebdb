use connectors::sql::base::error::ConnectorError;
use engine_config::settings::error::SettingsError;
use engine_core::error::StoreError;
use engine_runtime::error::MigrationError;
use planner::plan::PlanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read an input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to load the migration plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Failed to deserialize the migration definition: {0}")]
    MigrationDeserialize(serde_json::Error),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to run the migration: {0}")]
    Runner(#[from] MigrationError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Connection check failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Invalid run id `{0}`")]
    InvalidRunId(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
