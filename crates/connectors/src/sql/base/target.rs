//! Write side of a migration.

use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::core::value::Value;

/// Execution capability against the relational target. Shared by every
/// consumer of a run.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Executes a statement without parameters (DDL).
    async fn execute(&self, sql: &str) -> Result<(), DbError>;

    /// Executes the parameterized `sql` once per row. All rows commit
    /// together or none do. Returns the number of rows written.
    async fn write_batch(&self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, DbError>;

    /// Cheap round trip proving the target is reachable.
    async fn ping(&self) -> Result<(), DbError>;
}
