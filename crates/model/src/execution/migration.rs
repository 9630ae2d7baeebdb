use crate::execution::{
    connection::{SourceConnection, TargetCredentials},
    status::{ProgressStatus, RunStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured migration: where documents come from and where rows go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Migration {
    pub id: Uuid,
    pub name: String,
    pub source: SourceConnection,
    pub target: TargetCredentials,
}

/// One execution of a migration against one plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationRun {
    pub id: Uuid,
    pub migration_id: Uuid,
    pub plan_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl MigrationRun {
    pub fn start(migration_id: Uuid, plan_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            migration_id,
            plan_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Per-table progress of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationProgress {
    pub id: Uuid,
    pub run_id: Uuid,
    pub source_collection: String,
    pub table_name: String,
    pub rows_total: u64,
    pub rows_processed: u64,
    pub status: ProgressStatus,
    pub updated_at: DateTime<Utc>,
}

impl MigrationProgress {
    pub fn start(
        run_id: Uuid,
        source_collection: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            source_collection: source_collection.into(),
            table_name: table_name.into(),
            rows_total: 0,
            rows_processed: 0,
            status: ProgressStatus::Running,
            updated_at: Utc::now(),
        }
    }

    pub fn percent_complete(&self) -> f64 {
        if self.rows_total == 0 {
            return 0.0;
        }
        self.rows_processed as f64 / self.rows_total as f64 * 100.0
    }
}
