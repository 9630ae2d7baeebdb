use chrono::{DateTime, Utc};
use engine_core::metrics::MetricsSnapshot;
use model::execution::{
    migration::MigrationRun,
    status::{ProgressStatus, RunStatus},
};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of one collection pipeline.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub source_collection: String,
    pub target_table: String,
    pub status: ProgressStatus,
    pub rows_total: u64,
    pub produced: u64,
    pub consumed: u64,
    pub errors: u64,
    pub batches_processed: u64,
    pub retry_count: u64,
    pub elapsed_ms: u64,
    pub throughput: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl CollectionReport {
    pub fn new(
        source_collection: impl Into<String>,
        target_table: impl Into<String>,
        rows_total: u64,
        snapshot: &MetricsSnapshot,
        status: ProgressStatus,
    ) -> Self {
        Self {
            source_collection: source_collection.into(),
            target_table: target_table.into(),
            status,
            rows_total,
            produced: snapshot.produced,
            consumed: snapshot.consumed,
            errors: snapshot.errors,
            batches_processed: snapshot.batches_processed,
            retry_count: snapshot.retry_count,
            elapsed_ms: snapshot.elapsed.as_millis() as u64,
            throughput: snapshot.throughput(),
            failure: None,
        }
    }

    /// A collection that failed before producing metrics.
    pub fn failed(
        source_collection: impl Into<String>,
        target_table: impl Into<String>,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            failure: Some(failure.into()),
            ..Self::new(
                source_collection,
                target_table,
                0,
                &MetricsSnapshot::default(),
                ProgressStatus::Failed,
            )
        }
    }

    pub fn with_failure(mut self, failure: impl Into<String>) -> Self {
        self.status = ProgressStatus::Failed;
        self.failure = Some(failure.into());
        self
    }
}

/// Outcome of a whole run across all collections.
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub migration_id: Uuid,
    pub plan_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub collections: Vec<CollectionReport>,
}

impl RunReport {
    pub fn new(run: &MigrationRun, mut collections: Vec<CollectionReport>) -> Self {
        collections.sort_by(|a, b| a.target_table.cmp(&b.target_table));
        Self {
            run_id: run.id,
            migration_id: run.migration_id,
            plan_id: run.plan_id,
            status: run.status,
            started_at: run.started_at,
            ended_at: run.ended_at,
            collections,
        }
    }

    pub fn total_consumed(&self) -> u64 {
        self.collections.iter().map(|c| c.consumed).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.collections.iter().map(|c| c.errors).sum()
    }

    pub fn failed_collections(&self) -> impl Iterator<Item = &CollectionReport> {
        self.collections
            .iter()
            .filter(|c| c.status == ProgressStatus::Failed)
    }

    pub fn collection(&self, target_table: &str) -> Option<&CollectionReport> {
        self.collections
            .iter()
            .find(|c| c.target_table == target_table)
    }
}
