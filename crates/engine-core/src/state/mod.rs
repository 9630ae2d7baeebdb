use crate::error::StoreError;
use async_trait::async_trait;
use model::{
    execution::{
        migration::{Migration, MigrationProgress, MigrationRun},
        status::{ProgressStatus, RunStatus},
    },
    transform::mapping::MigrationPlan,
};
use uuid::Uuid;

pub mod memory;
pub mod sled_store;

/// Records the engine reads (migrations, plans) and writes (runs, progress).
///
/// `add_rows_processed` is called concurrently by every consumer of a
/// collection and must be an atomic add at the store.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn save_migration(&self, migration: &Migration) -> Result<(), StoreError>;
    async fn load_migration(&self, id: Uuid) -> Result<Option<Migration>, StoreError>;

    async fn save_plan(&self, plan: &MigrationPlan) -> Result<(), StoreError>;
    /// Most recently created plan of `migration_id`.
    async fn latest_plan(&self, migration_id: Uuid) -> Result<Option<MigrationPlan>, StoreError>;

    async fn create_run(&self, run: &MigrationRun) -> Result<(), StoreError>;
    async fn load_run(&self, run_id: Uuid) -> Result<Option<MigrationRun>, StoreError>;
    /// Sets the terminal status and end time.
    async fn finish_run(&self, run_id: Uuid, status: RunStatus) -> Result<MigrationRun, StoreError>;

    async fn create_progress(&self, progress: &MigrationProgress) -> Result<(), StoreError>;
    async fn set_rows_total(&self, progress_id: Uuid, total: u64) -> Result<(), StoreError>;
    /// Atomically adds `delta` and returns the new total.
    async fn add_rows_processed(&self, progress_id: Uuid, delta: u64) -> Result<u64, StoreError>;
    async fn finish_progress(
        &self,
        progress_id: Uuid,
        status: ProgressStatus,
        rows_processed: u64,
    ) -> Result<MigrationProgress, StoreError>;
    async fn load_progress(&self, progress_id: Uuid)
    -> Result<Option<MigrationProgress>, StoreError>;
    async fn progress_for_run(&self, run_id: Uuid) -> Result<Vec<MigrationProgress>, StoreError>;
}
