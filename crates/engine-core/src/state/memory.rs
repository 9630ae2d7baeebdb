//! Process-local store for embedding and tests. Every update happens under
//! one mutex, so read-modify-write operations are atomic.

use crate::{error::StoreError, state::MigrationStore};
use async_trait::async_trait;
use chrono::Utc;
use model::{
    execution::{
        migration::{Migration, MigrationProgress, MigrationRun},
        status::{ProgressStatus, RunStatus},
    },
    transform::mapping::MigrationPlan,
};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    migrations: HashMap<Uuid, Migration>,
    plans: Vec<MigrationPlan>,
    runs: HashMap<Uuid, MigrationRun>,
    progress: HashMap<Uuid, MigrationProgress>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn update_progress(
        &self,
        progress_id: Uuid,
        apply: impl FnOnce(&mut MigrationProgress),
    ) -> Result<MigrationProgress, StoreError> {
        let mut inner = self.lock()?;
        let progress = inner
            .progress
            .get_mut(&progress_id)
            .ok_or_else(|| StoreError::not_found("progress", progress_id))?;
        apply(progress);
        progress.updated_at = Utc::now();
        Ok(progress.clone())
    }
}

#[async_trait]
impl MigrationStore for MemoryStore {
    async fn save_migration(&self, migration: &Migration) -> Result<(), StoreError> {
        self.lock()?
            .migrations
            .insert(migration.id, migration.clone());
        Ok(())
    }

    async fn load_migration(&self, id: Uuid) -> Result<Option<Migration>, StoreError> {
        Ok(self.lock()?.migrations.get(&id).cloned())
    }

    async fn save_plan(&self, plan: &MigrationPlan) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.plans.retain(|p| p.id != plan.id);
        inner.plans.push(plan.clone());
        Ok(())
    }

    async fn latest_plan(&self, migration_id: Uuid) -> Result<Option<MigrationPlan>, StoreError> {
        Ok(self
            .lock()?
            .plans
            .iter()
            .filter(|p| p.migration_id == migration_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn create_run(&self, run: &MigrationRun) -> Result<(), StoreError> {
        self.lock()?.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<MigrationRun>, StoreError> {
        Ok(self.lock()?.runs.get(&run_id).cloned())
    }

    async fn finish_run(&self, run_id: Uuid, status: RunStatus) -> Result<MigrationRun, StoreError> {
        let mut inner = self.lock()?;
        let run = inner
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| StoreError::not_found("run", run_id))?;
        run.status = status;
        run.ended_at = Some(Utc::now());
        Ok(run.clone())
    }

    async fn create_progress(&self, progress: &MigrationProgress) -> Result<(), StoreError> {
        self.lock()?.progress.insert(progress.id, progress.clone());
        Ok(())
    }

    async fn set_rows_total(&self, progress_id: Uuid, total: u64) -> Result<(), StoreError> {
        self.update_progress(progress_id, |p| p.rows_total = total)?;
        Ok(())
    }

    async fn add_rows_processed(&self, progress_id: Uuid, delta: u64) -> Result<u64, StoreError> {
        let updated = self.update_progress(progress_id, |p| p.rows_processed += delta)?;
        Ok(updated.rows_processed)
    }

    async fn finish_progress(
        &self,
        progress_id: Uuid,
        status: ProgressStatus,
        rows_processed: u64,
    ) -> Result<MigrationProgress, StoreError> {
        self.update_progress(progress_id, |p| {
            p.status = status;
            p.rows_processed = rows_processed;
        })
    }

    async fn load_progress(
        &self,
        progress_id: Uuid,
    ) -> Result<Option<MigrationProgress>, StoreError> {
        Ok(self.lock()?.progress.get(&progress_id).cloned())
    }

    async fn progress_for_run(&self, run_id: Uuid) -> Result<Vec<MigrationProgress>, StoreError> {
        let mut rows: Vec<_> = self
            .lock()?
            .progress
            .values()
            .filter(|p| p.run_id == run_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(rows)
    }
}
