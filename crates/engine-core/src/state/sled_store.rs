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
use serde::{Serialize, de::DeserializeOwned};
use sled::{
    Tree,
    transaction::{ConflictableTransactionError, TransactionError},
};
use std::path::Path;
use uuid::Uuid;

/// Embedded on-disk store.
///
/// Migrations and plans are written once and stored as JSON; runs and
/// progress rows are rewritten often and stored as bincode. Every
/// read-modify-write goes through a sled transaction.
pub struct SledMigrationStore {
    db: sled::Db,
    migrations: Tree,
    plans: Tree,
    runs: Tree,
    progress: Tree,
    progress_by_run: Tree,
}

impl SledMigrationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            migrations: db.open_tree("migrations")?,
            plans: db.open_tree("plans")?,
            runs: db.open_tree("runs")?,
            progress: db.open_tree("progress")?,
            progress_by_run: db.open_tree("progress_by_run")?,
            db,
        })
    }

    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Plans sort by creation time within a migration, so the last key under
    /// the migration prefix is the latest plan.
    #[inline]
    fn plan_key(plan: &MigrationPlan) -> String {
        format!(
            "{}:{:020}:{}",
            plan.migration_id,
            plan.created_at.timestamp_millis().max(0),
            plan.id
        )
    }

    #[inline]
    fn run_progress_key(run_id: Uuid, progress_id: Uuid) -> String {
        format!("{run_id}:{progress_id}")
    }

    fn get_bincode<T: DeserializeOwned>(tree: &Tree, key: Uuid) -> Result<Option<T>, StoreError> {
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Applies `apply` to the record under `key` inside a transaction and
    /// returns the stored result.
    fn update<T, F>(tree: &Tree, kind: &'static str, key: Uuid, apply: F) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&mut T),
    {
        let result = tree.transaction::<_, _, StoreError>(|tx| {
            let Some(bytes) = tx.get(key.as_bytes())? else {
                return Err(ConflictableTransactionError::Abort(StoreError::not_found(kind, key)));
            };
            let mut record: T = bincode::deserialize(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
            apply(&mut record);
            let encoded = bincode::serialize(&record)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
            tx.insert(key.as_bytes().as_slice(), encoded)?;
            Ok(record)
        });

        match result {
            Ok(record) => Ok(record),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }

    fn update_progress<F>(&self, progress_id: Uuid, apply: F) -> Result<MigrationProgress, StoreError>
    where
        F: Fn(&mut MigrationProgress),
    {
        Self::update(&self.progress, "progress", progress_id, |p: &mut MigrationProgress| {
            apply(p);
            p.updated_at = Utc::now();
        })
    }
}

#[async_trait]
impl MigrationStore for SledMigrationStore {
    async fn save_migration(&self, migration: &Migration) -> Result<(), StoreError> {
        let value = serde_json::to_vec(migration)?;
        self.migrations.insert(migration.id.as_bytes(), value)?;
        Ok(())
    }

    async fn load_migration(&self, id: Uuid) -> Result<Option<Migration>, StoreError> {
        match self.migrations.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save_plan(&self, plan: &MigrationPlan) -> Result<(), StoreError> {
        let value = serde_json::to_vec(plan)?;
        self.plans.insert(Self::plan_key(plan), value)?;
        Ok(())
    }

    async fn latest_plan(&self, migration_id: Uuid) -> Result<Option<MigrationPlan>, StoreError> {
        let prefix = format!("{migration_id}:");
        match self.plans.scan_prefix(prefix).next_back() {
            Some(item) => {
                let (_key, value) = item?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }

    async fn create_run(&self, run: &MigrationRun) -> Result<(), StoreError> {
        let value = bincode::serialize(run)?;
        self.runs.insert(run.id.as_bytes(), value)?;
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<MigrationRun>, StoreError> {
        Self::get_bincode(&self.runs, run_id)
    }

    async fn finish_run(&self, run_id: Uuid, status: RunStatus) -> Result<MigrationRun, StoreError> {
        Self::update(&self.runs, "run", run_id, |run: &mut MigrationRun| {
            run.status = status;
            run.ended_at = Some(Utc::now());
        })
    }

    async fn create_progress(&self, progress: &MigrationProgress) -> Result<(), StoreError> {
        let value = bincode::serialize(progress)?;
        self.progress.insert(progress.id.as_bytes(), value)?;
        self.progress_by_run.insert(
            Self::run_progress_key(progress.run_id, progress.id),
            progress.id.as_bytes().as_slice(),
        )?;
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
        Self::get_bincode(&self.progress, progress_id)
    }

    async fn progress_for_run(&self, run_id: Uuid) -> Result<Vec<MigrationProgress>, StoreError> {
        let mut rows = Vec::new();
        for item in self.progress_by_run.scan_prefix(format!("{run_id}:")) {
            let (_key, id_bytes) = item?;
            let id = Uuid::from_slice(&id_bytes)
                .map_err(|e| StoreError::Encoding(e.to_string()))?;
            if let Some(progress) = Self::get_bincode::<MigrationProgress>(&self.progress, id)? {
                rows.push(progress);
            }
        }
        rows.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::execution::connection::{SourceConnection, TargetCredentials};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn migration() -> Migration {
        Migration {
            id: Uuid::new_v4(),
            name: "shop".into(),
            source: SourceConnection::JsonLines {
                directory: "/data/export".into(),
            },
            target: TargetCredentials::default(),
        }
    }

    #[tokio::test]
    async fn test_migration_and_latest_plan_round_trip() {
        let dir = tempdir().unwrap();
        let store = SledMigrationStore::open(dir.path()).unwrap();

        let m = migration();
        store.save_migration(&m).await.unwrap();
        assert_eq!(store.load_migration(m.id).await.unwrap(), Some(m.clone()));

        let mut first = MigrationPlan::new(m.id, vec![]);
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = MigrationPlan::new(m.id, vec![]);
        store.save_plan(&second).await.unwrap();
        store.save_plan(&first).await.unwrap();

        let latest = store.latest_plan(m.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let dir = tempdir().unwrap();
        let store = SledMigrationStore::open(dir.path()).unwrap();

        let run = MigrationRun::start(Uuid::new_v4(), Uuid::new_v4());
        store.create_run(&run).await.unwrap();
        let finished = store.finish_run(run.id, RunStatus::Completed).await.unwrap();

        assert_eq!(finished.status, RunStatus::Completed);
        assert!(finished.ended_at.is_some());
        assert_eq!(store.load_run(run.id).await.unwrap(), Some(finished));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_progress_adds_are_atomic() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledMigrationStore::open(dir.path()).unwrap());
        let run_id = Uuid::new_v4();

        let progress = MigrationProgress::start(run_id, "orders", "orders");
        let id = progress.id;
        store.create_progress(&progress).await.unwrap();
        store.set_rows_total(id, 4_000).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.add_rows_processed(id, 10).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let rows = store.progress_for_run(run_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rows_processed, 4_000);
        assert_eq!(rows[0].rows_total, 4_000);
        assert_eq!(rows[0].percent_complete(), 100.0);
    }
}
