use crate::{
    error::MigrationError,
    execution::{
        collection::{CollectionContext, process_collection},
        factory::ConnectionFactory,
    },
};
use engine_config::{
    report::summary::{CollectionReport, RunReport},
    settings::validated::MigrationSettings,
};
use engine_core::state::MigrationStore;
use model::{
    execution::{
        migration::{Migration, MigrationRun},
        status::{ProgressStatus, RunStatus},
    },
    transform::mapping::MigrationPlan,
};
use std::{collections::HashMap, sync::Arc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Runs migrations: one concurrent pipeline per collection mapping of the
/// latest plan, joined before the run status is finalized.
#[derive(Clone)]
pub struct MigrationCoordinator {
    store: Arc<dyn MigrationStore>,
    factory: Arc<dyn ConnectionFactory>,
    settings: MigrationSettings,
}

struct PreparedRun {
    run: MigrationRun,
    migration: Migration,
    plan: MigrationPlan,
}

impl MigrationCoordinator {
    pub fn new(
        store: Arc<dyn MigrationStore>,
        factory: Arc<dyn ConnectionFactory>,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            store,
            factory,
            settings,
        }
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Runs the migration to completion. Configuration and connection errors
    /// are returned; collection failures are reported in the [`RunReport`]
    /// with the run marked FAILED.
    pub async fn execute_migration(
        &self,
        migration_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<RunReport, MigrationError> {
        let prepared = self.prepare(migration_id).await?;
        self.execute_run(prepared, cancel).await
    }

    /// Creates the run and executes it in the background. The returned run is
    /// RUNNING; the handle resolves once it is finalized.
    pub async fn start_migration(
        &self,
        migration_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<(MigrationRun, JoinHandle<Result<RunReport, MigrationError>>), MigrationError> {
        let prepared = self.prepare(migration_id).await?;
        let run = prepared.run.clone();
        let this = self.clone();
        let handle = tokio::spawn(async move { this.execute_run(prepared, cancel).await });
        Ok((run, handle))
    }

    async fn prepare(&self, migration_id: Uuid) -> Result<PreparedRun, MigrationError> {
        self.settings.validate()?;

        let migration = self
            .store
            .load_migration(migration_id)
            .await?
            .ok_or_else(|| {
                MigrationError::Configuration(format!("migration {migration_id} not found"))
            })?;

        let missing = migration.target.missing_fields();
        if !missing.is_empty() {
            return Err(MigrationError::Configuration(format!(
                "target credentials incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let plan = self.store.latest_plan(migration_id).await?.ok_or_else(|| {
            MigrationError::Configuration(format!("no plan found for migration {migration_id}"))
        })?;

        let run = MigrationRun::start(migration.id, plan.id);
        self.store.create_run(&run).await?;

        info!(
            run_id = %run.id,
            migration = %migration.name,
            plan_hash = %plan.hash(),
            collections = plan.table_mappings.len(),
            "Migration run started"
        );

        Ok(PreparedRun {
            run,
            migration,
            plan,
        })
    }

    async fn execute_run(
        &self,
        prepared: PreparedRun,
        cancel: CancellationToken,
    ) -> Result<RunReport, MigrationError> {
        let PreparedRun {
            run,
            migration,
            plan,
        } = prepared;

        let connections = match self.factory.connect(&migration, &self.settings).await {
            Ok(connections) => connections,
            Err(e) => {
                error!(run_id = %run.id, error = %e, "Failed to open connections");
                self.store.finish_run(run.id, RunStatus::Failed).await?;
                return Err(MigrationError::Connection(e));
            }
        };

        let ctx = CollectionContext {
            run_id: run.id,
            connections,
            store: self.store.clone(),
            settings: self.settings.clone(),
            cancel,
        };

        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for mapping in plan.table_mappings {
            let names_entry = (mapping.source_collection.clone(), mapping.target_table.clone());
            let handle = tasks.spawn(process_collection(ctx.clone(), mapping));
            names.insert(handle.id(), names_entry);
        }

        let mut reports = Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, report)) => reports.push(report),
                Err(e) => {
                    let (collection, table) = names.remove(&e.id()).unwrap_or_default();
                    error!(table = %table, error = %e, "Collection task aborted");
                    reports.push(CollectionReport::failed(collection, table, e.to_string()));
                }
            }
        }

        let status = if reports.iter().all(|r| r.status == ProgressStatus::Completed) {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        let finished = self.store.finish_run(run.id, status).await?;
        let report = RunReport::new(&finished, reports);

        info!(
            run_id = %finished.id,
            status = %finished.status,
            consumed = report.total_consumed(),
            errors = report.total_errors(),
            "Migration run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::factory::Connections;
    use async_trait::async_trait;
    use connectors::sql::base::error::ConnectorError;
    use engine_core::state::memory::MemoryStore;
    use model::{
        execution::connection::{SourceConnection, TargetCredentials},
        transform::mapping::{CollectionMapping, ColumnMapping},
    };

    struct Unreachable;

    #[async_trait]
    impl ConnectionFactory for Unreachable {
        async fn connect(
            &self,
            _migration: &Migration,
            _settings: &MigrationSettings,
        ) -> Result<Connections, ConnectorError> {
            Err(ConnectorError::Source("connection refused".into()))
        }
    }

    fn credentials() -> TargetCredentials {
        TargetCredentials {
            host: Some("localhost".into()),
            port: Some(5432),
            database: Some("app".into()),
            username: Some("app".into()),
            password: Some("secret".into()),
            ssl_mode: None,
        }
    }

    fn migration(target: TargetCredentials) -> Migration {
        Migration {
            id: Uuid::new_v4(),
            name: "orders".into(),
            source: SourceConnection::JsonLines {
                directory: "/tmp".into(),
            },
            target,
        }
    }

    fn plan(migration_id: Uuid) -> MigrationPlan {
        MigrationPlan::new(
            migration_id,
            vec![CollectionMapping::new("orders", "orders")
                .column(ColumnMapping::new("id", "_id", "UUID").primary_key())],
        )
    }

    fn coordinator(store: Arc<MemoryStore>) -> MigrationCoordinator {
        MigrationCoordinator::new(store, Arc::new(Unreachable), MigrationSettings::default())
    }

    #[tokio::test]
    async fn test_unknown_migration_is_configuration_error() {
        let store = Arc::new(MemoryStore::new());
        let err = coordinator(store)
            .execute_migration(Uuid::new_v4(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_incomplete_credentials_abort_before_any_run() {
        let store = Arc::new(MemoryStore::new());
        let mut creds = credentials();
        creds.password = Some("  ".into());
        let m = migration(creds);
        store.save_migration(&m).await.unwrap();
        store.save_plan(&plan(m.id)).await.unwrap();

        let err = coordinator(store)
            .execute_migration(m.id, CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            MigrationError::Configuration(msg) => assert!(msg.contains("password")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_plan_is_configuration_error() {
        let store = Arc::new(MemoryStore::new());
        let m = migration(credentials());
        store.save_migration(&m).await.unwrap();

        let err = coordinator(store)
            .execute_migration(m.id, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_marks_run_failed() {
        let store = Arc::new(MemoryStore::new());
        let m = migration(credentials());
        store.save_migration(&m).await.unwrap();
        store.save_plan(&plan(m.id)).await.unwrap();

        let (run, handle) = coordinator(store.clone())
            .start_migration(m.id, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Running);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, MigrationError::Connection(_)));

        let stored = store.load_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Failed);
        assert!(stored.ended_at.is_some());
    }
}
