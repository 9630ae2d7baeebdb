use async_trait::async_trait;
use connectors::{
    file::jsonl::source::JsonLinesSource,
    source::DocumentSource,
    sql::{
        base::{error::ConnectorError, target::TargetStore},
        postgres::adapter::PgAdapter,
    },
};
use engine_config::settings::validated::MigrationSettings;
use model::execution::{connection::SourceConnection, migration::Migration};
use std::sync::Arc;
use tracing::info;

/// Source session and pooled target connection shared by every collection
/// of one run.
#[derive(Clone)]
pub struct Connections {
    pub source: Arc<dyn DocumentSource>,
    pub target: Arc<dyn TargetStore>,
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        migration: &Migration,
        settings: &MigrationSettings,
    ) -> Result<Connections, ConnectorError>;
}

/// JSON-lines exports on the source side, Postgres on the target side.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectionFactory;

#[async_trait]
impl ConnectionFactory for DefaultConnectionFactory {
    async fn connect(
        &self,
        migration: &Migration,
        settings: &MigrationSettings,
    ) -> Result<Connections, ConnectorError> {
        let source = create_source(&migration.source)?;

        let url = migration.target.connection_url().ok_or_else(|| {
            ConnectorError::InvalidUrl("target credentials are incomplete".to_string())
        })?;
        let target = PgAdapter::connect(&url, settings.target_pool_size).await?;
        target.ping().await?;

        info!(
            source = %source.name(),
            pool_size = target.pool_size(),
            "Connections established"
        );

        Ok(Connections {
            source,
            target: Arc::new(target),
        })
    }
}

pub fn create_source(conn: &SourceConnection) -> Result<Arc<dyn DocumentSource>, ConnectorError> {
    match conn {
        SourceConnection::JsonLines { directory } => {
            let source = JsonLinesSource::open(directory.clone())
                .map_err(|e| ConnectorError::Source(e.to_string()))?;
            Ok(Arc::new(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_directory_is_connection_error() {
        let conn = SourceConnection::JsonLines {
            directory: "/definitely/not/here".into(),
        };
        assert!(matches!(create_source(&conn), Err(ConnectorError::Source(_))));
    }

    #[test]
    fn test_existing_directory_opens() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SourceConnection::JsonLines {
            directory: dir.path().to_path_buf(),
        };
        assert!(create_source(&conn).is_ok());
    }
}
