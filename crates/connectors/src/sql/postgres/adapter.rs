use crate::sql::{
    base::{
        error::{ConnectorError, DbError},
        target::TargetStore,
    },
    postgres::{params::PgParamStore, pool::PgPool},
};
use async_trait::async_trait;
use model::core::value::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct PgAdapter {
    pool: Arc<PgPool>,
}

impl PgAdapter {
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self, ConnectorError> {
        let pool = PgPool::connect(url, pool_size).await?;
        Ok(PgAdapter {
            pool: Arc::new(pool),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }
}

#[async_trait]
impl TargetStore for PgAdapter {
    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        let client = self.pool.acquire().await;
        client.batch_execute(sql).await?;
        Ok(())
    }

    async fn write_batch(&self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, DbError> {
        let mut client = self.pool.acquire().await;
        let tx = client.transaction().await?;
        let statement = tx.prepare(sql).await?;

        let mut written = 0u64;
        for row in rows {
            let bindings = PgParamStore::from_values(row);
            written += tx.execute(&statement, &bindings.as_refs()).await?;
        }

        tx.commit().await?;
        debug!(rows = written, "Committed batch");
        Ok(written)
    }

    async fn ping(&self) -> Result<(), DbError> {
        let client = self.pool.acquire().await;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}
