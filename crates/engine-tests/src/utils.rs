#![allow(dead_code)]

use crate::{MemoryConnectionFactory, MemoryTarget};
use connectors::{memory::MemorySource, source::DocumentSource};
use engine_config::{report::summary::RunReport, settings::validated::MigrationSettings};
use engine_core::state::{MigrationStore, memory::MemoryStore};
use engine_runtime::MigrationCoordinator;
use model::{
    core::{document::Document, object_id::ObjectId, value::Value},
    execution::{
        connection::{SourceConnection, TargetCredentials},
        migration::Migration,
    },
    transform::mapping::{CollectionMapping, ColumnMapping, MigrationPlan},
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Deterministic object id for document `n`.
pub fn object_id(n: u64) -> ObjectId {
    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&[0x65, 0x00, 0x00, 0x01]);
    bytes[4..].copy_from_slice(&n.to_be_bytes());
    ObjectId::from_bytes(bytes)
}

/// `n` order documents: `_id`, `seq`, `order` (a reserved word), `customer`
/// (a nested document referencing an id) and `tags`.
pub fn order_documents(n: u64) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let mut customer = Document::new();
            customer.insert("ref", object_id(1_000_000 + i % 7));
            customer.insert("tier", if i % 2 == 0 { "gold" } else { "silver" });

            let mut doc = Document::new();
            doc.insert("_id", object_id(i));
            doc.insert("seq", i as i64);
            doc.insert("order", format!("ORD-{i:05}"));
            doc.insert("customer", customer);
            doc.insert("tags", Value::Array(vec!["new".into(), Value::ObjectId(object_id(i))]));
            doc
        })
        .collect()
}

/// Column positions: 0 `id`, 1 `seq`, 2 `order`, 3 `customer`, 4 `tags`.
pub fn orders_mapping(table: &str) -> CollectionMapping {
    CollectionMapping::new("orders", table)
        .column(ColumnMapping::new("id", "_id", "UUID").primary_key())
        .column(ColumnMapping::new("seq", "seq", "BIGINT").not_null())
        .column(ColumnMapping::new("order", "order", "VARCHAR(32)"))
        .column(ColumnMapping::new("customer", "customer", "JSONB"))
        .column(ColumnMapping::new("tags", "tags", "JSONB"))
}

pub fn orders_source(n: u64) -> MemorySource {
    MemorySource::new().with_collection("orders", order_documents(n))
}

pub fn credentials() -> TargetCredentials {
    TargetCredentials {
        host: Some("localhost".into()),
        port: Some(5432),
        database: Some("testdb".into()),
        username: Some("user".into()),
        password: Some("password".into()),
        ssl_mode: Some("disable".into()),
    }
}

/// Settings with a fast retry backoff.
pub fn settings(batch_size: usize, consumer_threads: usize) -> MigrationSettings {
    MigrationSettings::builder()
        .batch_size(batch_size)
        .consumer_threads(consumer_threads)
        .queue_capacity(8)
        .source_fetch_size(300)
        .max_retries(3)
        .retry_delay_ms(1)
        .build()
        .expect("valid settings")
}

/// Saves a migration and its plan; returns the migration id.
pub async fn seed(store: &dyn MigrationStore, mappings: Vec<CollectionMapping>) -> Uuid {
    let migration = Migration {
        id: Uuid::new_v4(),
        name: "orders-to-pg".into(),
        source: SourceConnection::JsonLines {
            directory: "/unused".into(),
        },
        target: credentials(),
    };
    store.save_migration(&migration).await.expect("save migration");
    store
        .save_plan(&MigrationPlan::new(migration.id, mappings))
        .await
        .expect("save plan");
    migration.id
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub target: Arc<MemoryTarget>,
    pub coordinator: MigrationCoordinator,
}

impl Harness {
    pub fn new(source: Arc<dyn DocumentSource>, settings: MigrationSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryTarget::new());
        let factory = Arc::new(MemoryConnectionFactory::new(source, target.clone()));
        let coordinator = MigrationCoordinator::new(store.clone(), factory, settings);
        Self {
            store,
            target,
            coordinator,
        }
    }

    /// Seeds `mappings` and runs them to completion.
    pub async fn run(&self, mappings: Vec<CollectionMapping>) -> RunReport {
        let id = seed(self.store.as_ref(), mappings).await;
        tokio::time::timeout(
            Duration::from_secs(30),
            self.coordinator.execute_migration(id, CancellationToken::new()),
        )
        .await
        .expect("migration finished in time")
        .expect("migration ran")
    }
}
