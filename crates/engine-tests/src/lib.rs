//! In-memory doubles and fixtures for exercising the engine without a
//! database.

#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    error::SourceError,
    memory::MemorySource,
    source::{DocumentCursor, DocumentSource},
    sql::base::{
        error::{ConnectorError, DbError},
        target::TargetStore,
    },
};
use engine_config::settings::validated::MigrationSettings;
use engine_runtime::{ConnectionFactory, Connections};
use model::{
    core::{document::Document, value::Value},
    execution::migration::Migration,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::watch;

pub mod integration;
pub mod utils;

/// A write fails when any row carries `value` at parameter position `column`.
#[derive(Debug, Clone)]
struct PoisonValue {
    column: usize,
    value: Value,
}

#[derive(Debug, Default)]
struct TargetState {
    tables: HashMap<String, Vec<Vec<Value>>>,
    ddl: Vec<String>,
    write_calls: usize,
    fail_next_writes: usize,
    poison: Vec<PoisonValue>,
    broken_tables: Vec<String>,
}

/// Target store keeping rows per table in memory. Table creation is
/// idempotent, writes are all-or-nothing per batch, and failures can be
/// injected per value or for the next n writes. Writes can be paused to
/// simulate a slow target.
pub struct MemoryTarget {
    state: Mutex<TargetState>,
    gate: watch::Sender<bool>,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self {
            state: Mutex::new(TargetState::default()),
            gate: watch::Sender::new(true),
        }
    }
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TargetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every write of a batch containing `value` at `column` fails.
    pub fn fail_batches_containing(&self, column: usize, value: impl Into<Value>) {
        self.state().poison.push(PoisonValue {
            column,
            value: value.into(),
        });
    }

    pub fn fail_next_writes(&self, n: usize) {
        self.state().fail_next_writes = n;
    }

    /// `CREATE TABLE` for `table` fails.
    pub fn fail_ddl_for(&self, table: &str) {
        self.state().broken_tables.push(table.to_string());
    }

    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, Vec::len)
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<Value>> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(table)
    }

    pub fn ddl_statements(&self) -> Vec<String> {
        self.state().ddl.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.state().write_calls
    }
}

/// Table name following `prefix`, without identifier quotes.
fn table_after<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = sql.strip_prefix(prefix)?.trim_start();
    let end = rest.find([' ', '(']).unwrap_or(rest.len());
    Some(rest[..end].trim_matches('"'))
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        let table = table_after(sql, "CREATE TABLE IF NOT EXISTS")
            .ok_or_else(|| DbError::Unknown(format!("unsupported statement: {sql}")))?;

        let mut state = self.state();
        state.ddl.push(sql.to_string());
        if state.broken_tables.iter().any(|t| t == table) {
            return Err(DbError::Write(format!("permission denied for table {table}")));
        }
        state.tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn write_batch(&self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, DbError> {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let table = table_after(sql, "INSERT INTO")
            .ok_or_else(|| DbError::Unknown(format!("unsupported statement: {sql}")))?;

        let mut state = self.state();
        state.write_calls += 1;

        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(DbError::Write("connection reset by peer".into()));
        }

        let poisoned = state.poison.iter().any(|p| {
            rows.iter()
                .any(|row| row.get(p.column).is_some_and(|v| *v == p.value))
        });
        if poisoned {
            return Err(DbError::Write("value violates check constraint".into()));
        }

        let stored = state
            .tables
            .get_mut(table)
            .ok_or_else(|| DbError::Write(format!("relation \"{table}\" does not exist")))?;
        stored.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Source whose cursors fail after yielding `healthy_chunks` chunks.
pub struct FailingSource {
    inner: MemorySource,
    healthy_chunks: usize,
}

impl FailingSource {
    pub fn new(inner: MemorySource, healthy_chunks: usize) -> Self {
        Self {
            inner,
            healthy_chunks,
        }
    }
}

struct FailingCursor {
    inner: Box<dyn DocumentCursor>,
    remaining: usize,
}

#[async_trait]
impl DocumentCursor for FailingCursor {
    async fn next_chunk(&mut self) -> Result<Option<Vec<Document>>, SourceError> {
        if self.remaining == 0 {
            return Err(SourceError::Generic("cursor lost: connection reset".into()));
        }
        self.remaining -= 1;
        self.inner.next_chunk().await
    }
}

#[async_trait]
impl DocumentSource for FailingSource {
    fn name(&self) -> String {
        "failing".into()
    }

    async fn count(&self, collection: &str) -> Result<u64, SourceError> {
        self.inner.count(collection).await
    }

    async fn open_cursor(
        &self,
        collection: &str,
        fetch_size: usize,
    ) -> Result<Box<dyn DocumentCursor>, SourceError> {
        Ok(Box::new(FailingCursor {
            inner: self.inner.open_cursor(collection, fetch_size).await?,
            remaining: self.healthy_chunks,
        }))
    }
}

/// Hands out the same source and target to every run.
pub struct MemoryConnectionFactory {
    pub source: Arc<dyn DocumentSource>,
    pub target: Arc<MemoryTarget>,
}

impl MemoryConnectionFactory {
    pub fn new(source: Arc<dyn DocumentSource>, target: Arc<MemoryTarget>) -> Self {
        Self { source, target }
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn connect(
        &self,
        _migration: &Migration,
        _settings: &MigrationSettings,
    ) -> Result<Connections, ConnectorError> {
        Ok(Connections {
            source: self.source.clone(),
            target: self.target.clone(),
        })
    }
}
