use crate::sql::{
    base::error::ConnectorError,
    postgres::utils::{connect_client, parse_config},
};
use futures_util::future::try_join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::Client;
use tracing::info;

/// Fixed set of clients handed out round-robin. A caller gets an idle client
/// when one exists, otherwise waits on the next one in turn.
pub struct PgPool {
    clients: Vec<Mutex<Client>>,
    next: AtomicUsize,
}

impl PgPool {
    pub async fn connect(url: &str, size: usize) -> Result<Self, ConnectorError> {
        let config = parse_config(url)?;
        let size = size.max(1);
        let clients = try_join_all((0..size).map(|_| connect_client(config.clone()))).await?;
        info!(size, "Postgres pool ready");

        Ok(Self {
            clients: clients.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.clients.len()
    }

    pub async fn acquire(&self) -> MutexGuard<'_, Client> {
        let start = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        for offset in 0..self.clients.len() {
            let idx = (start + offset) % self.clients.len();
            if let Ok(guard) = self.clients[idx].try_lock() {
                return guard;
            }
        }
        self.clients[start].lock().await
    }
}
