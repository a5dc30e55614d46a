//! Choosing the storage backend once, at startup.

use anyhow::Context as _;
use carwatch_core::gateway::Gateway as _;
use carwatch_store_postgres::PostgresStore;
use carwatch_store_sqlite::SqliteStore;
use tracing::{info, warn};

use crate::config::DatabaseSettings;

/// The connected backend. Matched once by the caller, which then runs
/// generic code over the concrete store.
pub enum Selected {
  Postgres(PostgresStore),
  Sqlite(SqliteStore),
}

/// Connect to Postgres when configured and allowed, falling back to the
/// SQLite file on any connection failure.
pub async fn connect(db: &DatabaseSettings, sqlite_only: bool) -> anyhow::Result<Selected> {
  if let Some(url) = db.postgres_url.as_deref().filter(|_| !sqlite_only) {
    match PostgresStore::connect(url, db.connect_timeout()).await {
      Ok(store) => {
        info!(backend = %store.backend(), provisioned = store.provisioned(), "storage selected");
        return Ok(Selected::Postgres(store));
      }
      Err(e) => warn!(error = %e, "postgres unavailable, falling back to sqlite"),
    }
  }

  let store = SqliteStore::open(&db.sqlite_path)
    .await
    .with_context(|| format!("failed to open sqlite store at {:?}", db.sqlite_path))?;
  info!(backend = %store.backend(), provisioned = store.provisioned(), "storage selected");
  Ok(Selected::Sqlite(store))
}
