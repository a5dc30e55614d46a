//! [`SqliteStore`], the SQLite implementation of [`Gateway`].

use std::{collections::BTreeMap, path::Path};

use carwatch_core::{
  gateway::{Backend, Gateway},
  sql::{self, Dialect, Predicate, Statement},
  value::{Field, Row, Value},
};
use rusqlite::params_from_iter;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  encode::{decode_value, encode_params},
  schema::{SCHEMA, SCHEMA_VERSION},
};

/// `?1`, `?2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
  fn placeholder(&self, index: usize) -> String { format!("?{index}") }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A carwatch store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  provisioned: bool,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, creating the schema if the file
  /// has never been provisioned.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self::init(conn).await?;
    info!(path = %path.display(), provisioned = store.provisioned, "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (found, provisioned) = conn
      .call(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if version == 0 {
          conn.execute_batch(SCHEMA)?;
          return Ok((version, true));
        }
        Ok((version, false))
      })
      .await?;
    if found > SCHEMA_VERSION {
      warn!(found, expected = SCHEMA_VERSION, "sqlite schema is newer than this build");
    }
    Ok(Self { conn, provisioned })
  }

  async fn query(&self, statement: Statement) -> Result<Vec<Row>> {
    debug!(sql = %statement.sql, "sqlite query");
    let Statement { sql, params } = statement;
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let mut rows = stmt.query(params_from_iter(encode_params(&params)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
          let mut values = Vec::with_capacity(columns.len());
          for i in 0..columns.len() {
            values.push(decode_value(row.get_ref(i)?));
          }
          out.push(Row::new(columns.clone(), values));
        }
        Ok(out)
      })
      .await?;
    Ok(rows)
  }

  async fn execute(&self, statement: Statement) -> Result<u64> {
    debug!(sql = %statement.sql, "sqlite execute");
    let Statement { sql, params } = statement;
    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(&sql, params_from_iter(encode_params(&params)))?;
        Ok(changed)
      })
      .await?;
    Ok(changed as u64)
  }
}

// ─── Gateway impl ────────────────────────────────────────────────────────────

impl Gateway for SqliteStore {
  type Error = Error;

  fn backend(&self) -> Backend { Backend::Sqlite }

  fn provisioned(&self) -> bool { self.provisioned }

  async fn select<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [&'a str],
    predicate: Option<&'a Predicate>,
  ) -> Result<Vec<Row>> {
    let statement = sql::select(&SqliteDialect, table, columns, predicate)?;
    self.query(statement).await
  }

  async fn insert<'a>(&'a self, table: &'a str, fields: &'a [Field]) -> Result<()> {
    let statement = sql::insert(&SqliteDialect, table, fields, None)?;
    self.execute(statement).await?;
    Ok(())
  }

  async fn insert_if_absent<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    conflict: &'a [&'a str],
  ) -> Result<bool> {
    let statement = sql::insert(&SqliteDialect, table, fields, Some(conflict))?;
    Ok(self.execute(statement).await? == 1)
  }

  async fn update<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    predicate: &'a Predicate,
  ) -> Result<u64> {
    let statement = sql::update(&SqliteDialect, table, fields, predicate)?;
    self.execute(statement).await
  }

  async fn latest<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
    limit: usize,
  ) -> Result<Vec<Row>> {
    self.query(sql::latest(&SqliteDialect, table, column, limit)?).await
  }

  async fn max_id<'a>(&'a self, table: &'a str, column: &'a str) -> Result<Option<i64>> {
    let rows = self.query(sql::max(table, column)?).await?;
    Ok(rows.first().and_then(|r| r.values().first()).and_then(Value::as_i64))
  }

  async fn get_by_natural_key<'a>(
    &'a self,
    table: &'a str,
    key: &'a [Field],
  ) -> Result<Option<BTreeMap<String, Value>>> {
    let predicate = Predicate::from_fields(key);
    let statement = sql::select(&SqliteDialect, table, &[], Some(&predicate))?;
    let mut rows = self.query(statement).await?;
    match rows.len() {
      0 => Ok(None),
      1 => Ok(rows.pop().map(Row::into_map)),
      matches => Err(
        carwatch_core::Error::AmbiguousNaturalKey { table: table.to_owned(), matches }.into(),
      ),
    }
  }
}
