//! [`PostgresStore`], the PostgreSQL implementation of [`Gateway`].

use std::{collections::BTreeMap, time::Duration};

use carwatch_core::{
  gateway::{Backend, Gateway},
  sql::{self, Dialect, Predicate, Statement},
  value::{Field, Row, Value},
};
use sqlx::{
  PgPool,
  postgres::{PgConnectOptions, PgPoolOptions},
};
use tracing::{debug, info};

use crate::{
  Result,
  encode::{bind, decode_row},
  schema::SCHEMA,
};

/// `$1`, `$2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
  fn placeholder(&self, index: usize) -> String { format!("${index}") }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A carwatch store on a PostgreSQL server.
#[derive(Clone)]
pub struct PostgresStore {
  pool:        PgPool,
  provisioned: bool,
}

impl PostgresStore {
  /// Connect to `url`, failing if no connection is made within `timeout`.
  pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
    let options: PgConnectOptions = url.parse()?;
    Self::connect_with(options, timeout).await
  }

  pub async fn connect_with(options: PgConnectOptions, timeout: Duration) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(5)
      .acquire_timeout(timeout)
      .connect_with(options)
      .await?;

    let existing: Option<String> =
      sqlx::query_scalar("SELECT to_regclass('scrapes')::text")
        .fetch_one(&pool)
        .await?;
    let provisioned = existing.is_none();
    if provisioned {
      sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    }
    info!(provisioned, "connected to postgres store");
    Ok(Self { pool, provisioned })
  }

  async fn query(&self, statement: Statement) -> Result<Vec<Row>> {
    debug!(sql = %statement.sql, "postgres query");
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.params {
      query = bind(query, value);
    }
    let rows = query.fetch_all(&self.pool).await?;
    rows.iter().map(decode_row).collect()
  }

  async fn execute(&self, statement: Statement) -> Result<u64> {
    debug!(sql = %statement.sql, "postgres execute");
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.params {
      query = bind(query, value);
    }
    Ok(query.execute(&self.pool).await?.rows_affected())
  }
}

// ─── Gateway impl ────────────────────────────────────────────────────────────

impl Gateway for PostgresStore {
  type Error = crate::Error;

  fn backend(&self) -> Backend { Backend::Postgres }

  fn provisioned(&self) -> bool { self.provisioned }

  async fn select<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [&'a str],
    predicate: Option<&'a Predicate>,
  ) -> Result<Vec<Row>> {
    let statement = sql::select(&PostgresDialect, table, columns, predicate)?;
    self.query(statement).await
  }

  async fn insert<'a>(&'a self, table: &'a str, fields: &'a [Field]) -> Result<()> {
    let statement = sql::insert(&PostgresDialect, table, fields, None)?;
    self.execute(statement).await?;
    Ok(())
  }

  async fn insert_if_absent<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    conflict: &'a [&'a str],
  ) -> Result<bool> {
    let statement = sql::insert(&PostgresDialect, table, fields, Some(conflict))?;
    Ok(self.execute(statement).await? == 1)
  }

  async fn update<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    predicate: &'a Predicate,
  ) -> Result<u64> {
    let statement = sql::update(&PostgresDialect, table, fields, predicate)?;
    self.execute(statement).await
  }

  async fn latest<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
    limit: usize,
  ) -> Result<Vec<Row>> {
    self.query(sql::latest(&PostgresDialect, table, column, limit)?).await
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
    let statement = sql::select(&PostgresDialect, table, &[], Some(&predicate))?;
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
