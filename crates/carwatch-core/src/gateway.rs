//! The `Gateway` trait: backend-agnostic, parameter-bound CRUD.
//!
//! Implemented by `carwatch-store-sqlite` (embedded file) and
//! `carwatch-store-postgres` (client/server). Everything above the storage
//! layer is generic over this trait; the backend is chosen once at startup.

use std::{collections::BTreeMap, fmt, future::Future};

use crate::{
  sql::Predicate,
  value::{Field, Row, Value},
};

/// Which engine a gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
  Postgres,
  Sqlite,
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Postgres => "postgres",
      Self::Sqlite => "sqlite",
    })
  }
}

/// Abstraction over a carwatch storage backend.
///
/// Every statement is committed before its future resolves. Table and
/// column names are validated identifiers; all values are bound.
pub trait Gateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn backend(&self) -> Backend;

  /// Whether opening this gateway created the schema.
  fn provisioned(&self) -> bool;

  /// Rows of `table` matching `predicate`, ordered by the first selected
  /// column. An empty `columns` slice selects every column.
  fn select<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [&'a str],
    predicate: Option<&'a Predicate>,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;

  /// Insert the persisted subset of `fields`.
  fn insert<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Insert unless a row conflicting on `conflict` already exists.
  /// Returns `false` when the insert was skipped.
  fn insert_if_absent<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    conflict: &'a [&'a str],
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Update the persisted subset of `fields` on rows matching `predicate`.
  /// Returns the number of rows changed.
  fn update<'a>(
    &'a self,
    table: &'a str,
    fields: &'a [Field],
    predicate: &'a Predicate,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// At most `limit` rows of `table`, highest `column` first.
  fn latest<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;

  /// Largest value of `column`, or `None` for an empty table.
  fn max_id<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + 'a;

  /// The single row whose `key` fields all equal the given values.
  ///
  /// Returns `None` when nothing matches and an error when more than one
  /// row does.
  fn get_by_natural_key<'a>(
    &'a self,
    table: &'a str,
    key: &'a [Field],
  ) -> impl Future<Output = Result<Option<BTreeMap<String, Value>>, Self::Error>> + Send + 'a;
}
