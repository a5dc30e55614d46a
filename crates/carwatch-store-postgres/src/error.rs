//! Error type for `carwatch-store-postgres`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] carwatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// A result column of a type the gateway does not map.
  #[error("column {column:?} has unsupported type {type_name}")]
  UnsupportedType { column: String, type_name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
