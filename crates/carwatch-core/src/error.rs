//! Error types for `carwatch-core`.

use thiserror::Error;

use crate::value::SqlType;

#[derive(Debug, Error)]
pub enum Error {
  /// A record arrived carrying an id that disagrees with the id its natural
  /// key resolves to, or that already belongs to a different key.
  #[error("identity conflict in {table}: supplied id {supplied}, resolved id {resolved}")]
  IdentityConflict {
    table:    &'static str,
    supplied: i64,
    resolved: i64,
  },

  #[error("natural key in {table} matches {matches} rows")]
  AmbiguousNaturalKey { table: String, matches: usize },

  #[error("invalid SQL identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("update of {0} without a predicate")]
  UnboundedUpdate(String),

  #[error("nothing to write to {0}")]
  NoColumns(String),

  #[error("column {0:?} missing from row")]
  MissingColumn(String),

  #[error("column {column:?}: expected {expected:?}, found {found:?}")]
  TypeMismatch {
    column:   String,
    expected: SqlType,
    found:    SqlType,
  },

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("scrape session {0} is already closed")]
  SessionClosed(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error that can be recorded on a closed scrape session.
pub trait Fault: std::fmt::Display {
  /// Short, stable classification stored as the session's `error_kind`.
  fn kind(&self) -> &'static str;
}

impl Fault for Error {
  fn kind(&self) -> &'static str {
    match self {
      Self::IdentityConflict { .. } => "IdentityConflict",
      Self::AmbiguousNaturalKey { .. } => "AmbiguousNaturalKey",
      Self::InvalidIdentifier(_) => "InvalidIdentifier",
      Self::UnboundedUpdate(_) => "UnboundedUpdate",
      Self::NoColumns(_) => "NoColumns",
      Self::MissingColumn(_) => "MissingColumn",
      Self::TypeMismatch { .. } => "TypeMismatch",
      Self::DateParse(_) => "DateParse",
      Self::SessionClosed(_) => "SessionClosed",
      Self::Store(_) => "Store",
    }
  }
}
