//! Backend-neutral column values, fields and rows.
//!
//! Nulls carry the SQL type they stand in for so that backends with strict
//! parameter typing (Postgres) can bind them without guessing.

use std::collections::BTreeMap;

use crate::{Error, Result};

// ─── Value ───────────────────────────────────────────────────────────────────

/// The SQL type a [`Value`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
  Int,
  Real,
  Text,
  Bool,
}

/// A single column value as exchanged with a [`Gateway`](crate::gateway::Gateway).
#[derive(Debug, Clone)]
pub enum Value {
  Null(SqlType),
  Int(i64),
  Real(f64),
  Text(String),
  Bool(bool),
}

impl Value {
  pub fn sql_type(&self) -> SqlType {
    match self {
      Self::Null(t) => *t,
      Self::Int(_) => SqlType::Int,
      Self::Real(_) => SqlType::Real,
      Self::Text(_) => SqlType::Text,
      Self::Bool(_) => SqlType::Bool,
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null(_)) }

  /// Integers, and booleans stored as integers by backends without a
  /// boolean type.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(i) => Some(*i),
      Self::Bool(b) => Some(i64::from(*b)),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Real(f) => Some(*f),
      Self::Int(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      Self::Int(i) => Some(*i != 0),
      _ => None,
    }
  }
}

/// Nulls compare equal whatever type they stand in for.
impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Null(_), Self::Null(_)) => true,
      (Self::Int(a), Self::Int(b)) => a == b,
      (Self::Real(a), Self::Real(b)) => a == b,
      (Self::Text(a), Self::Text(b)) => a == b,
      (Self::Bool(a), Self::Bool(b)) => a == b,
      _ => false,
    }
  }
}

/// Rust types with a fixed [`SqlType`]; lets `Option<T>` become a typed null.
pub trait Typed {
  const SQL_TYPE: SqlType;
}

impl Typed for i64 { const SQL_TYPE: SqlType = SqlType::Int; }
impl Typed for i32 { const SQL_TYPE: SqlType = SqlType::Int; }
impl Typed for f64 { const SQL_TYPE: SqlType = SqlType::Real; }
impl Typed for bool { const SQL_TYPE: SqlType = SqlType::Bool; }
impl Typed for String { const SQL_TYPE: SqlType = SqlType::Text; }
impl Typed for &str { const SQL_TYPE: SqlType = SqlType::Text; }

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Self::Int(i64::from(v)) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl<T> From<Option<T>> for Value
where
  T: Typed + Into<Value>,
{
  fn from(v: Option<T>) -> Self {
    match v {
      Some(v) => v.into(),
      None => Self::Null(T::SQL_TYPE),
    }
  }
}

// ─── Field ───────────────────────────────────────────────────────────────────

/// Whether a field is written to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
  Column,
  /// Carried on the record in memory only; never part of INSERT or UPDATE.
  Transient,
}

/// A named value produced by a record for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub name:        &'static str,
  pub value:       Value,
  pub persistence: Persistence,
}

impl Field {
  pub fn column(name: &'static str, value: impl Into<Value>) -> Self {
    Self { name, value: value.into(), persistence: Persistence::Column }
  }

  pub fn transient(name: &'static str, value: impl Into<Value>) -> Self {
    Self { name, value: value.into(), persistence: Persistence::Transient }
  }

  pub fn is_persisted(&self) -> bool { self.persistence == Persistence::Column }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One result row, in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  columns: Vec<String>,
  values:  Vec<Value>,
}

impl Row {
  pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
    debug_assert_eq!(columns.len(), values.len());
    Self { columns, values }
  }

  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn values(&self) -> &[Value] { &self.values }

  pub fn len(&self) -> usize { self.values.len() }

  pub fn is_empty(&self) -> bool { self.values.is_empty() }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self
      .columns
      .iter()
      .position(|c| c == column)
      .map(|i| &self.values[i])
  }

  fn require(&self, column: &str) -> Result<&Value> {
    self
      .get(column)
      .ok_or_else(|| Error::MissingColumn(column.to_owned()))
  }

  fn mismatch(column: &str, expected: SqlType, found: &Value) -> Error {
    Error::TypeMismatch {
      column: column.to_owned(),
      expected,
      found: found.sql_type(),
    }
  }

  pub fn i64(&self, column: &str) -> Result<i64> {
    let v = self.require(column)?;
    v.as_i64().ok_or_else(|| Self::mismatch(column, SqlType::Int, v))
  }

  pub fn opt_i64(&self, column: &str) -> Result<Option<i64>> {
    match self.require(column)? {
      Value::Null(_) => Ok(None),
      v => v
        .as_i64()
        .map(Some)
        .ok_or_else(|| Self::mismatch(column, SqlType::Int, v)),
    }
  }

  pub fn opt_f64(&self, column: &str) -> Result<Option<f64>> {
    match self.require(column)? {
      Value::Null(_) => Ok(None),
      v => v
        .as_f64()
        .map(Some)
        .ok_or_else(|| Self::mismatch(column, SqlType::Real, v)),
    }
  }

  pub fn string(&self, column: &str) -> Result<String> {
    let v = self.require(column)?;
    v.as_str()
      .map(str::to_owned)
      .ok_or_else(|| Self::mismatch(column, SqlType::Text, v))
  }

  pub fn opt_string(&self, column: &str) -> Result<Option<String>> {
    match self.require(column)? {
      Value::Null(_) => Ok(None),
      v => v
        .as_str()
        .map(|s| Some(s.to_owned()))
        .ok_or_else(|| Self::mismatch(column, SqlType::Text, v)),
    }
  }

  pub fn bool(&self, column: &str) -> Result<bool> {
    let v = self.require(column)?;
    v.as_bool().ok_or_else(|| Self::mismatch(column, SqlType::Bool, v))
  }

  /// Field-name to value map, the shape natural-key lookups hand back.
  pub fn into_map(self) -> BTreeMap<String, Value> {
    self.columns.into_iter().zip(self.values).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn none_becomes_typed_null() {
    let v: Value = None::<i64>.into();
    assert_eq!(v.sql_type(), SqlType::Int);
    assert!(v.is_null());

    let v: Value = None::<String>.into();
    assert_eq!(v.sql_type(), SqlType::Text);
  }

  #[test]
  fn nulls_of_different_types_are_equal() {
    assert_eq!(Value::Null(SqlType::Int), Value::Null(SqlType::Text));
    assert_ne!(Value::Int(1), Value::Bool(true));
  }

  #[test]
  fn row_accessors() {
    let row = Row::new(
      vec!["id".into(), "name".into(), "ok".into(), "gone".into()],
      vec![
        Value::Int(7),
        Value::Text("Ford".into()),
        Value::Int(1),
        Value::Null(SqlType::Real),
      ],
    );

    assert_eq!(row.i64("id").unwrap(), 7);
    assert_eq!(row.string("name").unwrap(), "Ford");
    assert!(row.bool("ok").unwrap());
    assert_eq!(row.opt_f64("gone").unwrap(), None);
    assert!(matches!(row.i64("missing"), Err(Error::MissingColumn(_))));
    assert!(matches!(
      row.i64("name"),
      Err(Error::TypeMismatch { expected: SqlType::Int, .. })
    ));
  }

  #[test]
  fn transient_fields_are_not_persisted() {
    assert!(Field::column("price", 10_i64).is_persisted());
    assert!(!Field::transient("price", 10_i64).is_persisted());
  }
}
