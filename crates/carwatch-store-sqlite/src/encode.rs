//! Conversion between gateway [`Value`]s and SQLite's storage classes.
//!
//! SQLite has no boolean type; booleans are stored as `0`/`1` integers and
//! come back as [`Value::Int`], which [`Value::as_bool`] accepts. A NULL
//! carries no column type on the way out, so it decodes as a text null.

use carwatch_core::value::{SqlType, Value};
use rusqlite::types::{Value as Sql, ValueRef};

pub fn encode_value(value: &Value) -> Sql {
  match value {
    Value::Null(_) => Sql::Null,
    Value::Int(i) => Sql::Integer(*i),
    Value::Real(f) => Sql::Real(*f),
    Value::Text(s) => Sql::Text(s.clone()),
    Value::Bool(b) => Sql::Integer(i64::from(*b)),
  }
}

pub fn encode_params(values: &[Value]) -> Vec<Sql> {
  values.iter().map(encode_value).collect()
}

pub fn decode_value(raw: ValueRef<'_>) -> Value {
  match raw {
    ValueRef::Null => Value::Null(SqlType::Text),
    ValueRef::Integer(i) => Value::Int(i),
    ValueRef::Real(f) => Value::Real(f),
    ValueRef::Text(t) | ValueRef::Blob(t) => {
      Value::Text(String::from_utf8_lossy(t).into_owned())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bool_is_stored_as_integer() {
    assert_eq!(encode_value(&Value::Bool(true)), Sql::Integer(1));
    assert_eq!(encode_value(&Value::Bool(false)), Sql::Integer(0));
  }

  #[test]
  fn typed_null_loses_its_type() {
    assert_eq!(encode_value(&Value::Null(SqlType::Int)), Sql::Null);
    assert!(decode_value(ValueRef::Null).is_null());
  }
}
