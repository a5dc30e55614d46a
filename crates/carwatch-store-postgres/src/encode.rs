//! Binding gateway [`Value`]s as sqlx parameters and decoding result rows.

use carwatch_core::value::{Row, SqlType, Value};
use sqlx::{
  Column as _, Postgres, Row as _, TypeInfo as _,
  postgres::{PgArguments, PgRow},
  query::Query,
};

use crate::{Error, Result};

/// Bind one value. Nulls bind as a `None` of their column's Rust type so
/// Postgres can infer the parameter type.
pub fn bind<'q>(
  query: Query<'q, Postgres, PgArguments>,
  value: &Value,
) -> Query<'q, Postgres, PgArguments> {
  match value {
    Value::Null(SqlType::Int) => query.bind(None::<i64>),
    Value::Null(SqlType::Real) => query.bind(None::<f64>),
    Value::Null(SqlType::Text) => query.bind(None::<String>),
    Value::Null(SqlType::Bool) => query.bind(None::<bool>),
    Value::Int(i) => query.bind(*i),
    Value::Real(f) => query.bind(*f),
    Value::Text(s) => query.bind(s.clone()),
    Value::Bool(b) => query.bind(*b),
  }
}

fn decode_column(row: &PgRow, index: usize) -> Result<Value> {
  let column = &row.columns()[index];
  let (ty, value) = match column.type_info().name() {
    "INT2" => (SqlType::Int, row.try_get::<Option<i16>, _>(index)?.map(|v| Value::Int(v.into()))),
    "INT4" => (SqlType::Int, row.try_get::<Option<i32>, _>(index)?.map(|v| Value::Int(v.into()))),
    "INT8" => (SqlType::Int, row.try_get::<Option<i64>, _>(index)?.map(Value::Int)),
    "FLOAT4" => (SqlType::Real, row.try_get::<Option<f32>, _>(index)?.map(|v| Value::Real(v.into()))),
    "FLOAT8" => (SqlType::Real, row.try_get::<Option<f64>, _>(index)?.map(Value::Real)),
    "BOOL" => (SqlType::Bool, row.try_get::<Option<bool>, _>(index)?.map(Value::Bool)),
    "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
      (SqlType::Text, row.try_get::<Option<String>, _>(index)?.map(Value::Text))
    }
    other => {
      return Err(Error::UnsupportedType {
        column:    column.name().to_owned(),
        type_name: other.to_owned(),
      });
    }
  };
  Ok(value.unwrap_or(Value::Null(ty)))
}

pub fn decode_row(row: &PgRow) -> Result<Row> {
  let columns = row.columns().iter().map(|c| c.name().to_owned()).collect();
  let values = (0..row.len())
    .map(|i| decode_column(row, i))
    .collect::<Result<Vec<_>>>()?;
  Ok(Row::new(columns, values))
}
