//! Parameter-bound statement construction shared by every backend.
//!
//! Table and column names cannot be bound, so they are validated as plain
//! identifiers instead. Every value travels as a parameter, on both sides of
//! an UPDATE.

use crate::{
  Error, Result,
  value::{Field, Value},
};

// ─── Dialect ─────────────────────────────────────────────────────────────────

/// The one thing the two SQL backends disagree on.
pub trait Dialect {
  /// Placeholder for the 1-based parameter `index`.
  fn placeholder(&self, index: usize) -> String;
}

// ─── Predicate ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
  /// `column = ?`, or `column IS NULL` when the value is null.
  Eq(String, Value),
  IsNull(String),
}

/// A conjunction of [`Clause`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
  clauses: Vec<Clause>,
}

impl Predicate {
  pub fn new() -> Self { Self::default() }

  pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.clauses.push(Clause::Eq(column.into(), value.into()));
    self
  }

  pub fn is_null(mut self, column: impl Into<String>) -> Self {
    self.clauses.push(Clause::IsNull(column.into()));
    self
  }

  /// Equality over every persisted field, as used for natural-key lookups.
  pub fn from_fields(fields: &[Field]) -> Self {
    fields
      .iter()
      .filter(|f| f.is_persisted())
      .fold(Self::new(), |p, f| p.eq(f.name, f.value.clone()))
  }

  pub fn clauses(&self) -> &[Clause] { &self.clauses }

  pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

  fn render(
    &self,
    dialect: &impl Dialect,
    params: &mut Vec<Value>,
  ) -> Result<String> {
    let mut parts = Vec::with_capacity(self.clauses.len());
    for clause in &self.clauses {
      match clause {
        Clause::Eq(col, v) if v.is_null() => {
          parts.push(format!("{} IS NULL", ident(col)?));
        }
        Clause::Eq(col, v) => {
          params.push(v.clone());
          parts.push(format!("{} = {}", ident(col)?, dialect.placeholder(params.len())));
        }
        Clause::IsNull(col) => parts.push(format!("{} IS NULL", ident(col)?)),
      }
    }
    Ok(parts.join(" AND "))
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

/// SQL text plus the values for its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only.
pub fn ident(name: &str) -> Result<&str> {
  let mut chars = name.chars();
  let ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
  if ok {
    Ok(name)
  } else {
    Err(Error::InvalidIdentifier(name.to_owned()))
  }
}

fn column_list<'a>(names: impl Iterator<Item = &'a str>) -> Result<String> {
  Ok(names.map(ident).collect::<Result<Vec<_>>>()?.join(", "))
}

/// `SELECT cols FROM table [WHERE ...] ORDER BY 1`; an empty column list
/// selects `*`.
pub fn select(
  dialect:   &impl Dialect,
  table:     &str,
  columns:   &[&str],
  predicate: Option<&Predicate>,
) -> Result<Statement> {
  let cols = if columns.is_empty() {
    "*".to_owned()
  } else {
    column_list(columns.iter().copied())?
  };
  let mut params = Vec::new();
  let mut sql = format!("SELECT {cols} FROM {}", ident(table)?);
  if let Some(p) = predicate.filter(|p| !p.is_empty()) {
    sql.push_str(" WHERE ");
    sql.push_str(&p.render(dialect, &mut params)?);
  }
  sql.push_str(" ORDER BY 1");
  Ok(Statement { sql, params })
}

/// `INSERT` of every persisted field. With `conflict` columns the statement
/// becomes `ON CONFLICT (...) DO NOTHING`, reporting zero affected rows when
/// the row already exists.
pub fn insert(
  dialect:  &impl Dialect,
  table:    &str,
  fields:   &[Field],
  conflict: Option<&[&str]>,
) -> Result<Statement> {
  let persisted: Vec<&Field> = fields.iter().filter(|f| f.is_persisted()).collect();
  if persisted.is_empty() {
    return Err(Error::NoColumns(table.to_owned()));
  }

  let cols = column_list(persisted.iter().map(|f| f.name))?;
  let placeholders = (1..=persisted.len())
    .map(|i| dialect.placeholder(i))
    .collect::<Vec<_>>()
    .join(", ");
  let params = persisted.iter().map(|f| f.value.clone()).collect();

  let mut sql = format!("INSERT INTO {} ({cols}) VALUES ({placeholders})", ident(table)?);
  if let Some(keys) = conflict.filter(|k| !k.is_empty()) {
    sql.push_str(&format!(
      " ON CONFLICT ({}) DO NOTHING",
      column_list(keys.iter().copied())?
    ));
  }
  Ok(Statement { sql, params })
}

/// `UPDATE table SET ... WHERE ...`, binding the SET values first and the
/// predicate values after them.
pub fn update(
  dialect:   &impl Dialect,
  table:     &str,
  fields:    &[Field],
  predicate: &Predicate,
) -> Result<Statement> {
  if predicate.is_empty() {
    return Err(Error::UnboundedUpdate(table.to_owned()));
  }
  let persisted: Vec<&Field> = fields.iter().filter(|f| f.is_persisted()).collect();
  if persisted.is_empty() {
    return Err(Error::NoColumns(table.to_owned()));
  }

  let mut params = Vec::with_capacity(persisted.len());
  let mut sets = Vec::with_capacity(persisted.len());
  for f in persisted {
    params.push(f.value.clone());
    sets.push(format!("{} = {}", ident(f.name)?, dialect.placeholder(params.len())));
  }
  let filter = predicate.render(dialect, &mut params)?;

  Ok(Statement {
    sql: format!("UPDATE {} SET {} WHERE {filter}", ident(table)?, sets.join(", ")),
    params,
  })
}

/// `SELECT * FROM table ORDER BY column DESC LIMIT ?`, with the limit bound.
pub fn latest(
  dialect: &impl Dialect,
  table:   &str,
  column:  &str,
  limit:   usize,
) -> Result<Statement> {
  Ok(Statement {
    sql:    format!(
      "SELECT * FROM {} ORDER BY {} DESC LIMIT {}",
      ident(table)?,
      ident(column)?,
      dialect.placeholder(1)
    ),
    params: vec![Value::Int(i64::try_from(limit).unwrap_or(i64::MAX))],
  })
}

/// `SELECT MAX(column) FROM table`.
pub fn max(table: &str, column: &str) -> Result<Statement> {
  Ok(Statement {
    sql:    format!("SELECT MAX({}) FROM {}", ident(column)?, ident(table)?),
    params: Vec::new(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::SqlType;

  struct Question;
  impl Dialect for Question {
    fn placeholder(&self, index: usize) -> String { format!("?{index}") }
  }

  struct Dollar;
  impl Dialect for Dollar {
    fn placeholder(&self, index: usize) -> String { format!("${index}") }
  }

  #[test]
  fn select_binds_predicate_values() {
    let p = Predicate::new().eq("brand", "Ford").eq("year", 2019_i64);
    let s = select(&Question, "versions", &["version_id"], Some(&p)).unwrap();
    assert_eq!(
      s.sql,
      "SELECT version_id FROM versions WHERE brand = ?1 AND year = ?2 ORDER BY 1"
    );
    assert_eq!(s.params, vec![Value::from("Ford"), Value::Int(2019)]);
  }

  #[test]
  fn null_key_values_compare_with_is_null() {
    let p = Predicate::new()
      .eq("brand", "Ford")
      .eq("body_style", Value::Null(SqlType::Text));
    let s = select(&Dollar, "versions", &[], Some(&p)).unwrap();
    assert_eq!(
      s.sql,
      "SELECT * FROM versions WHERE brand = $1 AND body_style IS NULL ORDER BY 1"
    );
    assert_eq!(s.params.len(), 1);
  }

  #[test]
  fn insert_skips_transient_fields() {
    let fields = [
      Field::column("car_id", 3_i64),
      Field::transient("price", 250_000_i64),
      Field::column("url", "https://example.com/car"),
    ];
    let s = insert(&Dollar, "cars", &fields, Some(&["car_id"])).unwrap();
    assert_eq!(
      s.sql,
      "INSERT INTO cars (car_id, url) VALUES ($1, $2) ON CONFLICT (car_id) DO NOTHING"
    );
    assert_eq!(s.params.len(), 2);
  }

  #[test]
  fn update_binds_set_and_where() {
    let fields = [
      Field::column("ok", true),
      Field::column("error_message", "it's broken'; DROP TABLE scrapes; --"),
    ];
    let p = Predicate::new().eq("scrape_id", 4_i64).is_null("end_time");
    let s = update(&Question, "scrapes", &fields, &p).unwrap();
    assert_eq!(
      s.sql,
      "UPDATE scrapes SET ok = ?1, error_message = ?2 WHERE scrape_id = ?3 AND end_time IS NULL"
    );
    assert_eq!(s.params[2], Value::Int(4));
    assert!(!s.sql.contains("DROP"));
  }

  #[test]
  fn latest_binds_limit() {
    let s = latest(&Dollar, "scrapes", "scrape_id", 20).unwrap();
    assert_eq!(s.sql, "SELECT * FROM scrapes ORDER BY scrape_id DESC LIMIT $1");
    assert_eq!(s.params, vec![Value::Int(20)]);
    assert!(latest(&Dollar, "scrapes", "id DESC; --", 1).is_err());
  }

  #[test]
  fn update_requires_predicate() {
    let fields = [Field::column("ok", true)];
    assert!(matches!(
      update(&Question, "scrapes", &fields, &Predicate::new()),
      Err(Error::UnboundedUpdate(_))
    ));
  }

  #[test]
  fn identifiers_are_validated() {
    assert!(ident("car_info").is_ok());
    assert!(ident("_x1").is_ok());
    assert!(matches!(ident("1cars"), Err(Error::InvalidIdentifier(_))));
    assert!(matches!(ident("cars; --"), Err(Error::InvalidIdentifier(_))));
    assert!(select(&Question, "cars", &["url) FROM x --"], None).is_err());
  }
}
