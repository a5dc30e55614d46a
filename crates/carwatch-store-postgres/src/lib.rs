//! PostgreSQL backend for the carwatch gateway, over an [`sqlx`] pool.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{PostgresDialect, PostgresStore};

#[cfg(test)]
mod tests;
