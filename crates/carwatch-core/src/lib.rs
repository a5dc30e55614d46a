//! Core types for carwatch: the vehicle record model, the storage gateway
//! abstraction, identity resolution and scrape-session lifecycle.
//!
//! This crate has no database or HTML dependencies. Backends implement
//! [`gateway::Gateway`]; extraction lives in `carwatch-extract`.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures instead.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod gateway;
pub mod identity;
pub mod model;
pub mod normalize;
pub mod record;
pub mod session;
pub mod sql;
pub mod value;

pub use error::{Error, Fault, Result};
