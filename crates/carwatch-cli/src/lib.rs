//! The carwatch crawler: configuration, backend selection, HTTP and the
//! crawl pipeline. `main.rs` is a thin clap front end over this crate.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod pacing;
pub mod pipeline;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
