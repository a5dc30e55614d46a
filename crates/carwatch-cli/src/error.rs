//! Error type for a crawl run.

use carwatch_core::Fault;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] carwatch_core::Error),

  #[error(transparent)]
  Extract(#[from] carwatch_extract::Error),

  #[error("writing media failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("run cancelled")]
  Cancelled,
}

impl Fault for Error {
  fn kind(&self) -> &'static str {
    match self {
      Self::Core(e) => e.kind(),
      Self::Extract(e) => e.kind(),
      Self::Io(_) => "Io",
      Self::Cancelled => "Cancelled",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
