//! Error types for `carwatch-extract`.

use carwatch_core::Fault;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A rule that can never be evaluated: bad selector, bad regex,
  /// unsupported cardinality or a capture group the pattern lacks.
  #[error("malformed rule {rule:?}: {reason}")]
  MalformedRule { rule: String, reason: String },

  #[error("fetching {url} failed: {reason}")]
  Transport { url: String, reason: String },

  #[error("fetching {url} returned status {status}")]
  Status { url: String, status: u16 },
}

impl Error {
  pub(crate) fn malformed(rule: impl Into<String>, reason: impl ToString) -> Self {
    Self::MalformedRule { rule: rule.into(), reason: reason.to_string() }
  }
}

impl Fault for Error {
  fn kind(&self) -> &'static str {
    match self {
      Self::MalformedRule { .. } => "MalformedRule",
      Self::Transport { .. } | Self::Status { .. } => "TransportFailure",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
