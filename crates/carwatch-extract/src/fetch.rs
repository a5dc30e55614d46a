//! The capability the crawler uses to get pages. HTTP specifics live with
//! the implementor.

use std::future::Future;

use crate::Result;

/// A fetched page: the final status and the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
  pub url:    String,
  pub status: u16,
  pub body:   String,
}

impl Fetched {
  pub fn is_ok(&self) -> bool { self.status == 200 }
}

pub trait Fetch: Send + Sync {
  /// GET `url` with `query` appended. A non-success status is returned as
  /// data; only a failure to get any response is an error.
  fn fetch<'a>(
    &'a self,
    url: &'a str,
    query: &'a [(&'a str, String)],
  ) -> impl Future<Output = Result<Fetched>> + Send + 'a;
}
