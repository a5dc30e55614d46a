//! [`HttpFetcher`]: `reqwest` behind the [`Fetch`] and [`Download`]
//! capabilities.

use std::{path::Path, time::Duration};

use carwatch_extract::{
  Error as ExtractError,
  fetch::{Fetch, Fetched},
};
use reqwest::Client;
use tracing::debug;

use crate::{Error, Result, media::Download};

#[derive(Clone)]
pub struct HttpFetcher {
  client: Client,
}

fn transport(url: &str, e: reqwest::Error) -> ExtractError {
  ExtractError::Transport { url: url.to_owned(), reason: e.to_string() }
}

impl HttpFetcher {
  pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
    let client = Client::builder().user_agent(user_agent).timeout(timeout).build()?;
    Ok(Self { client })
  }
}

impl Fetch for HttpFetcher {
  async fn fetch<'a>(
    &'a self,
    url: &'a str,
    query: &'a [(&'a str, String)],
  ) -> carwatch_extract::Result<Fetched> {
    let response = self
      .client
      .get(url)
      .query(query)
      .send()
      .await
      .map_err(|e| transport(url, e))?;
    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let body = response.text().await.map_err(|e| transport(url, e))?;
    debug!(url = %final_url, status, bytes = body.len(), "fetched");
    Ok(Fetched { url: final_url, status, body })
  }
}

impl Download for HttpFetcher {
  async fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> Result<()> {
    let response = self.client.get(url).send().await.map_err(|e| transport(url, e))?;
    let status = response.status();
    if !status.is_success() {
      return Err(
        ExtractError::Status { url: url.to_owned(), status: status.as_u16() }.into(),
      );
    }
    let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await.map_err(Error::Io)
  }
}
