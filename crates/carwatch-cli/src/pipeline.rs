//! The crawl: listing pages → detail pages → records, inside one scrape
//! session.

use std::{future::Future, path::PathBuf, sync::Arc};

use carwatch_core::{
  gateway::Gateway,
  identity::IdentityResolver,
  model::{CarInfo, ScrapeHistory},
  record::ScrapeId,
  session::run_session,
};
use carwatch_extract::{
  fetch::Fetch,
  site::{ListingCard, Observation, Site},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result, media, media::Download, pacing::Pacing};

/// Counts for one finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub pages:   u32,
  pub cars:    u32,
  pub skipped: u32,
}

pub struct Crawler<G: Gateway + 'static, F, S> {
  resolver:   Arc<IdentityResolver<G>>,
  fetcher:    F,
  site:       S,
  pacing:     Pacing,
  start_page: u32,
  max_pages:  Option<u32>,
  media_dir:  Option<PathBuf>,
}

impl<G, F, S> Crawler<G, F, S>
where
  G: Gateway + 'static,
  F: Fetch + Download,
  S: Site,
{
  pub fn new(resolver: Arc<IdentityResolver<G>>, fetcher: F, site: S) -> Self {
    Self {
      resolver,
      fetcher,
      site,
      pacing: Pacing::none(),
      start_page: 0,
      max_pages: None,
      media_dir: None,
    }
  }

  pub fn pacing(mut self, pacing: Pacing) -> Self {
    self.pacing = pacing;
    self
  }

  pub fn pages(mut self, start_page: u32, max_pages: Option<u32>) -> Self {
    self.start_page = start_page;
    self.max_pages = max_pages;
    self
  }

  pub fn media_dir(mut self, dir: Option<PathBuf>) -> Self {
    self.media_dir = dir;
    self
  }

  /// Run one session. `shutdown` resolving cancels the crawl; the session
  /// is closed either way. The outer error is a failure to open the
  /// session; the inner result is the crawl's own.
  pub async fn run(
    &self,
    shutdown: impl Future<Output = ()>,
  ) -> carwatch_core::Result<Result<Summary>> {
    run_session(Arc::clone(&self.resolver), |scrape_id| async move {
      tokio::select! {
        result = self.crawl(scrape_id) => result,
        () = shutdown => {
          warn!(scrape_id = %scrape_id, "cancelled");
          Err(Error::Cancelled)
        }
      }
    })
    .await
  }

  async fn crawl(&self, scrape_id: ScrapeId) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut page = self.start_page;

    loop {
      if self.max_pages.is_some_and(|max| summary.pages >= max) {
        info!(pages = summary.pages, "page limit reached");
        break;
      }

      let query = self.site.listing_query(page);
      let fetched = match self.fetcher.fetch(self.site.listing_url(), &query).await {
        Ok(fetched) => fetched,
        Err(e) => {
          warn!(page, error = %e, "listing page unavailable, stopping");
          break;
        }
      };
      let Some(cards) = self.site.parse_listing(&fetched) else {
        info!(page, status = fetched.status, "no further listing pages");
        break;
      };
      info!(page, cards = cards.len(), "listing page");
      summary.pages += 1;

      for card in &cards {
        if self.observe(scrape_id, card).await? {
          summary.cars += 1;
        } else {
          summary.skipped += 1;
        }
      }

      page += 1;
      self.pacing.pause().await;
    }

    info!(pages = summary.pages, cars = summary.cars, skipped = summary.skipped, "crawl finished");
    Ok(summary)
  }

  /// Fetch and persist one card. `false` when the item was unavailable.
  async fn observe(&self, scrape_id: ScrapeId, card: &ListingCard) -> Result<bool> {
    let fetched = match self.fetcher.fetch(&card.url, &[]).await {
      Ok(fetched) if fetched.is_ok() => fetched,
      Ok(fetched) => {
        warn!(url = %card.url, status = fetched.status, "item unavailable");
        return Ok(false);
      }
      Err(e) => {
        warn!(url = %card.url, error = %e, "item unavailable");
        return Ok(false);
      }
    };
    let Some(observation) = self.site.parse_detail(card, &fetched.body) else {
      warn!(url = %card.url, "detail page lacks an identifier, skipped");
      return Ok(false);
    };
    self.persist(scrape_id, observation).await?;
    Ok(true)
  }

  /// Version → VersionDetails → Car → CarInfo → ScrapeHistory. Later rows
  /// reference the ids resolved for earlier ones.
  async fn persist(&self, scrape_id: ScrapeId, observation: Observation) -> Result<()> {
    let Observation { version, mut details, mut car, mut info } = observation;

    if let Some(mut version) = version {
      let version_id = self.resolver.persist(&mut version).await?.id();
      details.version_id = version_id.0;
      self.resolver.persist_once(&details).await?;
      car.version_id = Some(version_id);
    }

    let resolution = self.resolver.persist(&mut car).await?;
    let car_id = resolution.id();
    debug!(car_id = %car_id, existing = resolution.already_exists(), "car resolved");

    info.car_id = car_id.0;
    if !self.resolver.child_exists::<CarInfo>(car_id.0).await? {
      if let Some(dir) = &self.media_dir {
        info.image_path = media::save_image(&self.fetcher, dir, &car).await;
      }
      self.resolver.persist_once(&info).await?;
    }

    self
      .resolver
      .append(&ScrapeHistory::observe(&car, car_id, scrape_id))
      .await?;
    Ok(())
  }
}
