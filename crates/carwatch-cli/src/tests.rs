//! End-to-end crawl tests: canned pages served by a stub fetcher, records
//! written to an in-memory SQLite store.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use carwatch_core::{gateway::Gateway as _, identity::IdentityResolver, session};
use carwatch_extract::{
  Error as ExtractError,
  fetch::{Fetch, Fetched},
  kavak::{DEFAULT_LISTING_URL, Kavak},
};
use carwatch_store_sqlite::SqliteStore;

use crate::{Error, Result, media::Download, pipeline::{Crawler, Summary}};

const ORIGIN: &str = "https://www.kavak.com";

struct Stub {
  pages: HashMap<String, (u16, String)>,
}

impl Stub {
  fn new() -> Self { Self { pages: HashMap::new() } }

  fn listing(mut self, page: u32, cards: &[(&str, Option<&str>)]) -> Self {
    self.pages.insert(
      format!("{DEFAULT_LISTING_URL}?page={page}"),
      (200, listing_html(cards)),
    );
    self
  }

  fn detail(mut self, id: &str, body: String) -> Self {
    self.pages.insert(format!("{ORIGIN}/mx/usado/car-{id}"), (200, body));
    self
  }
}

impl Fetch for Stub {
  async fn fetch<'a>(
    &'a self,
    url: &'a str,
    query: &'a [(&'a str, String)],
  ) -> carwatch_extract::Result<Fetched> {
    let key = match query.first() {
      Some((k, v)) => format!("{url}?{k}={v}"),
      None => url.to_owned(),
    };
    if key.contains("broken") {
      return Err(ExtractError::Transport { url: key, reason: "connection reset".to_owned() });
    }
    let (status, body) = self.pages.get(&key).cloned().unwrap_or((404, String::new()));
    Ok(Fetched { url: key, status, body })
  }
}

impl Download for Stub {
  async fn download<'a>(&'a self, _url: &'a str, dest: &'a Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, b"jpeg").await.map_err(Error::Io)
  }
}

fn listing_html(cards: &[(&str, Option<&str>)]) -> String {
  let cards: String = cards
    .iter()
    .map(|(id, price)| {
      let price = price
        .map(|p| format!(r#"<span class="amount_uki-amount__large__price__2NvVx">{p}</span>"#))
        .unwrap_or_default();
      format!(
        r#"<div><a data-testid="card-product-{id}" href="/mx/usado/car-{id}">{price}</a></div>"#
      )
    })
    .collect();
  format!(
    r#"<html><body><main id="main-content">
      <div class="results_results__container__tcF4_">{cards}</div>
      <a class="results_results__pagination-nav__Qcftr">1</a>
      <a class="results_results__pagination-nav__Qcftr">2</a>
    </main></body></html>"#
  )
}

fn detail_html(id: &str, brand: &str, model: &str, year: u32) -> String {
  format!(
    r#"<html><body>
      <ul class="breadcrumb_breadcrumb__nPwIW">
        <li><a>Inicio</a></li><li><a>{brand}</a></li><li><a>{model}</a></li>
        <li><a>{year}</a></li><li><span>Base</span></li>
      </ul>
      <aside class="buy-box_wrapper__jCjj4"><p>12,300 km</p><p>Transmisión Manual</p></aside>
      <div class="keen-slider__slide"><img src="https://img.example/{id}.jpg"></div>
      <div class="desktop_car-detail__start__BToHy">
        <p>Stock ID</p><p>{id}</p>
        <p>1.6</p><p>Litros</p>
        <p>Sí</p><p>Bluetooth</p>
      </div>
    </body></html>"#
  )
}

async fn resolver() -> Arc<IdentityResolver<SqliteStore>> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Arc::new(IdentityResolver::new(Arc::new(store)))
}

fn crawler(
  resolver: &Arc<IdentityResolver<SqliteStore>>,
  stub: Stub,
) -> Crawler<SqliteStore, Stub, Kavak> {
  Crawler::new(Arc::clone(resolver), stub, Kavak::new(DEFAULT_LISTING_URL).unwrap())
}

async fn rows(r: &IdentityResolver<SqliteStore>, table: &str) -> Vec<carwatch_core::value::Row> {
  r.gateway().select(table, &[], None).await.unwrap()
}

fn never() -> impl std::future::Future<Output = ()> { std::future::pending() }

// ─── Crawl ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn crawl_persists_every_record_kind() {
  let r = resolver().await;
  let stub = Stub::new()
    .listing(0, &[("100", Some("199,000")), ("200", None)])
    .detail("100", detail_html("100", "nissan", "versa", 2021))
    .detail("200", detail_html("200", "nissan", "versa", 2021));

  let summary = crawler(&r, stub).run(never()).await.unwrap().unwrap();
  assert_eq!(summary, Summary { pages: 1, cars: 2, skipped: 0 });

  assert_eq!(rows(&r, "versions").await.len(), 1);
  assert_eq!(rows(&r, "version_details").await.len(), 1);
  assert_eq!(rows(&r, "cars").await.len(), 2);
  assert_eq!(rows(&r, "car_info").await.len(), 2);

  let history = rows(&r, "scrape_history").await;
  assert_eq!(history.len(), 2);
  let labels: Vec<String> = history.iter().map(|h| h.string("labels").unwrap()).collect();
  assert!(labels.contains(&"Disponible".to_owned()));
  assert!(labels.contains(&"Apartado".to_owned()));

  let cars = rows(&r, "cars").await;
  assert!(cars.iter().all(|c| c.opt_i64("version_id").unwrap() == Some(0)));

  let sessions = session::list_sessions(r.gateway().as_ref(), 5).await.unwrap();
  assert_eq!(sessions.len(), 1);
  assert!(sessions[0].ok);
  assert!(sessions[0].end_time.is_some());
}

#[tokio::test]
async fn unavailable_items_are_skipped() {
  let r = resolver().await;
  let stub = Stub::new()
    .listing(0, &[("100", Some("1")), ("404", Some("2")), ("broken", Some("3"))])
    .detail("100", detail_html("100", "kia", "rio", 2019));

  let summary = crawler(&r, stub).run(never()).await.unwrap().unwrap();
  assert_eq!(summary, Summary { pages: 1, cars: 1, skipped: 2 });
  assert_eq!(rows(&r, "cars").await.len(), 1);
}

#[tokio::test]
async fn repeated_runs_reuse_identity_and_append_history() {
  let r = resolver().await;
  for _ in 0..2 {
    let stub = Stub::new()
      .listing(0, &[("100", Some("199,000"))])
      .detail("100", detail_html("100", "mazda", "3", 2020));
    crawler(&r, stub).run(never()).await.unwrap().unwrap();
  }

  assert_eq!(rows(&r, "versions").await.len(), 1);
  assert_eq!(rows(&r, "cars").await.len(), 1);
  assert_eq!(rows(&r, "car_info").await.len(), 1);

  let history = rows(&r, "scrape_history").await;
  assert_eq!(history.len(), 2);
  let mut scrapes: Vec<i64> = history.iter().map(|h| h.i64("scrape_id").unwrap()).collect();
  scrapes.sort();
  assert_eq!(scrapes, vec![0, 1]);
}

#[tokio::test]
async fn page_limit_stops_pagination() {
  let r = resolver().await;
  let stub = Stub::new()
    .listing(0, &[("1", None)])
    .listing(1, &[("2", None)])
    .detail("1", detail_html("1", "seat", "ibiza", 2018))
    .detail("2", detail_html("2", "seat", "leon", 2018));

  let summary = crawler(&r, stub)
    .pages(0, Some(1))
    .run(never())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(summary.pages, 1);
  assert_eq!(rows(&r, "cars").await.len(), 1);
}

#[tokio::test]
async fn missing_listing_page_ends_run_cleanly() {
  let r = resolver().await;
  let summary = crawler(&r, Stub::new()).run(never()).await.unwrap().unwrap();
  assert_eq!(summary, Summary::default());

  let sessions = session::list_sessions(r.gateway().as_ref(), 1).await.unwrap();
  assert!(sessions[0].ok);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_closes_session() {
  let r = resolver().await;
  let stub = Stub::new()
    .listing(0, &[("100", None)])
    .detail("100", detail_html("100", "vw", "jetta", 2017));

  let result = crawler(&r, stub).run(async {}).await.unwrap();
  assert!(matches!(result, Err(Error::Cancelled)));

  let sessions = session::list_sessions(r.gateway().as_ref(), 1).await.unwrap();
  assert!(!sessions[0].ok);
  assert_eq!(sessions[0].error_kind, "Cancelled");
  assert!(sessions[0].end_time.is_some());
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_saved_on_first_sight_only() {
  let dir: PathBuf =
    std::env::temp_dir().join(format!("carwatch-media-{}", std::process::id()));
  let r = resolver().await;

  for _ in 0..2 {
    let stub = Stub::new()
      .listing(0, &[("555", Some("1"))])
      .detail("555", detail_html("555", "honda", "civic", 2022));
    crawler(&r, stub)
      .media_dir(Some(dir.clone()))
      .run(never())
      .await
      .unwrap()
      .unwrap();
  }

  let info = rows(&r, "car_info").await;
  assert_eq!(info.len(), 1);
  let path = info[0].opt_string("image_path").unwrap().unwrap();
  assert!(path.ends_with("kavak/555.jpg"));
  assert!(Path::new(&path).exists());

  std::fs::remove_dir_all(&dir).ok();
}
