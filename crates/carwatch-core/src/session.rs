//! Scrape sessions: one row per crawl pass, opened at start and closed
//! exactly once.
//!
//! ```text
//! Open ──close(Ok)──▶ Closed(ok)
//!   └───close(Err)──▶ Closed(error: kind, message)
//! ```
//!
//! The row is inserted on open so an in-flight pass is visible, and updated
//! (never re-inserted) on close. [`OpenSession::close`] consumes the handle;
//! a handle dropped while still open closes itself as `Aborted` on the
//! current tokio runtime.

use std::{
  any::Any,
  future::Future,
  panic::{self, AssertUnwindSafe},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use futures::FutureExt as _;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
  Error, Result,
  error::Fault,
  gateway::Gateway,
  identity::IdentityResolver,
  record::{Identified, Record, ScrapeId},
  sql::Predicate,
  value::{Field, Row},
};

pub const ABORTED: &str = "Aborted";
pub const PANIC: &str = "Panic";

// ─── Record ──────────────────────────────────────────────────────────────────

/// The persisted state of one crawl pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeSession {
  pub id:            Option<ScrapeId>,
  pub start_time:    DateTime<Utc>,
  pub end_time:      Option<DateTime<Utc>>,
  pub ok:            bool,
  pub error_kind:    String,
  pub error_message: Option<String>,
}

impl ScrapeSession {
  fn started_now() -> Self {
    Self {
      id:            None,
      start_time:    Utc::now(),
      end_time:      None,
      ok:            false,
      error_kind:    String::new(),
      error_message: None,
    }
  }

  pub fn is_open(&self) -> bool { self.end_time.is_none() }

  pub fn from_row(row: &Row) -> Result<Self> {
    Ok(Self {
      id:            Some(ScrapeId(row.i64("scrape_id")?)),
      start_time:    decode_dt(&row.string("start_time")?)?,
      end_time:      row
        .opt_string("end_time")?
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      ok:            row.bool("ok")?,
      error_kind:    row.opt_string("error_kind")?.unwrap_or_default(),
      error_message: row.opt_string("error_message")?,
    })
  }

  /// The columns written on close.
  fn closing_fields(&self) -> Vec<Field> {
    vec![
      Field::column("end_time", self.end_time.map(encode_dt)),
      Field::column("ok", self.ok),
      Field::column("error_kind", self.error_kind.as_str()),
      Field::column("error_message", self.error_message.clone()),
    ]
  }
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

impl Record for ScrapeSession {
  const TABLE: &'static str = "scrapes";

  fn fields(&self) -> Vec<Field> {
    vec![
      Field::column("scrape_id", self.id.map(|id| id.0)),
      Field::column("start_time", encode_dt(self.start_time)),
      Field::column("end_time", self.end_time.map(encode_dt)),
      Field::column("ok", self.ok),
      Field::column("error_kind", self.error_kind.as_str()),
      Field::column("error_message", self.error_message.clone()),
    ]
  }
}

impl Identified for ScrapeSession {
  const ID_COLUMN: &'static str = "scrape_id";
  type Id = ScrapeId;

  fn id(&self) -> Option<ScrapeId> { self.id }

  fn set_id(&mut self, id: ScrapeId) { self.id = Some(id); }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// How the unit of work inside a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Succeeded,
  Failed { kind: String, message: String },
}

impl Outcome {
  pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Failed { kind: kind.into(), message: message.into() }
  }

  pub fn from_result<T, E: Fault>(result: &Result<T, E>) -> Self {
    match result {
      Ok(_) => Self::Succeeded,
      Err(e) => Self::failed(e.kind(), e.to_string()),
    }
  }
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// A session in the `Open` state.
pub struct OpenSession<G: Gateway + 'static> {
  resolver: Arc<IdentityResolver<G>>,
  id:       ScrapeId,
  record:   ScrapeSession,
  closed:   bool,
}

impl<G: Gateway + 'static> OpenSession<G> {
  /// Stamp the start time, allocate an id and persist the open row.
  pub async fn open(resolver: Arc<IdentityResolver<G>>) -> Result<Self> {
    let mut record = ScrapeSession::started_now();
    let id = resolver.create(&mut record).await?;
    info!(scrape_id = %id, "scrape session opened");
    Ok(Self { resolver, id, record, closed: false })
  }

  pub fn id(&self) -> ScrapeId { self.id }

  pub fn record(&self) -> &ScrapeSession { &self.record }

  /// Stamp the end time and record `outcome`. Consumes the handle, so a
  /// session cannot be closed twice through it; the update is also
  /// conditioned on the row still being open.
  pub async fn close(mut self, outcome: Outcome) -> Result<ScrapeSession> {
    let result = close_row(&self.resolver, self.id, self.record.clone(), outcome).await;
    // A store failure leaves the row open; let the drop path retry.
    self.closed = !matches!(result, Err(Error::Store(_)));
    result
  }
}

impl<G: Gateway + 'static> Drop for OpenSession<G> {
  fn drop(&mut self) {
    if self.closed {
      return;
    }
    let id = self.id;
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      error!(scrape_id = %id, "scrape session dropped open outside a runtime");
      return;
    };
    warn!(scrape_id = %id, "scrape session dropped open, closing as aborted");
    let resolver = Arc::clone(&self.resolver);
    let record = self.record.clone();
    handle.spawn(async move {
      let outcome = Outcome::failed(ABORTED, "session handle dropped before close");
      if let Err(e) = close_row(&resolver, id, record, outcome).await {
        error!(scrape_id = %id, error = %e, "failed to close aborted session");
      }
    });
  }
}

async fn close_row<G: Gateway>(
  resolver: &IdentityResolver<G>,
  id: ScrapeId,
  mut record: ScrapeSession,
  outcome: Outcome,
) -> Result<ScrapeSession> {
  record.end_time = Some(Utc::now());
  match outcome {
    Outcome::Succeeded => {
      record.ok = true;
    }
    Outcome::Failed { kind, message } => {
      record.ok = false;
      record.error_kind = kind;
      record.error_message = Some(message);
    }
  }

  let predicate = Predicate::new()
    .eq(ScrapeSession::ID_COLUMN, id.0)
    .is_null("end_time");
  let changed = resolver
    .update(ScrapeSession::TABLE, &record.closing_fields(), &predicate)
    .await?;
  if changed == 0 {
    return Err(Error::SessionClosed(id.0));
  }

  info!(
    scrape_id = %id,
    ok = record.ok,
    error_kind = %record.error_kind,
    "scrape session closed"
  );
  Ok(record)
}

/// Run `work` inside a fresh session and close it with the work's outcome,
/// whatever that outcome is. The work's own result is returned unchanged;
/// a failure to close is logged, not substituted for it.
///
/// A panic in `work` closes the session as `Panic` before the panic is
/// resumed, so the row is never left open by an unwinding runtime.
pub async fn run_session<G, F, Fut, T, E>(
  resolver: Arc<IdentityResolver<G>>,
  work: F,
) -> Result<Result<T, E>>
where
  G: Gateway + 'static,
  F: FnOnce(ScrapeId) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Fault,
{
  let session = OpenSession::open(resolver).await?;
  let id = session.id();
  let caught = AssertUnwindSafe(async move { work(id).await })
    .catch_unwind()
    .await;
  let outcome = match &caught {
    Ok(result) => Outcome::from_result(result),
    Err(payload) => Outcome::failed(PANIC, panic_message(payload.as_ref())),
  };
  if let Err(e) = session.close(outcome).await {
    error!(error = %e, "failed to close scrape session");
  }
  match caught {
    Ok(result) => Ok(result),
    Err(payload) => panic::resume_unwind(payload),
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_owned()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_owned()
  }
}

/// All sessions, most recent first.
pub async fn list_sessions<G: Gateway>(
  gateway: &G,
  limit: usize,
) -> Result<Vec<ScrapeSession>> {
  let rows = gateway
    .latest(ScrapeSession::TABLE, ScrapeSession::ID_COLUMN, limit)
    .await
    .map_err(Error::store)?;
  rows.iter().map(ScrapeSession::from_row).collect()
}
