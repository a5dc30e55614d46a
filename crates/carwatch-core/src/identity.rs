//! Natural-key identity resolution and surrogate id allocation.
//!
//! All writes go through one [`IdentityResolver`], which holds a single
//! async lock across each check-then-write sequence. The schema also puts a
//! unique constraint on every natural key, and inserts use
//! `ON CONFLICT DO NOTHING`; a conflicting insert is reported as the row
//! already existing.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  gateway::Gateway,
  record::{Identified, Keyed, Owned, Record, SurrogateId},
  sql::Predicate,
  value::Field,
};

/// Outcome of resolving a record's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<Id> {
  /// A row with the same natural key exists; its id is reused.
  Existing(Id),
  /// No row exists; this id was allocated for the record.
  New(Id),
}

impl<Id: Copy> Resolution<Id> {
  pub fn id(&self) -> Id {
    match self {
      Self::Existing(id) | Self::New(id) => *id,
    }
  }

  pub fn already_exists(&self) -> bool { matches!(self, Self::Existing(_)) }
}

/// The single writer in front of a [`Gateway`].
pub struct IdentityResolver<G> {
  gateway: Arc<G>,
  writer:  Mutex<()>,
}

impl<G: Gateway> IdentityResolver<G> {
  pub fn new(gateway: Arc<G>) -> Self { Self { gateway, writer: Mutex::new(()) } }

  pub fn gateway(&self) -> &Arc<G> { &self.gateway }

  /// `1 + max(column)` over `table`, or `0` when the table is empty.
  pub async fn allocate_id(&self, table: &str, column: &str) -> Result<i64> {
    let max = self
      .gateway
      .max_id(table, column)
      .await
      .map_err(Error::store)?;
    Ok(max.map_or(0, |m| m + 1))
  }

  async fn lookup<R: Keyed>(&self, record: &R) -> Result<Option<R::Id>> {
    let key = record.natural_key();
    let row = self
      .gateway
      .get_by_natural_key(R::TABLE, &key)
      .await
      .map_err(Error::store)?;
    match row {
      None => Ok(None),
      Some(row) => {
        let id = row
          .get(R::ID_COLUMN)
          .and_then(|v| v.as_i64())
          .ok_or_else(|| Error::MissingColumn(R::ID_COLUMN.to_owned()))?;
        Ok(Some(R::Id::from_raw(id)))
      }
    }
  }

  async fn id_taken<R: Identified>(&self, id: R::Id) -> Result<bool> {
    let predicate = Predicate::new().eq(R::ID_COLUMN, id.raw());
    let rows = self
      .gateway
      .select(R::TABLE, &[R::ID_COLUMN], Some(&predicate))
      .await
      .map_err(Error::store)?;
    Ok(!rows.is_empty())
  }

  /// Decide the record's id without writing anything.
  ///
  /// A record that already carries an id must agree with what its natural
  /// key resolves to; otherwise this fails with
  /// [`Error::IdentityConflict`].
  pub async fn resolve<R: Keyed>(&self, record: &R) -> Result<Resolution<R::Id>> {
    let supplied = record.id();
    match (self.lookup(record).await?, supplied) {
      (Some(existing), Some(supplied)) if existing != supplied => {
        Err(Error::IdentityConflict {
          table:    R::TABLE,
          supplied: supplied.raw(),
          resolved: existing.raw(),
        })
      }
      (Some(existing), _) => Ok(Resolution::Existing(existing)),
      (None, Some(supplied)) => {
        if self.id_taken::<R>(supplied).await? {
          return Err(Error::IdentityConflict {
            table:    R::TABLE,
            supplied: supplied.raw(),
            resolved: supplied.raw(),
          });
        }
        Ok(Resolution::New(supplied))
      }
      (None, None) => {
        let raw = self.allocate_id(R::TABLE, R::ID_COLUMN).await?;
        Ok(Resolution::New(R::Id::from_raw(raw)))
      }
    }
  }

  /// Resolve and, if no equivalent row exists, create it. Idempotent: a
  /// second call with the same natural key writes nothing and returns
  /// [`Resolution::Existing`]. The resolved id is stored on `record`.
  pub async fn persist<R: Keyed>(&self, record: &mut R) -> Result<Resolution<R::Id>> {
    let _guard = self.writer.lock().await;

    let resolution = self.resolve(record).await?;
    record.set_id(resolution.id());
    if resolution.already_exists() {
      debug!(table = R::TABLE, id = ?resolution.id(), "reusing existing row");
      return Ok(resolution);
    }

    let fields = record.fields();
    let inserted = self
      .gateway
      .insert_if_absent(R::TABLE, &fields, R::CONFLICT_COLUMNS)
      .await
      .map_err(Error::store)?;
    if inserted {
      debug!(table = R::TABLE, id = ?resolution.id(), "created row");
      return Ok(resolution);
    }

    // Another writer got there first; adopt its row.
    warn!(table = R::TABLE, "natural-key insert conflicted, re-resolving");
    let existing = self
      .lookup(record)
      .await?
      .ok_or_else(|| Error::AmbiguousNaturalKey { table: R::TABLE.to_owned(), matches: 0 })?;
    record.set_id(existing);
    Ok(Resolution::Existing(existing))
  }

  /// Whether a first-write-wins child row already exists for `owner_id`.
  pub async fn child_exists<R: Owned>(&self, owner_id: i64) -> Result<bool> {
    let key = [Field::column(R::OWNER_COLUMN, owner_id)];
    let row = self
      .gateway
      .get_by_natural_key(R::TABLE, &key)
      .await
      .map_err(Error::store)?;
    Ok(row.is_some())
  }

  /// Write `record` unless a row for its owner already exists. Returns
  /// whether a row was written; an existing row is never touched.
  pub async fn persist_once<R: Owned>(&self, record: &R) -> Result<bool> {
    let _guard = self.writer.lock().await;

    if self.child_exists::<R>(record.owner_id()).await? {
      debug!(table = R::TABLE, owner = record.owner_id(), "child row exists, skipping");
      return Ok(false);
    }
    let fields = record.fields();
    let inserted = self
      .gateway
      .insert_if_absent(R::TABLE, &fields, &[R::OWNER_COLUMN])
      .await
      .map_err(Error::store)?;
    Ok(inserted)
  }

  /// Allocate a fresh id for an always-new record and insert it.
  pub async fn create<R: Identified>(&self, record: &mut R) -> Result<R::Id> {
    let _guard = self.writer.lock().await;

    let raw = self.allocate_id(R::TABLE, R::ID_COLUMN).await?;
    let id = R::Id::from_raw(raw);
    record.set_id(id);
    let fields = record.fields();
    self
      .gateway
      .insert(R::TABLE, &fields)
      .await
      .map_err(Error::store)?;
    Ok(id)
  }

  /// Append a fact row. Never deduplicated.
  pub async fn append<R: Record>(&self, record: &R) -> Result<()> {
    let _guard = self.writer.lock().await;

    let fields = record.fields();
    self
      .gateway
      .insert(R::TABLE, &fields)
      .await
      .map_err(Error::store)
  }

  /// Update rows of `table` under the writer lock.
  pub async fn update(
    &self,
    table: &str,
    fields: &[Field],
    predicate: &Predicate,
  ) -> Result<u64> {
    let _guard = self.writer.lock().await;

    self
      .gateway
      .update(table, fields, predicate)
      .await
      .map_err(Error::store)
  }
}
