//! Traits describing how records map onto tables, and surrogate id types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Field;

// ─── Surrogate ids ───────────────────────────────────────────────────────────

/// A generated integer identifier for one table.
pub trait SurrogateId: Copy + Eq + fmt::Debug + Send + Sync + 'static {
  fn from_raw(raw: i64) -> Self;
  fn raw(self) -> i64;
}

macro_rules! surrogate_id {
  ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl SurrogateId for $name {
      fn from_raw(raw: i64) -> Self { Self(raw) }
      fn raw(self) -> i64 { self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }
  )*};
}

surrogate_id! {
  /// Row id in `scrapes`.
  ScrapeId,
  /// Row id in `versions`; also the key of `version_details`.
  VersionId,
  /// Row id in `cars`; also the key of `car_info`.
  CarId,
}

// ─── Record traits ───────────────────────────────────────────────────────────

/// Anything that can be written as one row of `TABLE`.
pub trait Record {
  const TABLE: &'static str;

  /// All fields, persisted and transient, in column order.
  fn fields(&self) -> Vec<Field>;
}

/// A record whose row is addressed by a surrogate id column.
pub trait Identified: Record {
  const ID_COLUMN: &'static str;
  type Id: SurrogateId;

  /// The id, if one has been resolved or supplied.
  fn id(&self) -> Option<Self::Id>;

  fn set_id(&mut self, id: Self::Id);
}

/// A deduplicated record: at most one row per natural key.
pub trait Keyed: Identified {
  /// Columns carrying the unique constraint that backs the natural key.
  const CONFLICT_COLUMNS: &'static [&'static str];

  /// The natural-key fields, post-normalization.
  fn natural_key(&self) -> Vec<Field>;
}

/// A first-write-wins child keyed by its owner's id.
pub trait Owned: Record {
  const OWNER_COLUMN: &'static str;

  fn owner_id(&self) -> i64;
}
