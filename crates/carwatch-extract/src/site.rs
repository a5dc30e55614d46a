//! What a crawler needs to know about one website.

use carwatch_core::model::{Car, CarInfo, Version, VersionDetails};

use crate::fetch::Fetched;

/// One card on a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
  pub identifier: String,
  pub url:        String,
  pub price:      Option<i64>,
  pub labels:     Vec<String>,
}

/// Everything one detail page yields. Ids are not resolved yet:
/// `details.version_id` and `info.car_id` are filled in once the owning rows
/// have been persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
  pub version: Option<Version>,
  pub details: VersionDetails,
  pub car:     Car,
  pub info:    CarInfo,
}

pub trait Site: Send + Sync {
  /// Lowercase site name stored in `cars.website`.
  fn website(&self) -> &'static str;

  fn listing_url(&self) -> &str;

  /// Query parameters selecting listing page `page`.
  fn listing_query(&self, page: u32) -> Vec<(&'static str, String)>;

  /// The cards on a listing page, or `None` when the page is not a usable
  /// listing and pagination should stop.
  fn parse_listing(&self, page: &Fetched) -> Option<Vec<ListingCard>>;

  /// Build an observation from a detail page. `None` when the page does not
  /// identify a car.
  fn parse_detail(&self, card: &ListingCard, body: &str) -> Option<Observation>;
}
