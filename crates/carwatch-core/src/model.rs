//! The persisted vehicle records.
//!
//! Constructors and setters normalize their inputs, so a record's natural
//! key is already in canonical form by the time it reaches the resolver.
//! Cross-record references are ids only.

use serde::Serialize;

use crate::{
  normalize,
  record::{CarId, Identified, Keyed, Owned, Record, ScrapeId, VersionId},
  value::Field,
};

// ─── Version ─────────────────────────────────────────────────────────────────

/// A make/model/trim/year combination, shared by every car listed with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Version {
  pub id:                  Option<VersionId>,
  pub brand:               String,
  pub model:               String,
  pub version_name:        Option<String>,
  pub year:                Option<i32>,
  pub body_style:          Option<String>,
  pub engine_displacement: Option<f64>,
  pub transmission_type:   Option<String>,
}

impl Version {
  /// `None` when brand or model is blank.
  pub fn new(brand: &str, model: &str) -> Option<Self> {
    Some(Self {
      id:                  None,
      brand:               normalize::proper_noun(brand)?,
      model:               normalize::proper_noun(model)?,
      version_name:        None,
      year:                None,
      body_style:          None,
      engine_displacement: None,
      transmission_type:   None,
    })
  }

  pub fn version_name(mut self, raw: Option<&str>) -> Self {
    self.version_name = raw.and_then(normalize::clean);
    self
  }

  pub fn year(mut self, year: Option<i32>) -> Self {
    self.year = year;
    self
  }

  pub fn body_style(mut self, raw: Option<&str>) -> Self {
    self.body_style = raw.and_then(normalize::coded);
    self
  }

  pub fn engine_displacement(mut self, litres: Option<f64>) -> Self {
    self.engine_displacement = litres;
    self
  }

  pub fn transmission_type(mut self, raw: Option<&str>) -> Self {
    self.transmission_type = raw.and_then(normalize::proper_noun);
    self
  }

  /// Canonical single-column rendering of the natural key; carries the
  /// unique index, since nullable key columns cannot. Parts are joined by
  /// `|` with `\` and `|` inside a part escaped, so distinct keys never
  /// render alike.
  pub fn natural_key_text(&self) -> String {
    [
      Some(self.brand.clone()),
      Some(self.model.clone()),
      self.version_name.clone(),
      self.year.map(|y| y.to_string()),
      self.body_style.clone(),
      self.engine_displacement.map(|d| d.to_string()),
      self.transmission_type.clone(),
    ]
    .map(|part| escape_key_part(&part.unwrap_or_default()))
    .join("|")
  }
}

fn escape_key_part(part: &str) -> String {
  part.replace('\\', "\\\\").replace('|', "\\|")
}

impl Record for Version {
  const TABLE: &'static str = "versions";

  fn fields(&self) -> Vec<Field> {
    let mut fields = vec![Field::column("version_id", self.id.map(|id| id.0))];
    fields.extend(self.natural_key());
    fields.push(Field::column("natural_key", self.natural_key_text()));
    fields
  }
}

impl Identified for Version {
  const ID_COLUMN: &'static str = "version_id";
  type Id = VersionId;

  fn id(&self) -> Option<VersionId> { self.id }

  fn set_id(&mut self, id: VersionId) { self.id = Some(id); }
}

impl Keyed for Version {
  const CONFLICT_COLUMNS: &'static [&'static str] = &["natural_key"];

  fn natural_key(&self) -> Vec<Field> {
    vec![
      Field::column("brand", self.brand.as_str()),
      Field::column("model", self.model.as_str()),
      Field::column("version_name", self.version_name.clone()),
      Field::column("year", self.year),
      Field::column("body_style", self.body_style.clone()),
      Field::column("engine_displacement", self.engine_displacement),
      Field::column("transmission_type", self.transmission_type.clone()),
    ]
  }
}

// ─── VersionDetails ──────────────────────────────────────────────────────────

/// The technical sheet of a version. Written once per version; never refreshed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VersionDetails {
  pub version_id:         i64,
  pub cylinders:          Option<i64>,
  pub horsepower:         Option<i64>,
  pub weight_kg:          Option<i64>,
  /// Combined range on a full tank, km.
  pub fuel_range:         Option<i64>,
  /// Combined consumption, km/l.
  pub fuel_economy:       Option<f64>,
  pub num_of_gears:       Option<i64>,
  pub fuel_type:          Option<String>,
  pub engine_type:        Option<String>,
  pub num_of_doors:       Option<i64>,
  pub num_of_airbags:     Option<i64>,
  pub num_of_passengers:  Option<i64>,
  pub rim_inches:         Option<i64>,
  pub rim_material:       Option<String>,
  pub interior_materials: Option<String>,
  pub has_startstop_button:            bool,
  pub has_gps:                         bool,
  pub has_start_button:                bool,
  pub has_sunroof:                     bool,
  pub has_cruise_control:              bool,
  pub has_heated_seats:                bool,
  pub has_distance_sensor:             bool,
  pub has_abs:                         bool,
  pub has_rain_sensor:                 bool,
  pub has_automatic_emergency_braking: bool,
  pub has_bluetooth:                   bool,
  pub has_touchscreen:                 bool,
  pub has_android_auto:                bool,
  pub has_apple_carplay:               bool,
}

impl VersionDetails {
  pub fn new(version_id: VersionId) -> Self {
    Self { version_id: version_id.0, ..Self::default() }
  }
}

impl Record for VersionDetails {
  const TABLE: &'static str = "version_details";

  fn fields(&self) -> Vec<Field> {
    vec![
      Field::column("version_id", self.version_id),
      Field::column("cylinders", self.cylinders),
      Field::column("horsepower", self.horsepower),
      Field::column("weight_kg", self.weight_kg),
      Field::column("fuel_range", self.fuel_range),
      Field::column("fuel_economy", self.fuel_economy),
      Field::column("num_of_gears", self.num_of_gears),
      Field::column("fuel_type", self.fuel_type.clone()),
      Field::column("engine_type", self.engine_type.clone()),
      Field::column("num_of_doors", self.num_of_doors),
      Field::column("num_of_airbags", self.num_of_airbags),
      Field::column("num_of_passengers", self.num_of_passengers),
      Field::column("rim_inches", self.rim_inches),
      Field::column("rim_material", self.rim_material.clone()),
      Field::column("interior_materials", self.interior_materials.clone()),
      Field::column("has_startstop_button", self.has_startstop_button),
      Field::column("has_gps", self.has_gps),
      Field::column("has_start_button", self.has_start_button),
      Field::column("has_sunroof", self.has_sunroof),
      Field::column("has_cruise_control", self.has_cruise_control),
      Field::column("has_heated_seats", self.has_heated_seats),
      Field::column("has_distance_sensor", self.has_distance_sensor),
      Field::column("has_abs", self.has_abs),
      Field::column("has_rain_sensor", self.has_rain_sensor),
      Field::column(
        "has_automatic_emergency_braking",
        self.has_automatic_emergency_braking,
      ),
      Field::column("has_bluetooth", self.has_bluetooth),
      Field::column("has_touchscreen", self.has_touchscreen),
      Field::column("has_android_auto", self.has_android_auto),
      Field::column("has_apple_carplay", self.has_apple_carplay),
    ]
  }
}

impl Owned for VersionDetails {
  const OWNER_COLUMN: &'static str = "version_id";

  fn owner_id(&self) -> i64 { self.version_id }
}

// ─── Car ─────────────────────────────────────────────────────────────────────

/// One listed vehicle on one website.
///
/// `price` and `labels` are what the listing showed on this pass; they are
/// transient here and persisted only through [`ScrapeHistory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Car {
  pub id:         Option<CarId>,
  pub identifier: String,
  pub website:    String,
  pub url:        String,
  pub image_url:  Option<String>,
  pub report_url: Option<String>,
  pub version_id: Option<VersionId>,
  pub price:      Option<i64>,
  pub labels:     Vec<String>,
}

impl Car {
  /// `None` when the identifier is blank.
  pub fn new(identifier: &str, website: &str, url: &str) -> Option<Self> {
    Some(Self {
      id:         None,
      identifier: normalize::clean(identifier)?,
      website:    website.trim().to_lowercase(),
      url:        url.trim().to_owned(),
      image_url:  None,
      report_url: None,
      version_id: None,
      price:      None,
      labels:     Vec::new(),
    })
  }

  /// Add a label unless an equal one is already present.
  pub fn label(&mut self, raw: &str) {
    if let Some(label) = normalize::proper_noun(raw)
      && !self.labels.contains(&label)
    {
      self.labels.push(label);
    }
  }
}

impl Record for Car {
  const TABLE: &'static str = "cars";

  fn fields(&self) -> Vec<Field> {
    vec![
      Field::column("car_id", self.id.map(|id| id.0)),
      Field::column("identifier", self.identifier.as_str()),
      Field::column("website", self.website.as_str()),
      Field::column("url", self.url.as_str()),
      Field::column("image_url", self.image_url.clone()),
      Field::column("report_url", self.report_url.clone()),
      Field::column("version_id", self.version_id.map(|id| id.0)),
      Field::transient("price", self.price),
      Field::transient("labels", self.labels.join(", ")),
    ]
  }
}

impl Identified for Car {
  const ID_COLUMN: &'static str = "car_id";
  type Id = CarId;

  fn id(&self) -> Option<CarId> { self.id }

  fn set_id(&mut self, id: CarId) { self.id = Some(id); }
}

impl Keyed for Car {
  const CONFLICT_COLUMNS: &'static [&'static str] = &["identifier", "website"];

  fn natural_key(&self) -> Vec<Field> {
    vec![
      Field::column("identifier", self.identifier.as_str()),
      Field::column("website", self.website.as_str()),
    ]
  }
}

// ─── CarInfo ─────────────────────────────────────────────────────────────────

/// Per-car attributes recorded on first sight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarInfo {
  pub car_id:      i64,
  pub city:        Option<String>,
  pub odometer:    Option<i64>,
  pub image_path:  Option<String>,
  pub report_path: Option<String>,
}

impl CarInfo {
  pub fn new(car_id: CarId) -> Self { Self { car_id: car_id.0, ..Self::default() } }

  pub fn city(mut self, raw: Option<&str>) -> Self {
    self.city = raw.and_then(normalize::proper_noun);
    self
  }
}

impl Record for CarInfo {
  const TABLE: &'static str = "car_info";

  fn fields(&self) -> Vec<Field> {
    vec![
      Field::column("car_id", self.car_id),
      Field::column("city", self.city.clone()),
      Field::column("odometer", self.odometer),
      Field::column("image_path", self.image_path.clone()),
      Field::column("report_path", self.report_path.clone()),
    ]
  }
}

impl Owned for CarInfo {
  const OWNER_COLUMN: &'static str = "car_id";

  fn owner_id(&self) -> i64 { self.car_id }
}

// ─── ScrapeHistory ───────────────────────────────────────────────────────────

/// What one session saw for one car. Append-only; never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeHistory {
  pub car_id:    CarId,
  pub scrape_id: ScrapeId,
  pub labels:    String,
  pub price:     Option<i64>,
}

impl ScrapeHistory {
  pub fn observe(car: &Car, car_id: CarId, scrape_id: ScrapeId) -> Self {
    Self {
      car_id,
      scrape_id,
      labels: car.labels.join(", "),
      price: car.price,
    }
  }
}

impl Record for ScrapeHistory {
  const TABLE: &'static str = "scrape_history";

  fn fields(&self) -> Vec<Field> {
    vec![
      Field::column("car_id", self.car_id.0),
      Field::column("scrape_id", self.scrape_id.0),
      Field::column("labels", self.labels.as_str()),
      Field::column("price", self.price),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn explorer() -> Version {
    Version::new("ford", "EXPLORER")
      .unwrap()
      .version_name(Some("  Limited "))
      .year(Some(2019))
      .body_style(Some("suv"))
      .engine_displacement(Some(3.5))
      .transmission_type(Some("automatico"))
  }

  #[test]
  fn version_normalizes_inputs() {
    let v = explorer();
    assert_eq!(v.brand, "Ford");
    assert_eq!(v.model, "Explorer");
    assert_eq!(v.version_name.as_deref(), Some("Limited"));
    assert_eq!(v.body_style.as_deref(), Some("SUV"));
    assert_eq!(v.transmission_type.as_deref(), Some("Automatico"));
    assert_eq!(v.natural_key_text(), "Ford|Explorer|Limited|2019|SUV|3.5|Automatico");
  }

  #[test]
  fn key_text_keeps_separators_inside_parts_apart() {
    let base = || Version::new("Ford", "Explorer").unwrap();
    let a = base().version_name(Some("L|")).body_style(Some("suv"));
    let b = base().version_name(Some("L")).body_style(Some("|suv"));
    assert_eq!(a.natural_key_text(), r"Ford|Explorer|L\|||SUV||");
    assert_ne!(a.natural_key_text(), b.natural_key_text());

    let slash = base().version_name(Some(r"L\"));
    assert_eq!(slash.natural_key_text(), r"Ford|Explorer|L\\|||||");
  }

  #[test]
  fn version_requires_brand_and_model() {
    assert!(Version::new("", "Explorer").is_none());
    assert!(Version::new("Ford", "  ").is_none());
  }

  #[test]
  fn car_price_and_labels_are_transient() {
    let mut car = Car::new("229811", "Kavak", "https://example.com/c/229811").unwrap();
    car.price = Some(389_999);
    car.label("disponible");
    car.label("Disponible");

    assert_eq!(car.website, "kavak");
    assert_eq!(car.labels, vec!["Disponible".to_string()]);

    let persisted: Vec<_> = car
      .fields()
      .into_iter()
      .filter(|f| f.is_persisted())
      .map(|f| f.name)
      .collect();
    assert!(!persisted.contains(&"price"));
    assert!(!persisted.contains(&"labels"));
    assert!(persisted.contains(&"url"));
  }

  #[test]
  fn history_copies_listing_observation() {
    let mut car = Car::new("7", "kavak", "u").unwrap();
    car.price = Some(100);
    car.label("Apartado");
    car.label("Descuento");

    let h = ScrapeHistory::observe(&car, CarId(3), ScrapeId(9));
    assert_eq!(h.labels, "Apartado, Descuento");
    assert_eq!(h.price, Some(100));
    assert_eq!(h.car_id, CarId(3));
  }
}
