//! Site profile for kavak.com listings.

use carwatch_core::{
  model::{Car, CarInfo, Version, VersionDetails},
  normalize,
};
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use crate::{
  Document, Extracted, FieldRules, Result, Rule,
  document::text_of,
  fetch::Fetched,
  rule::{parse_regex, parse_selector},
  site::{ListingCard, Observation, Site},
};

pub const WEBSITE: &str = "kavak";
pub const DEFAULT_LISTING_URL: &str = "https://www.kavak.com/mx/seminuevos";

pub const AVAILABLE: &str = "Disponible";
pub const RESERVED: &str = "Apartado";
pub const DISCOUNTED: &str = "Descuento";

const PAGINATION: &str = "a.results_results__pagination-nav__Qcftr";
const CARDS: &str = "#main-content .results_results__container__tcF4_";
const CARD_PRICE: &str = "span.amount_uki-amount__large__price__2NvVx";
const PROMO: &str = "Vende tu auto y.*";

const DETAIL: &str = "div.desktop_car-detail__start__BToHy";
const BUY_BOX: &str = "aside.buy-box_wrapper__jCjj4";
const BREADCRUMB: &str = "ul.breadcrumb_breadcrumb__nPwIW";

/// Equipment flags: a two-letter yes/no token right before the label.
const FLAGS: &[(&str, &str)] = &[
  ("has_startstop_button", "Start.Stop"),
  ("has_gps", r"\s?GPS"),
  ("has_start_button", r"\s?Bot.n de Encendido"),
  ("has_sunroof", r"\s?Techo Panor.mico"),
  ("has_cruise_control", r"\s?Control de Crucero"),
  ("has_heated_seats", r"\s?Asientos.*alefaccionados"),
  ("has_distance_sensor", r"\s?Sensor de distancia"),
  ("has_abs", r"\s?Tipo Frenos ABS"),
  ("has_rain_sensor", r"\s?Sensor de lluvia"),
  ("has_automatic_emergency_braking", r"\s?Asistencia de frenado"),
  ("has_bluetooth", r"\s?Bluetooth"),
  ("has_touchscreen", r"\s?Pantalla T.ctil"),
  ("has_android_auto", r"\s?Android Auto"),
  ("has_apple_carplay", r"\s?Apple CarPlay"),
];

pub struct Kavak {
  listing_url: String,
  pagination:  Selector,
  cards:       Selector,
  anchor:      Selector,
  card_price:  Selector,
  promo:       Regex,
  detail:      FieldRules,
}

impl Kavak {
  pub fn new(listing_url: impl Into<String>) -> Result<Self> {
    Ok(Self {
      listing_url: listing_url.into(),
      pagination:  parse_selector(PAGINATION)?,
      cards:       parse_selector(CARDS)?,
      anchor:      parse_selector("a")?,
      card_price:  parse_selector(CARD_PRICE)?,
      promo:       parse_regex(PROMO)?,
      detail:      detail_rules()?,
    })
  }

  pub fn detail_rules(&self) -> &FieldRules { &self.detail }

  fn card(&self, el: ElementRef<'_>) -> Option<ListingCard> {
    let anchor = if el.value().name() == "a" {
      el
    } else {
      el.select(&self.anchor).next()?
    };
    let identifier = anchor
      .value()
      .attr("data-testid")?
      .rsplit('-')
      .next()
      .and_then(normalize::clean)?;
    let url = absolute(&self.listing_url, anchor.value().attr("href")?);

    let price = el
      .select(&self.card_price)
      .next()
      .and_then(|span| normalize::int(&text_of(span)));
    let label = if price.is_some() { AVAILABLE } else { RESERVED };

    Some(ListingCard { identifier, url, price, labels: vec![label.to_owned()] })
  }
}

impl Site for Kavak {
  fn website(&self) -> &'static str { WEBSITE }

  fn listing_url(&self) -> &str { &self.listing_url }

  fn listing_query(&self, page: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string())]
  }

  fn parse_listing(&self, page: &Fetched) -> Option<Vec<ListingCard>> {
    if !page.is_ok() {
      debug!(url = %page.url, status = page.status, "listing page not available");
      return None;
    }
    let doc = Document::parse(&page.body);
    let nav = doc.select(&self.pagination).count();
    if nav < 2 {
      debug!(url = %page.url, nav, "no pagination on listing page");
      return None;
    }
    let container = doc.select(&self.cards).next()?;

    let mut cards = Vec::new();
    for el in container.children().filter_map(ElementRef::wrap) {
      if self.promo.is_match(&text_of(el)) {
        continue;
      }
      match self.card(el) {
        Some(card) => cards.push(card),
        None => warn!(url = %page.url, "listing card without identifier, skipped"),
      }
    }
    Some(cards)
  }

  fn parse_detail(&self, card: &ListingCard, body: &str) -> Option<Observation> {
    let doc = Document::parse(body);
    let x = self.detail.extract(&doc);

    let identifier = x.text("identifier").unwrap_or(&card.identifier);
    let mut car = Car::new(identifier, WEBSITE, &card.url)?;
    car.image_url = x.text("image_url").map(|u| absolute(&self.listing_url, u));
    car.report_url = x.text("report_url").map(|u| absolute(&self.listing_url, u));
    car.price = card.price.or_else(|| x.int("price"));
    for label in &card.labels {
      car.label(label);
    }
    if let (Some(original), Some(price)) = (x.int("original_price"), car.price)
      && original > price
    {
      car.label(DISCOUNTED);
    }

    Some(Observation {
      version: version(&x),
      details: details(&x),
      car,
      info: CarInfo { odometer: x.int("odometer"), ..CarInfo::default().city(x.text("city")) },
    })
  }
}

fn version(x: &Extracted) -> Option<Version> {
  let version = Version::new(x.text("brand")?, x.text("model")?)?
    .version_name(x.text("version_name"))
    .year(x.int("year").and_then(|y| i32::try_from(y).ok()))
    .body_style(x.text("body_style"))
    .engine_displacement(x.float("engine_displacement"))
    .transmission_type(x.text("transmission_type"));
  Some(version)
}

fn details(x: &Extracted) -> VersionDetails {
  VersionDetails {
    cylinders: x.int("cylinders"),
    horsepower: x.int("horsepower"),
    weight_kg: x.int("weight_kg"),
    fuel_range: x.int("fuel_range"),
    fuel_economy: x.float("fuel_economy"),
    num_of_gears: x.int("num_of_gears"),
    fuel_type: x.text("fuel_type").and_then(normalize::proper_noun),
    engine_type: x.text("engine_type").and_then(normalize::proper_noun),
    num_of_doors: x.int("num_of_doors"),
    num_of_airbags: x.int("num_of_airbags"),
    num_of_passengers: x.int("num_of_passengers"),
    rim_inches: x.int("rim_inches"),
    rim_material: x.text("rim_material").and_then(normalize::proper_noun),
    interior_materials: x.text("interior_materials").and_then(normalize::proper_noun),
    has_startstop_button: x.flag("has_startstop_button"),
    has_gps: x.flag("has_gps"),
    has_start_button: x.flag("has_start_button"),
    has_sunroof: x.flag("has_sunroof"),
    has_cruise_control: x.flag("has_cruise_control"),
    has_heated_seats: x.flag("has_heated_seats"),
    has_distance_sensor: x.flag("has_distance_sensor"),
    has_abs: x.flag("has_abs"),
    has_rain_sensor: x.flag("has_rain_sensor"),
    has_automatic_emergency_braking: x.flag("has_automatic_emergency_braking"),
    has_bluetooth: x.flag("has_bluetooth"),
    has_touchscreen: x.flag("has_touchscreen"),
    has_android_auto: x.flag("has_android_auto"),
    has_apple_carplay: x.flag("has_apple_carplay"),
    ..VersionDetails::default()
  }
}

fn detail_rules() -> Result<FieldRules> {
  let crumb = |n: u8, leaf: &str| format!("{BREADCRUMB} li:nth-child({n}) {leaf}");
  let mut rules = FieldRules::new()
    .field("identifier", Rule::sibling_text("Stock ID")?)
    .field("brand", Rule::css_text(&crumb(2, "a"), "first")?)
    .field("model", Rule::css_text(&crumb(3, "a"), "first")?)
    .field("year", Rule::css_text(&crumb(4, "a"), "first")?)
    .field("version_name", Rule::css_text(&crumb(5, "span"), "first")?)
    .field("body_style", Rule::sibling_text("Tipo de Carrocería")?)
    .field("engine_displacement", Rule::regex_within(r"(\d+(?:\.\d+)?)\s?Litros", DETAIL)?)
    .field(
      "transmission_type",
      Rule::regex_within(r"Transmisión\s?(Automático|Manual)", BUY_BOX)?,
    )
    .field(
      "city",
      Rule::regex_within(
        r"([A-ZÁÉÍÓÚ][a-záéíóú]+(?:\s(?:de\s)?[A-ZÁÉÍÓÚ][a-záéíóú]+)*)\s?Ciudad",
        DETAIL,
      )?,
    )
    .field("odometer", Rule::regex_within(r"(\d[\d,]*)\s?km", BUY_BOX)?)
    .field("price", Rule::css_text("span.amount_uki-amount__extraLarge__price__ZMOLc", "first")?)
    .field("original_price", Rule::css_text("span.price_amount__dRxZ8", "first")?)
    .field("image_url", Rule::css_attr("div.keen-slider__slide img", "src", "first")?)
    .field("report_url", Rule::css_attr(r#"a[href$=".pdf"]"#, "href", "first")?)
    .field("cylinders", Rule::regex(r"(\d+)\s?Cilindros")?)
    .field("horsepower", Rule::regex_within(r"(\d+)\s?Caballos de Fuerza", DETAIL)?)
    .field("weight_kg", Rule::regex_within(r"(\d+)\s?Peso bruto", DETAIL)?)
    .field("fuel_range", Rule::regex_within(r"(\d+)\s?Autonom.a combinada", DETAIL)?)
    .field("fuel_economy", Rule::regex_within(r"(\d+\.\d+)\s?Consumo", DETAIL)?)
    .field("num_of_gears", Rule::regex_within(r"(\d+)\s?N.mero de Velocidades", DETAIL)?)
    .field("fuel_type", Rule::regex_within(r"([A-Z][a-z]+)\s?Combustible", DETAIL)?)
    .field(
      "engine_type",
      Rule::regex_within(r"([A-ZÁÉÍÓÚ][a-záéíóú]+)\s?Tipo de motor", DETAIL)?,
    )
    .field("num_of_doors", Rule::regex_within(r"(\d+)\s?N.mero de Puertas", DETAIL)?)
    .field("num_of_airbags", Rule::regex_within(r"(\d+)\s?N.mero.*Airbags", DETAIL)?)
    .field("rim_inches", Rule::regex_within(r"(\d+)\s?Di.metro de Rin", DETAIL)?)
    .field(
      "rim_material",
      Rule::regex_within(r"([A-ZÁÉÍÓÚ][a-záéíóú]+)\s?Tipo de Rin", DETAIL)?,
    )
    .field("num_of_passengers", Rule::regex_within(r"(\d+)\s?N.mero de Pasajeros", DETAIL)?)
    .field(
      "interior_materials",
      Rule::regex_within(r"([A-ZÁÉÍÓÚ][a-záéíóú]+)\s?Material Asientos?", DETAIL)?,
    );
  for (name, label) in FLAGS {
    let pattern = format!(r"([A-ZÁÉÍÓÚa-záéíóú]{{2}}){label}");
    rules = rules.field(name, Rule::regex_within(&pattern, DETAIL)?);
  }
  Ok(rules)
}

/// Resolve a root-relative `href` against the scheme and host of `base`.
fn absolute(base: &str, href: &str) -> String {
  if !href.starts_with('/') || href.starts_with("//") {
    return href.to_owned();
  }
  let origin_end = base
    .find("://")
    .and_then(|i| base[i + 3..].find('/').map(|j| i + 3 + j))
    .unwrap_or(base.len());
  format!("{}{href}", &base[..origin_end])
}
