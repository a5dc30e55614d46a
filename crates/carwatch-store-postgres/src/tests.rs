//! Tests against a live server. Set `CARWATCH_TEST_POSTGRES_URL` and run
//! with `--ignored`; each test provisions into its own schema.

use std::{sync::Arc, time::Duration};

use carwatch_core::{
  gateway::{Backend, Gateway},
  identity::{IdentityResolver, Resolution},
  model::{Car, CarInfo, ScrapeHistory, Version},
  record::VersionId,
  session::{self, OpenSession, Outcome},
  sql::Predicate,
  value::Field,
};
use sqlx::postgres::PgConnectOptions;

use crate::PostgresStore;

async fn store(schema: &str) -> PostgresStore {
  let url = std::env::var("CARWATCH_TEST_POSTGRES_URL")
    .expect("CARWATCH_TEST_POSTGRES_URL must be set");
  let admin = sqlx::PgPool::connect(&url).await.expect("connect");
  sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema};"))
    .execute(&admin)
    .await
    .expect("reset schema");

  let options: PgConnectOptions = url.parse().expect("url");
  let options = options.options([("search_path", schema)]);
  PostgresStore::connect_with(options, Duration::from_secs(5))
    .await
    .expect("postgres store")
}

fn explorer() -> Version {
  Version::new("Ford", "Explorer")
    .unwrap()
    .version_name(Some("Limited"))
    .year(Some(2019))
    .body_style(Some("SUV"))
    .engine_displacement(Some(3.5))
    .transmission_type(Some("Automatico"))
}

#[tokio::test]
#[ignore]
async fn provisions_fresh_schema_once() {
  let s = store("carwatch_test_provision").await;
  assert!(s.provisioned());
  assert_eq!(s.backend(), Backend::Postgres);

  let url = std::env::var("CARWATCH_TEST_POSTGRES_URL").unwrap();
  let options: PgConnectOptions = url.parse().unwrap();
  let again = PostgresStore::connect_with(
    options.options([("search_path", "carwatch_test_provision")]),
    Duration::from_secs(5),
  )
  .await
  .unwrap();
  assert!(!again.provisioned());
}

#[tokio::test]
#[ignore]
async fn version_resolves_to_same_id_twice() {
  let r = IdentityResolver::new(Arc::new(store("carwatch_test_version").await));

  let a = r.persist(&mut explorer()).await.unwrap();
  let b = r.persist(&mut explorer()).await.unwrap();
  assert_eq!(a, Resolution::New(VersionId(0)));
  assert_eq!(b, Resolution::Existing(VersionId(0)));

  let rows = r.gateway().select("versions", &[], None).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].opt_f64("engine_displacement").unwrap(), Some(3.5));
}

#[tokio::test]
#[ignore]
async fn typed_nulls_bind_and_match() {
  let r = IdentityResolver::new(Arc::new(store("carwatch_test_nulls").await));
  let mut bare = Version::new("Nissan", "Versa").unwrap();
  let first = r.persist(&mut bare).await.unwrap();
  let second = r.persist(&mut Version::new("Nissan", "Versa").unwrap()).await.unwrap();
  assert_eq!(first.id(), second.id());
  assert!(second.already_exists());
}

#[tokio::test]
#[ignore]
async fn car_info_written_once_and_history_appends() {
  let r = Arc::new(IdentityResolver::new(Arc::new(store("carwatch_test_children").await)));
  let mut car = Car::new("777", "kavak", "https://www.kavak.com/mx/777").unwrap();
  car.price = Some(199_000);
  let car_id = r.persist(&mut car).await.unwrap().id();

  assert!(r.persist_once(&CarInfo::new(car_id).city(Some("puebla"))).await.unwrap());
  assert!(!r.persist_once(&CarInfo::new(car_id).city(Some("cdmx"))).await.unwrap());

  for _ in 0..2 {
    let s = OpenSession::open(Arc::clone(&r)).await.unwrap();
    r.append(&ScrapeHistory::observe(&car, car_id, s.id())).await.unwrap();
    s.close(Outcome::Succeeded).await.unwrap();
  }
  let history = r.gateway().select("scrape_history", &[], None).await.unwrap();
  assert_eq!(history.len(), 2);
}

#[tokio::test]
#[ignore]
async fn failed_session_is_recorded() {
  let r = Arc::new(IdentityResolver::new(Arc::new(store("carwatch_test_session").await)));
  let session = OpenSession::open(Arc::clone(&r)).await.unwrap();
  let id = session.id();
  session.close(Outcome::failed("Transport", "connection reset")).await.unwrap();

  let listed = session::list_sessions(r.gateway().as_ref(), 1).await.unwrap();
  assert_eq!(listed[0].id, Some(id));
  assert!(!listed[0].ok);
  assert_eq!(listed[0].error_kind, "Transport");
  assert!(listed[0].end_time.is_some());

  let changed = r
    .update(
      "scrapes",
      &[Field::column("ok", true)],
      &Predicate::new().eq("scrape_id", id.0).is_null("end_time"),
    )
    .await
    .unwrap();
  assert_eq!(changed, 0);
}
