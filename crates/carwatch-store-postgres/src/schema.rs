//! SQL schema for the carwatch PostgreSQL store.
//!
//! Mirrors the SQLite schema with native types. Applied when the `scrapes`
//! table is not visible on the connection's search path.

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scrapes (
    scrape_id     BIGINT PRIMARY KEY,
    start_time    TEXT NOT NULL,
    end_time      TEXT,
    ok            BOOLEAN NOT NULL DEFAULT FALSE,
    error_kind    TEXT NOT NULL DEFAULT '',
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS versions (
    version_id          BIGINT PRIMARY KEY,
    brand               TEXT NOT NULL,
    model               TEXT NOT NULL,
    version_name        TEXT,
    year                BIGINT,
    body_style          TEXT,
    engine_displacement DOUBLE PRECISION,
    transmission_type   TEXT,
    natural_key         TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS version_details (
    version_id                      BIGINT PRIMARY KEY REFERENCES versions(version_id),
    cylinders                       BIGINT,
    horsepower                      BIGINT,
    weight_kg                       BIGINT,
    fuel_range                      BIGINT,
    fuel_economy                    DOUBLE PRECISION,
    num_of_gears                    BIGINT,
    fuel_type                       TEXT,
    engine_type                     TEXT,
    num_of_doors                    BIGINT,
    num_of_airbags                  BIGINT,
    num_of_passengers               BIGINT,
    rim_inches                      BIGINT,
    rim_material                    TEXT,
    interior_materials              TEXT,
    has_startstop_button            BOOLEAN NOT NULL DEFAULT FALSE,
    has_gps                         BOOLEAN NOT NULL DEFAULT FALSE,
    has_start_button                BOOLEAN NOT NULL DEFAULT FALSE,
    has_sunroof                     BOOLEAN NOT NULL DEFAULT FALSE,
    has_cruise_control              BOOLEAN NOT NULL DEFAULT FALSE,
    has_heated_seats                BOOLEAN NOT NULL DEFAULT FALSE,
    has_distance_sensor             BOOLEAN NOT NULL DEFAULT FALSE,
    has_abs                         BOOLEAN NOT NULL DEFAULT FALSE,
    has_rain_sensor                 BOOLEAN NOT NULL DEFAULT FALSE,
    has_automatic_emergency_braking BOOLEAN NOT NULL DEFAULT FALSE,
    has_bluetooth                   BOOLEAN NOT NULL DEFAULT FALSE,
    has_touchscreen                 BOOLEAN NOT NULL DEFAULT FALSE,
    has_android_auto                BOOLEAN NOT NULL DEFAULT FALSE,
    has_apple_carplay               BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS cars (
    car_id     BIGINT PRIMARY KEY,
    identifier TEXT NOT NULL,
    website    TEXT NOT NULL,
    url        TEXT NOT NULL,
    image_url  TEXT,
    report_url TEXT,
    version_id BIGINT REFERENCES versions(version_id),
    UNIQUE (identifier, website)
);

CREATE TABLE IF NOT EXISTS car_info (
    car_id      BIGINT PRIMARY KEY REFERENCES cars(car_id),
    city        TEXT,
    odometer    BIGINT,
    image_path  TEXT,
    report_path TEXT
);

CREATE TABLE IF NOT EXISTS scrape_history (
    car_id    BIGINT NOT NULL REFERENCES cars(car_id),
    scrape_id BIGINT NOT NULL REFERENCES scrapes(scrape_id),
    labels    TEXT NOT NULL DEFAULT '',
    price     BIGINT
);

CREATE INDEX IF NOT EXISTS scrape_history_car_idx    ON scrape_history(car_id);
CREATE INDEX IF NOT EXISTS scrape_history_scrape_idx ON scrape_history(scrape_id);
";
