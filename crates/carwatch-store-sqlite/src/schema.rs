//! SQL schema for the carwatch SQLite store.
//!
//! Applied only when `PRAGMA user_version` reads 0, i.e. the file was just
//! created (or never provisioned). The script ends by setting the version.
//! Foreign-key enforcement is per connection and is switched on at open.

pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scrapes (
    scrape_id     INTEGER PRIMARY KEY,
    start_time    TEXT NOT NULL,   -- RFC 3339 UTC
    end_time      TEXT,            -- NULL while the session is open
    ok            INTEGER NOT NULL DEFAULT 0,
    error_kind    TEXT NOT NULL DEFAULT '',
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS versions (
    version_id          INTEGER PRIMARY KEY,
    brand               TEXT NOT NULL,
    model               TEXT NOT NULL,
    version_name        TEXT,
    year                INTEGER,
    body_style          TEXT,
    engine_displacement REAL,
    transmission_type   TEXT,
    natural_key         TEXT NOT NULL UNIQUE
);

-- First write wins: rows are never updated.
CREATE TABLE IF NOT EXISTS version_details (
    version_id                      INTEGER PRIMARY KEY REFERENCES versions(version_id),
    cylinders                       INTEGER,
    horsepower                      INTEGER,
    weight_kg                       INTEGER,
    fuel_range                      INTEGER,
    fuel_economy                    REAL,
    num_of_gears                    INTEGER,
    fuel_type                       TEXT,
    engine_type                     TEXT,
    num_of_doors                    INTEGER,
    num_of_airbags                  INTEGER,
    num_of_passengers               INTEGER,
    rim_inches                      INTEGER,
    rim_material                    TEXT,
    interior_materials              TEXT,
    has_startstop_button            INTEGER NOT NULL DEFAULT 0,
    has_gps                         INTEGER NOT NULL DEFAULT 0,
    has_start_button                INTEGER NOT NULL DEFAULT 0,
    has_sunroof                     INTEGER NOT NULL DEFAULT 0,
    has_cruise_control              INTEGER NOT NULL DEFAULT 0,
    has_heated_seats                INTEGER NOT NULL DEFAULT 0,
    has_distance_sensor             INTEGER NOT NULL DEFAULT 0,
    has_abs                         INTEGER NOT NULL DEFAULT 0,
    has_rain_sensor                 INTEGER NOT NULL DEFAULT 0,
    has_automatic_emergency_braking INTEGER NOT NULL DEFAULT 0,
    has_bluetooth                   INTEGER NOT NULL DEFAULT 0,
    has_touchscreen                 INTEGER NOT NULL DEFAULT 0,
    has_android_auto                INTEGER NOT NULL DEFAULT 0,
    has_apple_carplay               INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS cars (
    car_id     INTEGER PRIMARY KEY,
    identifier TEXT NOT NULL,
    website    TEXT NOT NULL,
    url        TEXT NOT NULL,
    image_url  TEXT,
    report_url TEXT,
    version_id INTEGER REFERENCES versions(version_id),
    UNIQUE (identifier, website)
);

-- First write wins: rows are never updated.
CREATE TABLE IF NOT EXISTS car_info (
    car_id      INTEGER PRIMARY KEY REFERENCES cars(car_id),
    city        TEXT,
    odometer    INTEGER,
    image_path  TEXT,
    report_path TEXT
);

-- Append-only: one row per observation, never deduplicated.
CREATE TABLE IF NOT EXISTS scrape_history (
    car_id    INTEGER NOT NULL REFERENCES cars(car_id),
    scrape_id INTEGER NOT NULL REFERENCES scrapes(scrape_id),
    labels    TEXT NOT NULL DEFAULT '',
    price     INTEGER
);

CREATE INDEX IF NOT EXISTS scrape_history_car_idx    ON scrape_history(car_id);
CREATE INDEX IF NOT EXISTS scrape_history_scrape_idx ON scrape_history(scrape_id);

PRAGMA user_version = 1;
";
