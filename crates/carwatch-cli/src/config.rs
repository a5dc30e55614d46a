//! Runtime settings: an optional TOML file layered under `CARWATCH_*`
//! environment variables (`__` between nested keys, e.g.
//! `CARWATCH_DATABASE__POSTGRES_URL`).

use std::{path::{Path, PathBuf}, time::Duration};

use carwatch_extract::kavak;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Listing page to crawl; pages are selected with `?page=<n>`.
  pub base_url:             String,
  pub start_page:           u32,
  pub max_pages:            Option<u32>,
  pub pacing:               PacingSettings,
  pub request_timeout_secs: u64,
  pub user_agent:           String,
  /// Where car images are saved. Downloads are off when unset.
  pub media_dir:            Option<PathBuf>,
  pub database:             DatabaseSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      base_url:             kavak::DEFAULT_LISTING_URL.to_owned(),
      start_page:           0,
      max_pages:            None,
      pacing:               PacingSettings::default(),
      request_timeout_secs: 30,
      user_agent:           concat!("carwatch/", env!("CARGO_PKG_VERSION")).to_owned(),
      media_dir:            None,
      database:             DatabaseSettings::default(),
    }
  }
}

/// Jittered delay between listing pages, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
  pub min_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for PacingSettings {
  fn default() -> Self { Self { min_delay_ms: 10_000, max_delay_ms: 20_000 } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
  /// Tried first when set; SQLite is the fallback.
  pub postgres_url:         Option<String>,
  pub sqlite_path:          PathBuf,
  pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
  fn default() -> Self {
    Self {
      postgres_url:         None,
      sqlite_path:          PathBuf::from("carwatch.db"),
      connect_timeout_secs: 5,
    }
  }
}

impl DatabaseSettings {
  pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }
}

impl Settings {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CARWATCH")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/carwatch.toml")).unwrap();
    assert_eq!(settings.start_page, 0);
    assert_eq!(settings.pacing.min_delay_ms, 10_000);
    assert_eq!(settings.pacing.max_delay_ms, 20_000);
    assert_eq!(settings.database.sqlite_path, PathBuf::from("carwatch.db"));
  }

  #[test]
  fn file_overrides_defaults() {
    let path = std::env::temp_dir().join(format!("carwatch-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "max_pages = 3\nmedia_dir = \"media\"\n\n[pacing]\nmin_delay_ms = 0\nmax_delay_ms = 5\n\n\
       [database]\npostgres_url = \"postgres://localhost/carwatch\"\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.max_pages, Some(3));
    assert_eq!(settings.media_dir, Some(PathBuf::from("media")));
    assert_eq!(settings.pacing.max_delay_ms, 5);
    assert_eq!(
      settings.database.postgres_url.as_deref(),
      Some("postgres://localhost/carwatch")
    );
    assert_eq!(settings.database.connect_timeout_secs, 5);
  }
}
