//! Courtesy delay between page fetches.

use std::time::Duration;

use rand_core::{OsRng, RngCore as _};
use tracing::debug;

use crate::config::PacingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
  min: Duration,
  max: Duration,
}

impl Pacing {
  pub fn new(min: Duration, max: Duration) -> Self {
    if max < min { Self { min: max, max: min } } else { Self { min, max } }
  }

  pub fn none() -> Self { Self::new(Duration::ZERO, Duration::ZERO) }

  /// A uniformly jittered delay in `[min, max]`.
  pub fn next_delay(&self) -> Duration {
    let span = (self.max - self.min).as_millis() as u64;
    if span == 0 {
      return self.min;
    }
    self.min + Duration::from_millis(OsRng.next_u64() % (span + 1))
  }

  pub async fn pause(&self) {
    let delay = self.next_delay();
    if !delay.is_zero() {
      debug!(delay_ms = delay.as_millis() as u64, "pacing");
      tokio::time::sleep(delay).await;
    }
  }
}

impl From<&PacingSettings> for Pacing {
  fn from(s: &PacingSettings) -> Self {
    Self::new(Duration::from_millis(s.min_delay_ms), Duration::from_millis(s.max_delay_ms))
  }
}
