//! Saving car images next to the database.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use carwatch_core::model::Car;
use tracing::{debug, warn};

use crate::Result;

pub trait Download: Send + Sync {
  /// Fetch `url` and write the body to `dest`, creating parent directories.
  fn download<'a>(
    &'a self,
    url: &'a str,
    dest: &'a Path,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// `<dir>/<website>/<identifier>.jpg`, with anything outside
/// `[A-Za-z0-9_-]` in the identifier replaced by `_`.
pub fn image_path(dir: &Path, car: &Car) -> PathBuf {
  let stem: String = car
    .identifier
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect();
  dir.join(&car.website).join(format!("{stem}.jpg"))
}

/// Download the car's image into `dir`. Returns the stored path, or `None`
/// when the car has no image or the download failed.
pub async fn save_image<D: Download>(downloader: &D, dir: &Path, car: &Car) -> Option<String> {
  let url = car.image_url.as_deref()?;
  let dest = image_path(dir, car);
  match downloader.download(url, &dest).await {
    Ok(()) => {
      debug!(path = %dest.display(), "saved image");
      Some(dest.to_string_lossy().into_owned())
    }
    Err(e) => {
      warn!(url, error = %e, "image download failed");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_path_is_sanitised() {
    let car = Car::new("ab/../12 3", "kavak", "https://x").unwrap();
    assert_eq!(
      image_path(Path::new("media"), &car),
      PathBuf::from("media/kavak/ab____12_3.jpg")
    );
  }
}
