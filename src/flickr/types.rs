use serde::{Deserialize, Serialize};

/// A single photo as shown in the feed.
///
/// `server`, `id` and `secret` together form the static image key, see
/// [`build_photo_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
  pub id: String,
  pub title: String,
  /// Small display image (`url_s`), absent for some records
  pub url: Option<String>,
  pub owner: String,
  pub server: String,
  pub secret: String,
}

/// One page of a feed or search, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
  pub photos: Vec<Photo>,
  pub page: u32,
  pub total_pages: u32,
  pub total: u64,
}

/// Build the static image URL for a photo whose `url` is missing.
pub fn build_photo_url(photo: &Photo) -> String {
  format!(
    "https://live.staticflickr.com/{}/{}_{}_m.jpg",
    photo.server, photo.id, photo.secret
  )
}
