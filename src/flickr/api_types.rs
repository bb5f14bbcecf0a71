//! Serde-deserializable types matching Flickr REST responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Deserializer};

use super::types::{PageResult, Photo};

const UNTITLED: &str = "Untitled";

// ============================================================================
// Envelope
// ============================================================================

/// Top-level response. `stat` is "ok" or "fail"; on failure `code` and
/// `message` describe the problem and `photos` is absent.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
  pub stat: String,
  pub photos: Option<ApiPhotos>,
  pub code: Option<i64>,
  pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPhotos {
  #[serde(deserialize_with = "number_or_string")]
  pub page: u64,
  #[serde(deserialize_with = "number_or_string")]
  pub pages: u64,
  #[serde(deserialize_with = "number_or_string")]
  pub total: u64,
  #[serde(default)]
  pub photo: Vec<ApiPhoto>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPhoto {
  pub id: String,
  pub title: Option<String>,
  #[serde(default)]
  pub owner: String,
  #[serde(default)]
  pub server: String,
  #[serde(default)]
  pub secret: String,
  pub url_s: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiPhoto> for Photo {
  fn from(raw: ApiPhoto) -> Self {
    Photo {
      id: raw.id,
      title: raw
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string()),
      url: raw.url_s,
      owner: raw.owner,
      server: raw.server,
      secret: raw.secret,
    }
  }
}

impl From<ApiPhotos> for PageResult {
  fn from(raw: ApiPhotos) -> Self {
    PageResult {
      photos: raw.photo.into_iter().map(Photo::from).collect(),
      page: saturate_u32(raw.page),
      total_pages: saturate_u32(raw.pages),
      total: raw.total,
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

fn saturate_u32(value: u64) -> u32 {
  u32::try_from(value).unwrap_or(u32::MAX)
}

/// Flickr sends pagination fields as numbers on some methods and as numeric
/// strings on others.
fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(u64),
    Text(String),
  }

  match Raw::deserialize(deserializer)? {
    Raw::Number(n) => Ok(n),
    Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_missing_and_empty_title_become_untitled() {
    let body = r#"{
      "stat": "ok",
      "photos": {
        "page": 1, "pages": 1, "total": 2,
        "photo": [
          {"id": "1", "owner": "o", "server": "s", "secret": "x"},
          {"id": "2", "owner": "o", "server": "s", "secret": "x", "title": ""}
        ]
      }
    }"#;

    let response: ApiResponse = serde_json::from_str(body).unwrap();
    let page = PageResult::from(response.photos.unwrap());

    assert_eq!(page.photos[0].title, "Untitled");
    assert_eq!(page.photos[1].title, "Untitled");
    assert_eq!(page.photos[0].url, None);
  }

  #[test]
  fn test_pagination_accepts_numeric_strings() {
    let body = r#"{
      "stat": "ok",
      "photos": {"page": "3", "pages": "120", "total": "2391", "photo": []}
    }"#;

    let response: ApiResponse = serde_json::from_str(body).unwrap();
    let page = PageResult::from(response.photos.unwrap());

    assert_eq!((page.page, page.total_pages, page.total), (3, 120, 2391));
  }

  #[test]
  fn test_failure_envelope() {
    let body = r#"{"stat": "fail", "code": 100, "message": "Invalid API Key (Key has invalid format)"}"#;

    let response: ApiResponse = serde_json::from_str(body).unwrap();

    assert_eq!(response.stat, "fail");
    assert!(response.photos.is_none());
    assert_eq!(response.code, Some(100));
  }
}
