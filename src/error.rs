//! Typed errors for the fetch and storage layers.
//!
//! Application-level failures (config, startup) use `color_eyre::Result`.

use thiserror::Error;

/// Failure of a remote photo query.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Search called with an empty or whitespace-only query. Raised before any I/O.
  #[error("search query must not be empty")]
  EmptyQuery,

  /// The server answered with a non-2xx status
  #[error("HTTP error: status {0}")]
  Status(u16),

  /// Connection, DNS, TLS or timeout failure
  #[error("request failed: {0}")]
  Transport(String),

  /// The payload carried `stat: "fail"`
  #[error("Flickr API error {code}: {message}")]
  Api { code: i64, message: String },

  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl FetchError {
  /// True when the request never reached the API.
  pub fn is_connectivity(&self) -> bool {
    matches!(self, FetchError::Transport(_))
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return FetchError::Decode(err.to_string());
    }
    if let Some(status) = err.status() {
      return FetchError::Status(status.as_u16());
    }
    FetchError::Transport(err.to_string())
  }
}

/// Failure of the local key-value storage. Never escapes `ResultStore`.
#[derive(Debug, Error)]
pub enum StorageError {
  #[error("sqlite: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("lock poisoned")]
  Poisoned,

  #[error("invalid timestamp '{0}'")]
  Timestamp(String),
}
