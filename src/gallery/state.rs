use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::flickr::{PageResult, Photo};

/// Which feed the session is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
  Recent,
  Search(String),
}

impl Feed {
  pub fn label(&self) -> String {
    match self {
      Feed::Recent => "Recent photos".to_string(),
      Feed::Search(query) => format!("Search: {}", query),
    }
  }
}

/// Where the displayed first page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Network confirmed the displayed data is current
  Fresh,
  /// Shown from cache, network answer still pending
  Cached,
  /// Shown from cache because the network attempt failed
  Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub page: u32,
  pub total_pages: u32,
  pub total: u64,
}

impl Pagination {
  /// Pagination for data without server metadata, such as a cached first page.
  pub fn single(count: usize) -> Self {
    Self {
      page: 1,
      total_pages: 1,
      total: count as u64,
    }
  }

  pub fn has_more(&self) -> bool {
    self.page < self.total_pages
  }
}

impl From<&PageResult> for Pagination {
  fn from(result: &PageResult) -> Self {
    Self {
      page: result.page,
      total_pages: result.total_pages,
      total: result.total,
    }
  }
}

/// What the presentation renders while in `Ready` or `LoadingMore`
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
  pub freshness: Freshness,
  pub photos: Arc<Vec<Photo>>,
  pub pagination: Pagination,
  /// When the displayed cache was written, for stale data only
  pub cached_at: Option<DateTime<Utc>>,
  /// The last next-page request failed; offer an inline retry
  pub load_more_failed: bool,
}

impl Snapshot {
  /// True when the displayed data may be out of date.
  pub fn is_stale(&self) -> bool {
    self.freshness != Freshness::Fresh
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Network unreachable and nothing cached
  NoConnection,
  /// Any other failure without cached data
  Failed,
}

/// State of one gallery session
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryState {
  Idle,
  /// First page requested
  Loading { page: u32 },
  /// Next page requested, current pages still shown
  LoadingMore { page: u32, snapshot: Snapshot },
  Ready(Snapshot),
  /// Nothing to show; the presentation offers a retry
  Error { kind: ErrorKind, message: String },
}
