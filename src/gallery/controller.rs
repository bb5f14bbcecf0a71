//! Reconciliation of cached and fetched photos for one gallery session.
//!
//! Commands are synchronous: they update the state, emit the transition and
//! spawn the I/O. Task results come back over a channel and are applied by
//! [`GalleryController::process_next`], so only the owning task ever
//! mutates the state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheRecord, ResultStore};
use crate::error::FetchError;
use crate::flickr::{PageResult, Photo, PhotoSource};

use super::state::{ErrorKind, Feed, Freshness, GalleryState, Pagination, Snapshot};

const NO_CONNECTION_MESSAGE: &str =
  "No internet connection. Please connect to the internet to load photos for the first time.";
const LOAD_FAILED_MESSAGE: &str = "Failed to load photos. Please check your connection and try again.";
const SEARCH_FAILED_MESSAGE: &str = "Failed to search photos. Please check your connection.";

/// Result of the first-page request after change detection ran.
#[derive(Debug)]
struct FirstPage {
  result: PageResult,
  changed: bool,
}

/// Results sent back by spawned tasks
#[derive(Debug)]
enum TaskEvent {
  CacheRead {
    generation: u64,
    record: Option<CacheRecord>,
  },
  FirstPageFetched {
    generation: u64,
    result: Result<FirstPage, FetchError>,
  },
  NextPageFetched {
    generation: u64,
    result: Result<PageResult, FetchError>,
  },
}

/// Drives one gallery session: cache first, network second, pages appended.
pub struct GalleryController {
  source: Arc<dyn PhotoSource>,
  store: ResultStore,
  feed: Feed,
  state: GalleryState,

  photos: Arc<Vec<Photo>>,
  pagination: Pagination,
  freshness: Freshness,
  cached_at: Option<DateTime<Utc>>,
  load_more_failed: bool,

  /// Bumped on every first-page load; older results are dropped
  generation: u64,
  /// The current generation showed cached photos
  cache_hit: bool,
  /// A request of the current generation is outstanding
  in_flight: bool,
  /// Spawned tasks whose final event has not been processed
  pending: usize,

  task_tx: mpsc::UnboundedSender<TaskEvent>,
  task_rx: mpsc::UnboundedReceiver<TaskEvent>,
  state_tx: mpsc::UnboundedSender<GalleryState>,
}

impl GalleryController {
  /// Create an idle controller on the recent feed.
  ///
  /// `store` caches the recent feed; search results never touch it. The
  /// receiver yields every state transition in order.
  pub fn new(
    source: Arc<dyn PhotoSource>,
    store: ResultStore,
  ) -> (Self, mpsc::UnboundedReceiver<GalleryState>) {
    let (task_tx, task_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = mpsc::unbounded_channel();

    let controller = Self {
      source,
      store,
      feed: Feed::Recent,
      state: GalleryState::Idle,
      photos: Arc::new(Vec::new()),
      pagination: Pagination::single(0),
      freshness: Freshness::Fresh,
      cached_at: None,
      load_more_failed: false,
      generation: 0,
      cache_hit: false,
      in_flight: false,
      pending: 0,
      task_tx,
      task_rx,
      state_tx,
    };

    (controller, state_rx)
  }

  pub fn state(&self) -> &GalleryState {
    &self.state
  }

  pub fn feed(&self) -> &Feed {
    &self.feed
  }

  /// Whether spawned work is still outstanding.
  pub fn is_busy(&self) -> bool {
    self.pending > 0
  }

  // ==========================================================================
  // Commands
  // ==========================================================================

  /// Load the first page of the current feed, showing the cache first.
  pub fn load_initial(&mut self) {
    self.generation += 1;
    self.in_flight = true;
    self.cache_hit = false;
    self.load_more_failed = false;

    info!(feed = %self.feed.label(), generation = self.generation, "loading first page");
    self.transition(GalleryState::Loading { page: 1 });

    let generation = self.generation;
    let source = Arc::clone(&self.source);
    let feed = self.feed.clone();
    let store = match self.feed {
      Feed::Recent => Some(self.store.clone()),
      Feed::Search(_) => None,
    };
    let tx = self.task_tx.clone();

    self.pending += 1;
    tokio::spawn(async move {
      // The cache read is delivered before the network is awaited
      let mut cache_readable = false;
      if let Some(store) = &store {
        let record = store.record();
        cache_readable = record.is_some();
        let _ = tx.send(TaskEvent::CacheRead { generation, record });
      }

      let fetched = match &feed {
        Feed::Recent => source.fetch_recent(1).await,
        Feed::Search(query) => source.search(query, 1).await,
      };

      let result = fetched.map(|result| {
        let changed = match &store {
          Some(store) => {
            let changed = store.has_changed(&result.photos);
            // An unreadable cache is rewritten even when the fingerprint matches
            if changed || !cache_readable {
              store.put(&result.photos);
            }
            changed
          }
          None => true,
        };
        FirstPage { result, changed }
      });

      let _ = tx.send(TaskEvent::FirstPageFetched { generation, result });
    });
  }

  /// Request the next page. Returns false, without any transition or
  /// request, while a load is in flight, before the first page is ready, or
  /// once the last page is shown.
  pub fn load_more(&mut self) -> bool {
    if self.in_flight || !matches!(self.state, GalleryState::Ready(_)) || !self.pagination.has_more()
    {
      return false;
    }

    let page = self.pagination.page + 1;
    self.in_flight = true;
    self.load_more_failed = false;

    debug!(page, "loading next page");
    self.transition(GalleryState::LoadingMore {
      page,
      snapshot: self.snapshot(),
    });

    let generation = self.generation;
    let source = Arc::clone(&self.source);
    let feed = self.feed.clone();
    let tx = self.task_tx.clone();

    self.pending += 1;
    tokio::spawn(async move {
      let result = match &feed {
        Feed::Recent => source.fetch_recent(page).await,
        Feed::Search(query) => source.search(query, page).await,
      };
      let _ = tx.send(TaskEvent::NextPageFetched { generation, result });
    });

    true
  }

  /// Pull-to-refresh: rerun the first-page load.
  pub fn refresh(&mut self) {
    self.load_initial();
  }

  /// Switch to a search. Empty queries are rejected before any I/O or
  /// transition.
  pub fn search(&mut self, query: &str) -> Result<(), FetchError> {
    let query = query.trim();
    if query.is_empty() {
      return Err(FetchError::EmptyQuery);
    }

    self.switch_feed(Feed::Search(query.to_string()));
    Ok(())
  }

  /// Switch back to the recent feed.
  pub fn show_recent(&mut self) {
    self.switch_feed(Feed::Recent);
  }

  /// Retry whatever failed last. Returns false when there is nothing to retry.
  pub fn retry(&mut self) -> bool {
    let (reload, next_page) = match &self.state {
      GalleryState::Error { .. } => (true, false),
      GalleryState::Ready(snapshot) if snapshot.load_more_failed => (false, true),
      GalleryState::Ready(snapshot) => (snapshot.freshness == Freshness::Offline, false),
      _ => (false, false),
    };

    if next_page {
      return self.load_more();
    }
    if reload {
      self.load_initial();
    }
    reload
  }

  /// Drop the cached recent feed. Displayed photos are kept.
  pub fn clear_cache(&self) {
    self.store.clear();
  }

  // ==========================================================================
  // Task results
  // ==========================================================================

  /// Apply the next task result. Returns false immediately when nothing is
  /// outstanding.
  pub async fn process_next(&mut self) -> bool {
    if self.pending == 0 {
      return false;
    }

    match self.task_rx.recv().await {
      Some(event) => {
        self.handle_event(event);
        true
      }
      None => false,
    }
  }

  /// Process task results until nothing is outstanding.
  #[cfg(test)]
  pub async fn settle(&mut self) {
    while self.process_next().await {}
  }

  fn handle_event(&mut self, event: TaskEvent) {
    match event {
      TaskEvent::CacheRead { generation, record } => {
        if generation == self.generation {
          self.apply_cache(record);
        }
      }
      TaskEvent::FirstPageFetched { generation, result } => {
        self.pending -= 1;
        if generation == self.generation {
          self.apply_first_page(result);
        } else {
          debug!(generation, current = self.generation, "dropping superseded first page");
        }
      }
      TaskEvent::NextPageFetched { generation, result } => {
        self.pending -= 1;
        if generation == self.generation {
          self.apply_next_page(result);
        } else {
          debug!(generation, current = self.generation, "dropping superseded page");
        }
      }
    }
  }

  fn apply_cache(&mut self, record: Option<CacheRecord>) {
    let Some(record) = record.filter(|r| !r.photos.is_empty()) else {
      debug!("no cached photos");
      return;
    };

    debug!(count = record.photos.len(), fingerprint = %record.fingerprint, "showing cached photos");
    self.cache_hit = true;
    self.pagination = Pagination::single(record.photos.len());
    if *self.photos != record.photos {
      self.photos = Arc::new(record.photos);
    }
    self.freshness = Freshness::Cached;
    self.cached_at = Some(record.stored_at);
    self.transition(GalleryState::Ready(self.snapshot()));
  }

  fn apply_first_page(&mut self, result: Result<FirstPage, FetchError>) {
    self.in_flight = false;

    match result {
      Ok(FirstPage { result, changed }) => {
        self.pagination = Pagination::from(&result);
        // Unchanged content keeps the cached list to avoid a re-layout
        if changed || !self.cache_hit {
          info!(count = result.photos.len(), "showing fresh photos");
          self.photos = Arc::new(result.photos);
        } else {
          info!("network content unchanged, keeping cached photos");
        }
        self.freshness = Freshness::Fresh;
        self.cached_at = None;
        self.transition(GalleryState::Ready(self.snapshot()));
      }
      Err(e) if self.cache_hit => {
        warn!(error = %e, "first page failed, showing cached photos offline");
        self.freshness = Freshness::Offline;
        self.transition(GalleryState::Ready(self.snapshot()));
      }
      Err(e) => {
        warn!(error = %e, "first page failed with nothing cached");
        let kind = if e.is_connectivity() {
          ErrorKind::NoConnection
        } else {
          ErrorKind::Failed
        };
        let message = match (&self.feed, kind) {
          (Feed::Search(_), _) => SEARCH_FAILED_MESSAGE,
          (Feed::Recent, ErrorKind::NoConnection) => NO_CONNECTION_MESSAGE,
          (Feed::Recent, ErrorKind::Failed) => LOAD_FAILED_MESSAGE,
        };
        self.photos = Arc::new(Vec::new());
        self.pagination = Pagination::single(0);
        self.transition(GalleryState::Error {
          kind,
          message: message.to_string(),
        });
      }
    }
  }

  fn apply_next_page(&mut self, result: Result<PageResult, FetchError>) {
    self.in_flight = false;

    match result {
      Ok(result) => {
        debug!(page = result.page, count = result.photos.len(), "appending page");
        self.pagination = Pagination::from(&result);
        Arc::make_mut(&mut self.photos).extend(result.photos);
      }
      Err(e) => {
        warn!(error = %e, page = self.pagination.page + 1, "next page failed");
        self.load_more_failed = true;
      }
    }

    self.transition(GalleryState::Ready(self.snapshot()));
  }

  // ==========================================================================
  // Helpers
  // ==========================================================================

  fn switch_feed(&mut self, feed: Feed) {
    self.feed = feed;
    self.photos = Arc::new(Vec::new());
    self.pagination = Pagination::single(0);
    self.cached_at = None;
    self.load_initial();
  }

  fn snapshot(&self) -> Snapshot {
    Snapshot {
      freshness: self.freshness,
      photos: Arc::clone(&self.photos),
      pagination: self.pagination,
      cached_at: self.cached_at,
      load_more_failed: self.load_more_failed,
    }
  }

  fn transition(&mut self, state: GalleryState) {
    self.state = state.clone();
    // The presentation may have gone away; the session keeps working
    let _ = self.state_tx.send(state);
  }
}
