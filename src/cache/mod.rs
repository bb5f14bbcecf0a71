//! Local cache for the first page of the recent feed.
//!
//! This module provides:
//! - A content fingerprint for change detection
//! - A string-keyed storage seam with SQLite and no-op backends
//! - A namespaced result store that never fails its caller

mod fingerprint;
mod storage;
mod store;

pub use fingerprint::fingerprint;
pub use storage::{KvStorage, NoopStorage, SqliteStorage};
pub use store::{CacheRecord, ResultStore};
