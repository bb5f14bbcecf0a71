//! Gallery session: cache-first loading, change detection and pagination.

mod controller;
mod state;

pub use controller::GalleryController;
pub use state::{ErrorKind, Feed, Freshness, GalleryState, Snapshot};
