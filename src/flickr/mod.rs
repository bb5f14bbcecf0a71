//! Flickr REST access and the photo domain types.

pub mod api_types;
pub mod client;
pub mod types;

pub use client::{FlickrClient, PhotoSource};
pub use types::{build_photo_url, PageResult, Photo};
