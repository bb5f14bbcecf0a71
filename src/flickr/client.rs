use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use tracing::{debug, warn};
use url::Url;

use crate::config::FlickrConfig;
use crate::error::FetchError;

use super::api_types::ApiResponse;
use super::types::PageResult;

const METHOD_RECENT: &str = "flickr.photos.getRecent";
const METHOD_SEARCH: &str = "flickr.photos.search";

/// Anything that can serve pages of photos. The gallery controller only
/// talks to this trait, never to HTTP directly.
#[async_trait]
pub trait PhotoSource: Send + Sync {
  /// Recency-ordered feed
  async fn fetch_recent(&self, page: u32) -> Result<PageResult, FetchError>;

  /// Relevance-ordered search. Empty queries fail with `FetchError::EmptyQuery`.
  async fn search(&self, query: &str, page: u32) -> Result<PageResult, FetchError>;
}

/// Flickr REST client
#[derive(Clone)]
pub struct FlickrClient {
  http: reqwest::Client,
  endpoint: Url,
  api_key: String,
  per_page: u32,
}

impl FlickrClient {
  pub fn new(config: &FlickrConfig) -> Result<Self> {
    let api_key = config.resolve_api_key()?;

    let endpoint = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid Flickr base URL {}: {}", config.base_url, e))?;

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      api_key,
      per_page: config.per_page,
    })
  }

  fn method_url(&self, method: &str, page: u32, extra: &[(&str, &str)]) -> Url {
    let mut url = self.endpoint.clone();
    {
      let mut pairs = url.query_pairs_mut();
      pairs
        .append_pair("method", method)
        .append_pair("api_key", &self.api_key)
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &self.per_page.to_string())
        .append_pair("format", "json")
        .append_pair("nojsoncallback", "1")
        .append_pair("extras", "url_s");
      for (key, value) in extra {
        pairs.append_pair(key, value);
      }
    }
    url
  }

  /// Issue one request and normalize the payload.
  async fn query(
    &self,
    method: &str,
    page: u32,
    extra: &[(&str, &str)],
  ) -> Result<PageResult, FetchError> {
    // The URL carries the API key, so only the method is logged
    debug!(method, page, "requesting photos");

    let response = self
      .http
      .get(self.method_url(method, page, extra))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      warn!(method, page, status = status.as_u16(), "Flickr returned HTTP error");
      return Err(FetchError::Status(status.as_u16()));
    }

    let body: ApiResponse = response.json().await?;

    if body.stat != "ok" {
      let err = FetchError::Api {
        code: body.code.unwrap_or_default(),
        message: body
          .message
          .unwrap_or_else(|| "Flickr API returned an error".to_string()),
      };
      warn!(method, page, error = %err, "Flickr rejected request");
      return Err(err);
    }

    let photos = body
      .photos
      .ok_or_else(|| FetchError::Decode("response has no photos object".to_string()))?;

    let result = PageResult::from(photos);
    debug!(
      method,
      page = result.page,
      total_pages = result.total_pages,
      count = result.photos.len(),
      "received photos"
    );
    Ok(result)
  }
}

#[async_trait]
impl PhotoSource for FlickrClient {
  async fn fetch_recent(&self, page: u32) -> Result<PageResult, FetchError> {
    self.query(METHOD_RECENT, page, &[]).await
  }

  async fn search(&self, query: &str, page: u32) -> Result<PageResult, FetchError> {
    let text = query.trim();
    if text.is_empty() {
      return Err(FetchError::EmptyQuery);
    }
    self.query(METHOD_SEARCH, page, &[("text", text)]).await
  }
}
