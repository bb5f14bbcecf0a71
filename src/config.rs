use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.flickr.com/services/rest/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub flickr: FlickrConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlickrConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Falls back to PHOTOFEED_API_KEY / FLICKR_API_KEY when unset
  pub api_key: Option<String>,
  #[serde(default = "default_per_page")]
  pub per_page: u32,
  /// Request timeout. Unset means the transport default.
  pub timeout_secs: Option<u64>,
}

impl Default for FlickrConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      api_key: None,
      per_page: default_per_page(),
      timeout_secs: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_per_page() -> u32 {
  20
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false the recent feed is never persisted
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Database file (default: $XDG_DATA_HOME/photofeed/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log directory (default: $XDG_DATA_HOME/photofeed/logs)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./photofeed.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/photofeed/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("photofeed.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("photofeed").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }
}

/// Application data directory, shared by the cache database and the logs.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("photofeed"))
}

impl FlickrConfig {
  /// The API key from config, or from PHOTOFEED_API_KEY then FLICKR_API_KEY.
  pub fn resolve_api_key(&self) -> Result<String> {
    if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
      return Ok(key.clone());
    }

    std::env::var("PHOTOFEED_API_KEY")
      .or_else(|_| std::env::var("FLICKR_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Flickr API key not found. Set flickr.api_key in the config file or the \
           PHOTOFEED_API_KEY / FLICKR_API_KEY environment variable."
        )
      })
  }
}
