mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod flickr;
mod gallery;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{KvStorage, NoopStorage, ResultStore, SqliteStorage};
use crate::config::CacheConfig;

/// Cache namespace of the recent feed
const RECENT_NAMESPACE: &str = "recent";

#[derive(Parser, Debug)]
#[command(name = "photofeed")]
#[command(about = "Browse recent Flickr photos, with an offline cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/photofeed/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Browse the recent photo feed (default)
  Browse,
  /// Start with a search
  Search {
    /// Free-text query
    #[arg(required = true)]
    query: Vec<String>,
  },
  /// Remove the cached recent feed
  ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let store = ResultStore::new(open_storage(&config.cache), RECENT_NAMESPACE);
  info!(namespace = store.namespace(), "result store ready");

  let start = match args.command.unwrap_or(Commands::Browse) {
    Commands::ClearCache => {
      store.clear();
      println!("Cache cleared.");
      return Ok(());
    }
    Commands::Browse => app::StartFeed::Recent,
    Commands::Search { query } => app::StartFeed::Search(query.join(" ")),
  };

  let client = flickr::FlickrClient::new(&config.flickr)?;

  // Initialize and run the session
  let mut app = app::App::new(Arc::new(client), store);
  app.run(start).await?;

  Ok(())
}

/// Open the cache database, or a no-op backend when caching is disabled or
/// the database cannot be opened.
fn open_storage(cache: &CacheConfig) -> Arc<dyn KvStorage> {
  if !cache.enabled {
    info!("cache disabled");
    return Arc::new(NoopStorage);
  }

  let path = match &cache.path {
    Some(path) => path.clone(),
    None => match config::data_dir() {
      Ok(dir) => dir.join("cache.db"),
      Err(e) => {
        warn!(error = %e, "no data directory, running without cache");
        return Arc::new(NoopStorage);
      }
    },
  };

  match SqliteStorage::open(&path) {
    Ok(storage) => {
      info!(path = %path.display(), "opened cache");
      Arc::new(storage)
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to open cache, running without it");
      Arc::new(NoopStorage)
    }
  }
}
