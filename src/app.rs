use crate::cache::ResultStore;
use crate::commands::{self, Action, COMMANDS};
use crate::event::{Event, EventHandler};
use crate::flickr::{build_photo_url, Photo, PhotoSource};
use crate::gallery::{ErrorKind, Feed, Freshness, GalleryController, GalleryState, Snapshot};
use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// What the session shows first
#[derive(Debug, Clone)]
pub enum StartFeed {
  Recent,
  Search(String),
}

/// Line-oriented gallery session
pub struct App {
  controller: GalleryController,

  /// State transitions emitted by the controller
  states: mpsc::UnboundedReceiver<GalleryState>,

  /// Photo list printed last, to skip reprinting identical content
  last_rendered: Option<Arc<Vec<Photo>>>,

  /// Standard input is gone; finish outstanding loads, then stop
  input_closed: bool,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(source: Arc<dyn PhotoSource>, store: ResultStore) -> Self {
    let (controller, states) = GalleryController::new(source, store);

    Self {
      controller,
      states,
      last_rendered: None,
      input_closed: false,
      should_quit: false,
    }
  }

  pub async fn run(&mut self, start: StartFeed) -> Result<()> {
    let mut events = EventHandler::new();

    println!("photofeed - type 'help' for commands");

    match start {
      StartFeed::Recent => self.controller.load_initial(),
      StartFeed::Search(query) => {
        if let Err(e) = self.controller.search(&query) {
          println!("{}", e);
          self.controller.load_initial();
        }
      }
    }
    self.render_states();

    // Main loop
    while !self.should_quit {
      let busy = self.controller.is_busy();
      if self.input_closed && !busy {
        break;
      }

      tokio::select! {
        event = events.next(), if !self.input_closed => match event {
          Some(event) => self.handle_event(event),
          None => self.input_closed = true,
        },
        _ = self.controller.process_next(), if busy => {}
      }
      self.render_states();
    }

    info!("session finished");
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Input(line) => self.handle_line(&line),
      Event::Closed => self.input_closed = true,
    }
  }

  fn handle_line(&mut self, line: &str) {
    if line.trim().is_empty() {
      return;
    }

    let Some((command, argument)) = commands::parse(line) else {
      println!("Unknown command '{}'. Type 'help' for commands.", line.trim());
      return;
    };
    debug!(command = command.name, "command");

    match command.action {
      Action::More => {
        if !self.controller.load_more() {
          match self.controller.state() {
            GalleryState::Ready(snapshot) if !snapshot.pagination.has_more() => {
              println!("No more photos.")
            }
            GalleryState::Ready(_) => println!("Still loading, try again shortly."),
            _ => println!("Nothing to load more of right now."),
          }
        }
      }
      Action::Refresh => self.controller.refresh(),
      Action::Retry => {
        if !self.controller.retry() {
          println!("Nothing to retry.");
        }
      }
      Action::Search => {
        if let Err(e) = self.controller.search(argument) {
          println!("{}", e);
        }
      }
      Action::Recent => self.controller.show_recent(),
      Action::Clear => {
        self.controller.clear_cache();
        println!("Cache cleared.");
      }
      Action::Help => {
        for cmd in COMMANDS {
          println!("  {:<8} {}", cmd.name, cmd.description);
        }
      }
      Action::Quit => self.should_quit = true,
    }
  }

  fn render_states(&mut self) {
    while let Ok(state) = self.states.try_recv() {
      for line in self.render(&state) {
        println!("{}", line);
      }
    }
  }

  fn render(&mut self, state: &GalleryState) -> Vec<String> {
    match state {
      GalleryState::Idle => Vec::new(),
      GalleryState::Loading { .. } => match self.controller.feed() {
        Feed::Recent => vec!["Loading photos...".to_string()],
        Feed::Search(query) => vec![format!("Searching for '{}'...", query)],
      },
      GalleryState::LoadingMore { page, .. } => vec![format!("Loading page {}...", page)],
      GalleryState::Ready(snapshot) => self.render_snapshot(snapshot),
      GalleryState::Error { kind, message } => {
        let mut lines = vec![message.clone()];
        if *kind == ErrorKind::NoConnection {
          lines.push("Photos will be available offline after the first successful load.".to_string());
        }
        lines.push("Type 'retry' to try again.".to_string());
        lines
      }
    }
  }

  fn render_snapshot(&mut self, snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();

    if snapshot.freshness == Freshness::Offline {
      let when = snapshot
        .cached_at
        .map(|t| format!(" from {}", t.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();
      lines.push(format!("Offline - showing cached photos{}", when));
    }

    let unchanged = self
      .last_rendered
      .as_ref()
      .is_some_and(|last| Arc::ptr_eq(last, &snapshot.photos));

    if !unchanged {
      let start = self
        .last_rendered
        .as_ref()
        .filter(|last| is_prefix(last, &snapshot.photos))
        .map_or(0, |last| last.len());
      for (index, photo) in snapshot.photos.iter().enumerate().skip(start) {
        lines.push(format!("{:>4}. {}  {}", index + 1, photo.title, display_url(photo)));
      }
      self.last_rendered = Some(Arc::clone(&snapshot.photos));
    }

    let source = match snapshot.freshness {
      Freshness::Fresh => "live",
      Freshness::Cached => "cached",
      Freshness::Offline => "offline",
    };
    let stale = if snapshot.is_stale() { ", may be out of date" } else { "" };
    lines.push(format!(
      "[{}{}] {} photos, page {}/{} ({} total)",
      source,
      stale,
      snapshot.photos.len(),
      snapshot.pagination.page,
      snapshot.pagination.total_pages,
      snapshot.pagination.total
    ));

    if snapshot.load_more_failed {
      lines.push("Could not load more photos. Type 'retry' to try again.".to_string());
    }

    lines
  }
}

/// The image URL, built from the photo key when the API gave none.
fn display_url(photo: &Photo) -> String {
  photo
    .url
    .clone()
    .filter(|u| !u.is_empty())
    .unwrap_or_else(|| build_photo_url(photo))
}

/// Whether `current` only extends `previous`, so only the tail needs printing.
fn is_prefix(previous: &[Photo], current: &[Photo]) -> bool {
  previous.len() < current.len() && current[..previous.len()] == *previous
}
