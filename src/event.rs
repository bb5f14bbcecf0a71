use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Session input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// One line typed by the user
  Input(String),
  /// Standard input reached end of file
  Closed,
}

/// Event handler that produces events from standard input lines
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Start reading standard input in the background
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      let mut lines = BufReader::new(tokio::io::stdin()).lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            if tx.send(Event::Input(line)).is_err() {
              break;
            }
          }
          Ok(None) | Err(_) => {
            let _ = tx.send(Event::Closed);
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
