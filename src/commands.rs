/// Available session commands and lookup logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  More,
  Refresh,
  Retry,
  Search,
  Recent,
  Clear,
  Help,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: Action,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "more",
    aliases: &["m", "next", "n"],
    description: "Load the next page",
    action: Action::More,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload the first page",
    action: Action::Refresh,
  },
  Command {
    name: "retry",
    aliases: &["again"],
    description: "Retry the last failed request",
    action: Action::Retry,
  },
  Command {
    name: "search",
    aliases: &["s", "find", "/"],
    description: "Search photos: search <text>",
    action: Action::Search,
  },
  Command {
    name: "recent",
    aliases: &["home", "h"],
    description: "Show recent photos",
    action: Action::Recent,
  },
  Command {
    name: "clear",
    aliases: &["clear-cache"],
    description: "Clear the offline cache",
    action: Action::Clear,
  },
  Command {
    name: "help",
    aliases: &["?"],
    description: "List commands",
    action: Action::Help,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit photofeed",
    action: Action::Quit,
  },
];

/// How well `word` names `cmd`; lower is better, `None` is no match.
fn match_rank(cmd: &Command, word: &str) -> Option<u8> {
  if cmd.name == word {
    Some(0)
  } else if cmd.aliases.contains(&word) {
    Some(1)
  } else if cmd.name.starts_with(word) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(word)) {
    Some(3)
  } else {
    None
  }
}

/// Split an input line into its best matching command and the argument text.
///
/// Ties go to the command listed first in [`COMMANDS`].
pub fn parse(line: &str) -> Option<(&'static Command, &str)> {
  let line = line.trim();
  let (word, rest) = match line.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (line, ""),
  };

  if word.is_empty() {
    return None;
  }

  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &word).map(|rank| (rank, cmd)))
    .min_by_key(|(rank, _)| *rank)
    .map(|(_, cmd)| (cmd, rest))
}
