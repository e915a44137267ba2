//! User intents decoded from commands and button callbacks.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Something the user asked the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Show the main menu.
    Start,
    /// Register a new mailbox.
    GenerateEmail,
    /// List the messages of the current mailbox.
    CheckMessages,
    /// Show the current mailbox's credentials.
    ShowEmail,
    /// Show usage instructions.
    Help,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Start,
        Action::GenerateEmail,
        Action::CheckMessages,
        Action::ShowEmail,
        Action::Help,
    ];

    /// Callback data carried by buttons triggering this action.
    pub fn tag(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::GenerateEmail => "generate_email",
            Action::CheckMessages => "check_messages",
            Action::ShowEmail => "show_email",
            Action::Help => "help",
        }
    }

    /// Decode a slash command such as `/check` or `/check@SomeBot`.
    ///
    /// Returns `None` for plain text and unknown commands.
    pub fn from_command(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let command = word.strip_prefix('/')?;
        let command = command.split('@').next().unwrap_or(command);

        match command {
            "start" => Some(Action::Start),
            "newemail" => Some(Action::GenerateEmail),
            "check" => Some(Action::CheckMessages),
            "help" => Some(Action::Help),
            _ => None,
        }
    }

    /// Toast shown while a button press is being processed.
    pub fn progress_text(self) -> Option<&'static str> {
        match self {
            Action::GenerateEmail => Some("⏳ Generating new email address..."),
            Action::CheckMessages => Some("⏳ Checking messages..."),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned for callback data that names no action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown action tag `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.tag() == tag)
            .ok_or_else(|| UnknownAction(tag.to_string()))
    }
}
