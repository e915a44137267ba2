//! Screens the bot shows and the buttons that lead between them.
//!
//! Everything here is transport agnostic: a [`Screen`] is text plus an
//! ordered list of buttons, and the Telegram adapter decides how to draw it.

use crate::action::Action;
use crate::models::{Mailbox, Message, MessageSummary};

/// Most messages listed on one screen.
pub const MAX_LISTED_MESSAGES: usize = 5;

/// Longest message text Telegram accepts.
pub const MAX_TEXT_LENGTH: usize = 4096;

/// A button carrying the action it triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub action: Action,
}

impl Button {
    const fn new(label: &'static str, action: Action) -> Self {
        Self { label, action }
    }
}

const GENERATE: Button = Button::new("🔧 Generate New Email", Action::GenerateEmail);
const REGENERATE: Button = Button::new("🔄 Generate New Email", Action::GenerateEmail);
const CHECK: Button = Button::new("📨 Check Messages", Action::CheckMessages);
const HELP: Button = Button::new("ℹ️ Help", Action::Help);
const REFRESH: Button = Button::new("🔄 Refresh", Action::CheckMessages);
const CURRENT: Button = Button::new("📧 Current Email", Action::ShowEmail);
const BACK: Button = Button::new("🔙 Back to Main Menu", Action::Start);

/// A full screen: text and the buttons below it, one per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    /// Whether `text` uses Telegram's legacy Markdown.
    pub markdown: bool,
    pub buttons: Vec<Button>,
}

impl Screen {
    fn plain(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            buttons,
        }
    }

    fn markdown(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            buttons,
        }
    }

    /// Actions reachable from this screen, in button order.
    pub fn actions(&self) -> Vec<Action> {
        self.buttons.iter().map(|b| b.action).collect()
    }
}

/// A transient message that leaves the current screen in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub text: &'static str,
    /// Show as a modal alert rather than a toast.
    pub alert: bool,
}

/// What the conversation handler wants shown in response to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Screen(Screen),
    Notice(Notice),
}

pub const NEED_MAILBOX_TO_CHECK: Notice = Notice {
    text: "❌ Please generate an email first!",
    alert: true,
};

pub const NEED_MAILBOX_TO_SHOW: Notice = Notice {
    text: "❌ No email generated yet!",
    alert: true,
};

pub fn main_menu() -> Screen {
    Screen::plain(
        "👋 Welcome to TempMail Bot!\n\n\
         I can help you create temporary email addresses and manage incoming messages.\n\n\
         Choose an action from the menu below:",
        vec![GENERATE, CHECK, HELP],
    )
}

pub fn help() -> Screen {
    Screen::markdown(
        "📚 *How to use this bot:*\n\n\
         1. Generate a new temporary email address\n\
         2. Use this email address wherever you need\n\
         3. Check for incoming messages\n\
         4. Generate a new email address when needed\n\n\
         *Available commands:*\n\
         /start - Start the bot\n\
         /newemail - Generate new email\n\
         /check - Check messages\n\
         /help - Show this help message",
        vec![BACK],
    )
}

pub fn mailbox_created(mailbox: &Mailbox) -> Screen {
    Screen::markdown(
        format!(
            "✅ New email created successfully!\n\n\
             📧 Email: `{}`\n\
             🔑 Password: `{}`\n\n\
             _Click the button below to check messages_",
            mailbox.address, mailbox.password
        ),
        vec![CHECK, REGENERATE],
    )
}

pub fn current_mailbox(mailbox: &Mailbox) -> Screen {
    Screen::markdown(
        format!(
            "📧 Your current email:\n\n\
             Email: `{}`\n\
             Password: `{}`",
            mailbox.address, mailbox.password
        ),
        vec![CHECK, REGENERATE],
    )
}

/// Render the first [`MAX_LISTED_MESSAGES`] messages in the given order.
pub fn message_list(mailbox: &Mailbox, messages: &[Message]) -> Screen {
    if messages.is_empty() {
        return Screen::markdown(
            format!("📭 No messages yet!\n\nEmail: `{}`", mailbox.address),
            vec![REFRESH, CURRENT],
        );
    }

    let mut text = String::from("📬 Latest messages:\n\n");
    for message in messages.iter().take(MAX_LISTED_MESSAGES) {
        let summary = MessageSummary::from_message(message);
        text.push_str(&format!(
            "📩 From: {}\n📑 Subject: {}\n🕒 Date: {}\n💬 Preview: {}\n\n",
            escape_markdown(&summary.sender_name),
            escape_markdown(&summary.subject),
            escape_markdown(&summary.display_date()),
            escape_markdown(&summary.preview),
        ));
    }

    Screen::markdown(text, vec![REFRESH, CURRENT])
}

pub fn creation_failed() -> Screen {
    Screen::plain(
        "❌ Failed to create email address. Please try again.",
        vec![Button::new("🔄 Try Again", Action::GenerateEmail)],
    )
}

pub fn creation_error() -> Screen {
    Screen::plain(
        "❌ An error occurred. Please try again later.",
        vec![Button::new("🔄 Try Again", Action::GenerateEmail)],
    )
}

pub fn listing_error() -> Screen {
    Screen::plain(
        "❌ Error checking messages. Please try again.",
        vec![Button::new("🔄 Try Again", Action::CheckMessages)],
    )
}

/// Screen to fall back to when the result of `action` could not be shown.
pub fn delivery_failed(action: Action) -> Screen {
    match action {
        Action::GenerateEmail => creation_error(),
        Action::CheckMessages => listing_error(),
        Action::Start | Action::ShowEmail | Action::Help => main_menu(),
    }
}

/// Escape characters with meaning in Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
