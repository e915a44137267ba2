//! TempMail Bot
//!
//! A Telegram bot that hands out disposable mail.tm addresses and shows
//! their inbox on request.
//!
//! The pieces, leaves first:
//! - [`credentials`] generates random local parts and passwords.
//! - [`Client`] talks to mail.tm and implements [`MailProvider`].
//! - [`SessionStore`] remembers each user's latest [`Mailbox`].
//! - [`Handler`] turns an [`Action`] into a [`Reply`].
//! - [`telegram`] drives the handler from the Telegram Bot API.
//!
//! # Example
//! ```no_run
//! use tempmail_bot::{Action, Client, Handler, Reply, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tempmail_bot::Error> {
//!     let handler = Handler::new(Client::new()?, SessionStore::new());
//!
//!     if let Reply::Screen(screen) = handler.handle(1, Action::GenerateEmail).await {
//!         println!("{}", screen.text);
//!     }
//!     Ok(())
//! }
//! ```

mod action;
mod client;
mod error;
mod handler;
mod models;
mod provider;
mod session;

pub mod config;
pub mod credentials;
pub mod logging;
pub mod render;
pub mod telegram;

pub use action::{Action, UnknownAction};
pub use client::{Client, ClientBuilder};
pub use config::Config;
pub use error::{Error, ErrorKind};
pub use handler::Handler;
pub use models::{Mailbox, Message, MessageSummary, Sender};
pub use provider::MailProvider;
pub use render::{Notice, Reply, Screen};
pub use session::{SessionStore, UserId};

/// Result type alias for bot operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
