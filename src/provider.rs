//! The mail-provider seam the conversation handler depends on.

use std::future::Future;

use crate::models::{Mailbox, Message};
use crate::Result;

/// Operations the bot needs from a temporary-mail service.
///
/// [`crate::Client`] implements this against mail.tm; tests substitute an
/// in-memory fake.
pub trait MailProvider: Send + Sync {
    /// Return a domain new mailboxes can be registered under.
    fn fetch_domain(&self) -> impl Future<Output = Result<String>> + Send;

    /// Register a random mailbox under `domain` and authenticate it.
    ///
    /// `Ok(None)` means the provider declined to create the account.
    fn create_mailbox(&self, domain: &str) -> impl Future<Output = Result<Option<Mailbox>>> + Send;

    /// List the messages of the mailbox `auth_token` belongs to, in provider order.
    fn list_messages(&self, auth_token: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;
}
