//! Per-user mailbox store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::Mailbox;

/// Identifier of the chat user a mailbox belongs to.
pub type UserId = i64;

/// Process-lifetime map from user to that user's latest mailbox.
///
/// Entries are never evicted; they are replaced when the user creates a new
/// mailbox and dropped with the process.
#[derive(Debug, Default)]
pub struct SessionStore {
    mailboxes: RwLock<HashMap<UserId, Mailbox>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `mailbox` for `user`, replacing any previous one.
    pub fn put(&self, user: UserId, mailbox: Mailbox) {
        let previous = self.mailboxes.write().insert(user, mailbox);
        if let Some(previous) = previous {
            tracing::debug!(user, superseded = %previous.address, "mailbox replaced");
        }
    }

    pub fn get(&self, user: UserId) -> Option<Mailbox> {
        self.mailboxes.read().get(&user).cloned()
    }

    pub fn len(&self) -> usize {
        self.mailboxes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(address: &str) -> Mailbox {
        Mailbox {
            address: address.to_string(),
            password: "pw".to_string(),
            auth_token: format!("token-{address}"),
        }
    }

    #[test]
    fn get_on_empty_store_is_absent() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn put_overwrites_previous_mailbox() {
        let store = SessionStore::new();
        store.put(1, mailbox("first@example.com"));
        store.put(1, mailbox("second@example.com"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1).unwrap().address, "second@example.com");
    }

    #[test]
    fn users_are_isolated() {
        let store = SessionStore::new();
        store.put(1, mailbox("one@example.com"));
        store.put(2, mailbox("two@example.com"));

        assert_eq!(store.get(1).unwrap().address, "one@example.com");
        assert_eq!(store.get(2).unwrap().address, "two@example.com");
        assert_eq!(store.get(3), None);
    }
}
