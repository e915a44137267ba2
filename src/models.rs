//! Records exchanged with mail.tm.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Maximum number of preview characters shown per message.
pub const PREVIEW_LENGTH: usize = 100;

/// Maximum number of sender-name characters shown per message.
pub const SENDER_LENGTH: usize = 64;

/// Maximum number of subject characters shown per message.
pub const SUBJECT_LENGTH: usize = 128;

const RAW_DATE_LENGTH: usize = 32;

const UNKNOWN_SENDER: &str = "Unknown";
const NO_SUBJECT: &str = "No subject";
const NO_PREVIEW: &str = "No preview available";

/// A registered mail.tm account together with its bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Full email address (`local@domain`).
    pub address: String,
    /// Password the account was registered with.
    pub password: String,
    /// Bearer token authorizing message listing.
    pub auth_token: String,
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// A domain mail.tm accepts registrations for.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub domain: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Sender of a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A message as listed by the `/messages` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: Sender,
    #[serde(default)]
    pub subject: Option<String>,
    /// Short excerpt of the body.
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub has_attachments: bool,
    /// ISO-8601 timestamp of when the message was received.
    #[serde(default)]
    pub created_at: String,
}

/// Display projection of a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub sender_name: String,
    pub subject: String,
    pub received_at: Option<DateTime<FixedOffset>>,
    /// Timestamp as the provider sent it, used when it does not parse.
    pub received_raw: String,
    pub preview: String,
}

impl MessageSummary {
    pub fn from_message(message: &Message) -> Self {
        let sender_name = non_empty(message.from.name.as_deref()).unwrap_or(UNKNOWN_SENDER);
        let subject = non_empty(message.subject.as_deref()).unwrap_or(NO_SUBJECT);
        let intro = message.intro.as_deref().unwrap_or(NO_PREVIEW);

        Self {
            sender_name: truncate_preview(sender_name, SENDER_LENGTH),
            subject: truncate_preview(subject, SUBJECT_LENGTH),
            received_at: DateTime::parse_from_rfc3339(&message.created_at).ok(),
            received_raw: message.created_at.clone(),
            preview: truncate_preview(intro, PREVIEW_LENGTH),
        }
    }

    /// Receive time as `YYYY-MM-DD HH:MM` in the provider's offset.
    pub fn display_date(&self) -> String {
        match &self.received_at {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => truncate_preview(&self.received_raw, RAW_DATE_LENGTH),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Cut `text` to `max` characters, appending `...` only if something was cut.
pub fn truncate_preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Collection envelope. mail.tm answers with JSON-LD (`hydra:member`) or a
/// bare array depending on the `Accept` header.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Collection<T> {
    Hydra {
        #[serde(rename = "hydra:member")]
        members: Vec<T>,
    },
    Plain(Vec<T>),
}

impl<T> Collection<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Collection::Hydra { members } => members,
            Collection::Plain(items) => items,
        }
    }
}

/// Body of the `/accounts` and `/token` requests.
#[derive(Serialize)]
pub(crate) struct Credentials<'a> {
    pub address: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn summary_applies_placeholders() {
        let msg = message(json!({
            "id": "m1",
            "from": { "address": "a@b.c", "name": "" },
            "subject": null,
            "createdAt": "2024-03-05T10:07:00+00:00"
        }));
        let summary = MessageSummary::from_message(&msg);
        assert_eq!(summary.sender_name, "Unknown");
        assert_eq!(summary.subject, "No subject");
        assert_eq!(summary.preview, "No preview available");
        assert_eq!(summary.display_date(), "2024-03-05 10:07");
    }

    #[test]
    fn summary_keeps_offset_of_timestamp() {
        let msg = message(json!({
            "from": { "address": "a@b.c", "name": "Alice" },
            "subject": "Hi",
            "intro": "hello",
            "createdAt": "2024-03-05T23:30:00+02:00"
        }));
        let summary = MessageSummary::from_message(&msg);
        assert_eq!(summary.sender_name, "Alice");
        assert_eq!(summary.display_date(), "2024-03-05 23:30");
    }

    #[test]
    fn unparseable_timestamp_is_shown_raw() {
        let msg = message(json!({ "createdAt": "yesterday" }));
        assert_eq!(MessageSummary::from_message(&msg).display_date(), "yesterday");
    }

    #[test]
    fn long_sender_and_subject_are_capped() {
        let msg = message(json!({
            "from": { "address": "a@b.c", "name": "n".repeat(300) },
            "subject": "s".repeat(900),
            "createdAt": "x".repeat(500)
        }));
        let summary = MessageSummary::from_message(&msg);
        assert_eq!(summary.sender_name, format!("{}...", "n".repeat(SENDER_LENGTH)));
        assert_eq!(summary.subject, format!("{}...", "s".repeat(SUBJECT_LENGTH)));
        assert_eq!(summary.display_date().chars().count(), RAW_DATE_LENGTH + 3);
    }

    #[test]
    fn long_preview_is_cut_to_limit_plus_ellipsis() {
        let text = "x".repeat(150);
        let preview = truncate_preview(&text, PREVIEW_LENGTH);
        assert_eq!(preview, format!("{}...", "x".repeat(100)));
    }

    #[test]
    fn short_and_exact_previews_are_untouched() {
        assert_eq!(truncate_preview("short", PREVIEW_LENGTH), "short");
        let exact = "y".repeat(PREVIEW_LENGTH);
        assert_eq!(truncate_preview(&exact, PREVIEW_LENGTH), exact);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(101);
        let preview = truncate_preview(&text, PREVIEW_LENGTH);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.starts_with(&"é".repeat(100)));
    }

    #[test]
    fn collection_accepts_both_shapes() {
        let hydra: Collection<Domain> = serde_json::from_value(json!({
            "hydra:member": [{ "domain": "example.com", "isActive": true }],
            "hydra:totalItems": 1
        }))
        .unwrap();
        assert_eq!(hydra.into_vec()[0].domain, "example.com");

        let plain: Collection<Domain> =
            serde_json::from_value(json!([{ "domain": "example.org" }])).unwrap();
        let domains = plain.into_vec();
        assert_eq!(domains[0].domain, "example.org");
        assert!(domains[0].is_active);
    }

    #[test]
    fn mailbox_debug_redacts_secrets() {
        let mailbox = Mailbox {
            address: "abc@example.com".into(),
            password: "hunter2".into(),
            auth_token: "tok".into(),
        };
        let dbg = format!("{mailbox:?}");
        assert!(dbg.contains("abc@example.com"));
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("tok\""));
    }
}
