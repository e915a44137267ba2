//! Error types for the temp-mail bot.

use thiserror::Error;

use crate::session::UserId;

/// Errors that can occur while talking to mail.tm or Telegram.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The mail provider answered with an unexpected status or body.
    #[error("mail provider unavailable: {msg}")]
    ProviderUnavailable { msg: String },

    /// The mail provider rejected a previously issued bearer token.
    #[error("mail provider rejected the bearer token")]
    AuthExpired,

    /// No mailbox is stored for the user.
    #[error("no mailbox stored for user {0}")]
    NotFound(UserId),

    /// The Telegram Bot API reported a failure.
    #[error("Telegram API error: {msg}")]
    Telegram { msg: String },

    /// Invalid or missing configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`], used for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderUnavailable,
    AuthExpired,
    NotFound,
    Transport,
    Config,
}

impl Error {
    /// Classify the error.
    ///
    /// Raw HTTP and JSON failures only ever surface from provider calls;
    /// the Telegram adapter wraps its own failures in [`Error::Telegram`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request(_) | Error::Json(_) | Error::ProviderUnavailable { .. } => {
                ErrorKind::ProviderUnavailable
            }
            Error::AuthExpired => ErrorKind::AuthExpired,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Telegram { .. } => ErrorKind::Transport,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn provider(msg: impl Into<String>) -> Self {
        Error::ProviderUnavailable { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            Error::provider("HTTP 502").kind(),
            ErrorKind::ProviderUnavailable
        );
        assert_eq!(Error::AuthExpired.kind(), ErrorKind::AuthExpired);
        assert_eq!(Error::NotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Telegram {
                msg: "Unauthorized".into()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn json_errors_count_as_provider_failures() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.to_string().starts_with("JSON parsing error"));
    }

    #[test]
    fn not_found_display_names_user() {
        assert_eq!(
            Error::NotFound(42).to_string(),
            "no mailbox stored for user 42"
        );
    }
}
