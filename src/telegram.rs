//! Telegram Bot API adapter.
//!
//! [`TelegramApi`] is a thin async client for the handful of Bot API methods
//! the bot needs. [`Bot`] long-polls for updates, decodes each into an
//! [`Action`], runs it through the [`Handler`] on its own task, and draws
//! the resulting [`Reply`]: commands answer with a new message, button
//! presses edit the message the button was attached to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::handler::Handler;
use crate::provider::MailProvider;
use crate::render::{self, Reply, Screen};
use crate::{Error, Result};

pub(crate) const API_URL: &str = "https://api.telegram.org";

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Extra time granted to HTTP requests on top of the long-poll timeout.
const POLL_SLACK: Duration = Duration::from_secs(10);

const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// One entry returned by `getUpdates`.
///
/// Only the update kinds the bot subscribes to are decoded; anything else
/// leaves both fields empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic id; the next poll starts after the highest one seen.
    pub update_id: i64,
    /// A new text message, e.g. a slash command.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// A press on an inline keyboard button.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message, as received or as the anchor of a button press.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Id within the chat, used to edit the message in place.
    pub message_id: i64,
    pub chat: Chat,
    /// Sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The chat a message lives in.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A Telegram account. Its id keys the session store.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct User {
    pub id: i64,
}

/// A button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Id to pass to `answerCallbackQuery`.
    pub id: String,
    pub from: User,
    /// Message the pressed button belongs to; absent when it is too old.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// The pressed button's action tag.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    show_alert: bool,
}

#[derive(Serialize)]
struct InlineKeyboard<'a> {
    inline_keyboard: Vec<[InlineButton<'a>; 1]>,
}

#[derive(Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'static str,
}

fn parse_mode(screen: &Screen) -> Option<&'static str> {
    screen.markdown.then_some("Markdown")
}

fn keyboard(screen: &Screen) -> Option<InlineKeyboard<'_>> {
    if screen.buttons.is_empty() {
        return None;
    }
    Some(InlineKeyboard {
        inline_keyboard: screen
            .buttons
            .iter()
            .map(|button| {
                [InlineButton {
                    text: button.label,
                    callback_data: button.action.tag(),
                }]
            })
            .collect(),
    })
}

/// Async client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramApi")
            .field("http", &"<reqwest::Client>")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramApi {
    pub fn builder(token: impl Into<String>) -> TelegramApiBuilder {
        TelegramApiBuilder::new(token)
    }

    /// Long-poll for updates after `offset`, waiting up to `timeout_secs`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout_secs,
                allowed_updates: ALLOWED_UPDATES,
            },
        )
        .await
    }

    /// Send `screen` as a new message.
    pub async fn send_screen(&self, chat_id: i64, screen: &Screen) -> Result<()> {
        self.call::<serde_json::Value, _>(
            "sendMessage",
            &SendMessage {
                chat_id,
                text: &screen.text,
                parse_mode: parse_mode(screen),
                reply_markup: keyboard(screen),
            },
        )
        .await?;
        Ok(())
    }

    /// Send plain text without buttons.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call::<serde_json::Value, _>(
            "sendMessage",
            &SendMessage {
                chat_id,
                text,
                parse_mode: None,
                reply_markup: None,
            },
        )
        .await?;
        Ok(())
    }

    /// Replace the text and buttons of an existing message with `screen`.
    ///
    /// Redrawing identical content is not an error.
    pub async fn edit_screen(&self, chat_id: i64, message_id: i64, screen: &Screen) -> Result<()> {
        let outcome = self
            .call::<serde_json::Value, _>(
                "editMessageText",
                &EditMessageText {
                    chat_id,
                    message_id,
                    text: &screen.text,
                    parse_mode: parse_mode(screen),
                    reply_markup: keyboard(screen),
                },
            )
            .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(Error::Telegram { msg }) if msg.contains("message is not modified") => {
                debug!(chat_id, message_id, "screen unchanged");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Acknowledge a button press, optionally with a toast or alert.
    pub async fn answer_callback(&self, query_id: &str, text: Option<&str>, alert: bool) -> Result<()> {
        self.call::<bool, _>(
            "answerCallbackQuery",
            &AnswerCallbackQuery {
                callback_query_id: query_id,
                text,
                show_alert: alert,
            },
        )
        .await?;
        Ok(())
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}/bot{}/{}", self.api_url.trim_end_matches('/'), self.token, method);

        // reqwest errors embed the URL, which carries the bot token.
        let transport = |err: reqwest::Error| Error::Telegram {
            msg: format!("{method}: {}", err.without_url()),
        };

        let response = self.http.post(&url).json(body).send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;

        let parsed: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|err| Error::Telegram {
            msg: format!("{method}: malformed response (HTTP {}): {err}", status.as_u16()),
        })?;

        if !parsed.ok {
            return Err(Error::Telegram {
                msg: format!(
                    "{method}: {}",
                    parsed
                        .description
                        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
                ),
            });
        }

        parsed.result.ok_or_else(|| Error::Telegram {
            msg: format!("{method}: response without result"),
        })
    }
}

/// Builder for [`TelegramApi`].
#[derive(Debug, Clone)]
pub struct TelegramApiBuilder {
    token: String,
    api_url: String,
    timeout: Option<Duration>,
    proxy: Option<String>,
}

impl TelegramApiBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: API_URL.to_string(),
            timeout: None,
            proxy: None,
        }
    }

    /// Override the Bot API server URL.
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Request timeout. Must exceed the long-poll timeout passed to
    /// [`TelegramApi::get_updates`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Route Bot API requests through an HTTP(S) proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn build(self) -> Result<TelegramApi> {
        let mut builder = reqwest::Client::builder();

        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(TelegramApi {
            http: builder.build()?,
            api_url: self.api_url,
            token: self.token,
        })
    }
}

/// Long-polling bot driving a [`Handler`].
pub struct Bot<P> {
    api: TelegramApi,
    handler: Arc<Handler<P>>,
    poll_timeout: Duration,
}

impl<P> Bot<P>
where
    P: MailProvider + 'static,
{
    pub fn new(api: TelegramApi, handler: Handler<P>, poll_timeout: Duration) -> Self {
        Self {
            api,
            handler: Arc::new(handler),
            poll_timeout,
        }
    }

    /// HTTP timeout a [`TelegramApi`] needs for the given long-poll timeout.
    pub fn request_timeout(poll_timeout: Duration) -> Duration {
        poll_timeout + POLL_SLACK
    }

    /// Poll and dispatch updates until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let mut offset = None;
        info!(poll_timeout = ?self.poll_timeout, "polling for updates");

        loop {
            let polled = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    return Ok(());
                }
                polled = self.api.get_updates(offset, self.poll_timeout.as_secs()) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.spawn(update);
                    }
                }
                Err(err) => {
                    warn!(kind = ?err.kind(), error = %err, "getUpdates failed");
                    tokio::time::sleep(POLL_ERROR_DELAY).await;
                }
            }
        }
    }

    fn spawn(&self, update: Update) {
        let api = self.api.clone();
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            let update_id = update.update_id;
            if let Err(err) = dispatch(&api, &handler, update).await {
                warn!(update_id, kind = ?err.kind(), error = %err, "failed to deliver reply");
            }
        });
    }
}

/// Handle one update end to end: decode, run the action, draw the reply.
pub async fn dispatch<P: MailProvider>(api: &TelegramApi, handler: &Handler<P>, update: Update) -> Result<()> {
    if let Some(query) = update.callback_query {
        return on_callback(api, handler, query).await;
    }
    if let Some(message) = update.message {
        return on_message(api, handler, message).await;
    }
    debug!(update_id = update.update_id, "ignoring update");
    Ok(())
}

async fn on_message<P: MailProvider>(api: &TelegramApi, handler: &Handler<P>, message: IncomingMessage) -> Result<()> {
    let Some(action) = message.text.as_deref().and_then(Action::from_command) else {
        debug!(chat_id = message.chat.id, "ignoring non-command message");
        return Ok(());
    };
    let user = message.from.map_or(message.chat.id, |from| from.id);
    debug!(user, %action, "command");

    match handler.handle(user, action).await {
        Reply::Screen(screen) => api.send_screen(message.chat.id, &screen).await,
        Reply::Notice(notice) => api.send_text(message.chat.id, notice.text).await,
    }
}

async fn on_callback<P: MailProvider>(api: &TelegramApi, handler: &Handler<P>, query: CallbackQuery) -> Result<()> {
    let action = match query.data.as_deref().map(str::parse::<Action>) {
        Some(Ok(action)) => action,
        Some(Err(err)) => {
            warn!(%err, "ignoring button press");
            return api.answer_callback(&query.id, None, false).await;
        }
        None => return api.answer_callback(&query.id, None, false).await,
    };
    let user = query.from.id;
    debug!(user, %action, "button press");

    if let Some(notice) = handler.precondition(user, action) {
        return api.answer_callback(&query.id, Some(notice.text), notice.alert).await;
    }
    if let Err(err) = api.answer_callback(&query.id, action.progress_text(), false).await {
        // Presses from before a restart are too old to answer but still redraw.
        warn!(user, %action, error = %err, "could not answer button press");
    }

    match handler.handle(user, action).await {
        Reply::Screen(screen) => {
            let (chat_id, drawn) = match &query.message {
                Some(message) => (
                    message.chat.id,
                    api.edit_screen(message.chat.id, message.message_id, &screen).await,
                ),
                None => (user, api.send_screen(user, &screen).await),
            };
            if let Err(err) = drawn {
                warn!(user, %action, kind = ?err.kind(), error = %err, "screen rejected, sending retry screen");
                return api.send_screen(chat_id, &render::delivery_failed(action)).await;
            }
            Ok(())
        }
        Reply::Notice(notice) => {
            // The callback is already answered; a concurrent update raced us.
            debug!(user, notice = notice.text, "notice after callback was answered");
            Ok(())
        }
    }
}
