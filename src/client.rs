//! mail.tm async client implementation.
//!
//! This module provides an async [`Client`] and [`ClientBuilder`] for the
//! mail.tm temporary email service.
//!
//! Typical flow:
//! 1) Build a client (`Client::new` or `Client::builder().build()`)
//! 2) Pick a domain via [`Client::fetch_domain`]
//! 3) Register a random mailbox via [`Client::create_mailbox`]
//! 4) Poll the inbox via [`Client::list_messages`] with the mailbox token

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, trace, warn};

use crate::credentials::{DEFAULT_PASSWORD_LENGTH, generate_local_part, generate_password};
use crate::models::{Collection, Credentials, Domain, Mailbox, Message, TokenResponse};
use crate::provider::MailProvider;
use crate::{Error, Result};

/// Async client for the mail.tm temporary email service.
///
/// Cloning is cheap; the underlying `reqwest` connection pool is shared.
/// The client itself is stateless: every mailbox-scoped call takes the
/// mailbox's bearer token as an argument.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    proxy: Option<String>,
    user_agent: String,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("http", &"<reqwest::Client>")
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Client {
    /// Create a [`ClientBuilder`] for configuring a new client.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_bot::Client;
    /// # fn main() -> Result<(), tempmail_bot::Error> {
    /// let client = Client::builder()
    ///     .user_agent("my-app/1.0")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client for the public mail.tm API with default settings.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the proxy URL configured for this client (if any).
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Fetch the first active domain mail.tm accepts registrations for.
    ///
    /// # Errors
    /// Returns [`Error::ProviderUnavailable`] if the request fails, the
    /// response is malformed, or no domain is listed.
    pub async fn fetch_domain(&self) -> Result<String> {
        let (status, body) = self.execute_request(ApiMethod::Get, DOMAINS_PATH, None, None).await?;
        Self::ensure_success(status, DOMAINS_PATH, &body)?;

        let domains: Collection<Domain> = serde_json::from_slice(&body)?;
        domains
            .into_vec()
            .into_iter()
            .find(|d| d.is_active)
            .map(|d| d.domain)
            .ok_or_else(|| Error::provider("no domains available"))
    }

    /// Register a random mailbox under `domain` and obtain its bearer token.
    ///
    /// The local part and password are generated locally. If mail.tm does not
    /// acknowledge the account (for example because the address is taken),
    /// `Ok(None)` is returned and no token is requested.
    ///
    /// # Errors
    /// Returns an error if either request fails at the transport level, or if
    /// the token request is rejected after a successful registration.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_bot::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), tempmail_bot::Error> {
    /// let client = Client::new()?;
    /// let domain = client.fetch_domain().await?;
    /// if let Some(mailbox) = client.create_mailbox(&domain).await? {
    ///     println!("{}", mailbox.address);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_mailbox(&self, domain: &str) -> Result<Option<Mailbox>> {
        let address = format!("{}@{}", generate_local_part(), domain);
        let password = generate_password(DEFAULT_PASSWORD_LENGTH);
        let credentials = Credentials {
            address: &address,
            password: &password,
        };

        let (status, body) = self
            .execute_request(ApiMethod::Post, ACCOUNTS_PATH, Some(&credentials), None)
            .await?;
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                %address,
                body = %Self::body_snippet(&body),
                "mail.tm declined account creation"
            );
            return Ok(None);
        }

        let auth_token = self.request_token(&credentials).await?;
        debug!(%address, "mailbox registered");

        Ok(Some(Mailbox {
            address,
            password,
            auth_token,
        }))
    }

    /// List the messages of the mailbox the token belongs to.
    ///
    /// Messages are returned in the order mail.tm lists them (newest first).
    ///
    /// # Errors
    /// Returns [`Error::AuthExpired`] when mail.tm rejects the token and
    /// [`Error::ProviderUnavailable`] for any other failure.
    pub async fn list_messages(&self, auth_token: &str) -> Result<Vec<Message>> {
        let (status, body) = self
            .execute_request(ApiMethod::Get, MESSAGES_PATH, None, Some(auth_token))
            .await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::AuthExpired);
        }
        Self::ensure_success(status, MESSAGES_PATH, &body)?;

        let messages: Collection<Message> = serde_json::from_slice(&body)?;
        Ok(messages.into_vec())
    }

    async fn request_token(&self, credentials: &Credentials<'_>) -> Result<String> {
        let (status, body) = self
            .execute_request(ApiMethod::Post, TOKEN_PATH, Some(credentials), None)
            .await?;
        Self::ensure_success(status, TOKEN_PATH, &body)?;

        let token: TokenResponse = serde_json::from_slice(&body)?;
        Ok(token.token)
    }

    async fn execute_request(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<&Credentials<'_>>,
        bearer: Option<&str>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let url = self.endpoint(path);
        debug!(?method, %url, "mail.tm request");

        let mut request = match method {
            ApiMethod::Get => self.http.get(&url),
            ApiMethod::Post => self.http.post(&url),
        }
        .headers(self.headers());

        if let Some(credentials) = body {
            request = request.json(credentials);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(
                status = status.as_u16(),
                %url,
                body = %redact_secrets(&String::from_utf8_lossy(&body)),
                "mail.tm response"
            );
        }

        Ok((status, body.to_vec()))
    }

    fn ensure_success(status: StatusCode, path: &str, body: &[u8]) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        Err(Error::provider(format!(
            "HTTP {} for {} (body snippet: {})",
            status.as_u16(),
            path,
            Self::body_snippet(body)
        )))
    }

    fn body_snippet(body: &[u8]) -> String {
        redact_secrets(&String::from_utf8_lossy(body))
            .chars()
            .take(200)
            .collect()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/ld+json, application/json;q=0.9"),
        );

        headers
    }
}

impl MailProvider for Client {
    async fn fetch_domain(&self) -> Result<String> {
        Client::fetch_domain(self).await
    }

    async fn create_mailbox(&self, domain: &str) -> Result<Option<Mailbox>> {
        Client::create_mailbox(self, domain).await
    }

    async fn list_messages(&self, auth_token: &str) -> Result<Vec<Message>> {
        Client::list_messages(self, auth_token).await
    }
}

static SECRET_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r#"(?i)("token"\s*:\s*")[^"]*(")"#,
        r#"(?i)("password"\s*:\s*")[^"]*(")"#,
        r#"(?i)(Bearer\s+)[A-Za-z0-9._~+/=-]+"#,
    ]
    .map(|pattern| Regex::new(pattern).expect("secret pattern is valid"))
});

/// Mask bearer tokens and passwords in a response or request body.
pub(crate) fn redact_secrets(raw: &str) -> String {
    let mut redacted = raw.to_string();
    for re in SECRET_PATTERNS.iter() {
        let masked = re.replace_all(&redacted, |caps: &regex::Captures<'_>| {
            if caps.len() >= 3 {
                format!("{}<redacted>{}", &caps[1], &caps[2])
            } else {
                format!("{}<redacted>", &caps[1])
            }
        });
        redacted = masked.into_owned();
    }
    redacted
}

pub(crate) const BASE_URL: &str = "https://api.mail.tm";
const DOMAINS_PATH: &str = "/domains";
const ACCOUNTS_PATH: &str = "/accounts";
const TOKEN_PATH: &str = "/token";
const MESSAGES_PATH: &str = "/messages";
const USER_AGENT_VALUE: &str = concat!("tempmail-bot/", env!("CARGO_PKG_VERSION"));

/// Builder for configuring a mail.tm [`Client`].
///
/// # Defaults
/// - No proxy
/// - `tempmail-bot/<version>` user agent
/// - The public mail.tm API base URL
/// - Reqwest default timeout
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    proxy: Option<String>,
    user_agent: String,
    base_url: String,
    timeout: Option<Duration>,
}

#[derive(Copy, Clone, Debug)]
enum ApiMethod {
    Get,
    Post,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            proxy: None,
            user_agent: USER_AGENT_VALUE.to_string(),
            base_url: BASE_URL.to_string(),
            timeout: None,
        }
    }

    /// Set a proxy URL (e.g. `"http://127.0.0.1:8080"`).
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the mail.tm base URL.
    ///
    /// This is primarily useful for testing.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set a request timeout applied to all operations.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`Client`].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed (e.g. an
    /// invalid proxy URL).
    pub fn build(self) -> Result<Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Client {
            http: builder.build()?,
            proxy: self.proxy,
            user_agent: self.user_agent,
            base_url: self.base_url,
        })
    }
}
