//! Conversation handler: turns an [`Action`] from a user into a [`Reply`].
//!
//! Every provider or store failure is caught here, logged with its
//! [`ErrorKind`](crate::ErrorKind), and turned into a screen offering a
//! retry. Nothing propagates past [`Handler::handle`].

use tracing::{error, info, warn};

use crate::action::Action;
use crate::models::Mailbox;
use crate::provider::MailProvider;
use crate::render::{self, Notice, Reply};
use crate::session::{SessionStore, UserId};
use crate::{Error, Result};

/// Dispatches user actions against a mail provider and a session store.
#[derive(Debug)]
pub struct Handler<P> {
    provider: P,
    sessions: SessionStore,
}

impl<P: MailProvider> Handler<P> {
    pub fn new(provider: P, sessions: SessionStore) -> Self {
        Self { provider, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Notice to show instead of running `action`, if `user` lacks a mailbox
    /// the action requires. Never touches the provider.
    pub fn precondition(&self, user: UserId, action: Action) -> Option<Notice> {
        let notice = match action {
            Action::CheckMessages => render::NEED_MAILBOX_TO_CHECK,
            Action::ShowEmail => render::NEED_MAILBOX_TO_SHOW,
            _ => return None,
        };
        self.mailbox_for(user).err().map(|_| notice)
    }

    /// Handle `action` on behalf of `user`.
    pub async fn handle(&self, user: UserId, action: Action) -> Reply {
        match action {
            Action::Start => Reply::Screen(render::main_menu()),
            Action::Help => Reply::Screen(render::help()),
            Action::GenerateEmail => self.generate_email(user).await,
            Action::CheckMessages => self.check_messages(user).await,
            Action::ShowEmail => self.show_email(user),
        }
    }

    async fn generate_email(&self, user: UserId) -> Reply {
        match self.register().await {
            Ok(Some(mailbox)) => {
                info!(user, address = %mailbox.address, "mailbox created");
                let screen = render::mailbox_created(&mailbox);
                self.sessions.put(user, mailbox);
                Reply::Screen(screen)
            }
            Ok(None) => {
                warn!(user, "mailbox was not created");
                Reply::Screen(render::creation_failed())
            }
            Err(err) => {
                error!(user, kind = ?err.kind(), error = %err, "error generating email");
                Reply::Screen(render::creation_error())
            }
        }
    }

    async fn register(&self) -> Result<Option<Mailbox>> {
        let domain = self.provider.fetch_domain().await?;
        self.provider.create_mailbox(&domain).await
    }

    async fn check_messages(&self, user: UserId) -> Reply {
        let mailbox = match self.mailbox_for(user) {
            Ok(mailbox) => mailbox,
            Err(err) => {
                info!(user, kind = ?err.kind(), "check requested without mailbox");
                return Reply::Notice(render::NEED_MAILBOX_TO_CHECK);
            }
        };

        match self.provider.list_messages(&mailbox.auth_token).await {
            Ok(messages) => {
                info!(user, count = messages.len(), "messages listed");
                Reply::Screen(render::message_list(&mailbox, &messages))
            }
            Err(err) => {
                error!(user, kind = ?err.kind(), error = %err, "error checking messages");
                Reply::Screen(render::listing_error())
            }
        }
    }

    fn show_email(&self, user: UserId) -> Reply {
        match self.mailbox_for(user) {
            Ok(mailbox) => Reply::Screen(render::current_mailbox(&mailbox)),
            Err(err) => {
                info!(user, kind = ?err.kind(), "show requested without mailbox");
                Reply::Notice(render::NEED_MAILBOX_TO_SHOW)
            }
        }
    }

    fn mailbox_for(&self, user: UserId) -> Result<Mailbox> {
        self.sessions.get(user).ok_or(Error::NotFound(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::render::{NEED_MAILBOX_TO_CHECK, NEED_MAILBOX_TO_SHOW, Screen};
    use crate::{Client, credentials};
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory provider with scripted outcomes.
    #[derive(Default)]
    struct FakeProvider {
        domain: Option<String>,
        decline: bool,
        inbox: Mutex<Option<Result<Vec<Message>>>>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn with_domain(domain: &str) -> Self {
            Self {
                domain: Some(domain.to_string()),
                ..Self::default()
            }
        }

        fn with_inbox(self, inbox: Result<Vec<Message>>) -> Self {
            *self.inbox.lock() = Some(inbox);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MailProvider for FakeProvider {
        async fn fetch_domain(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.domain
                .clone()
                .ok_or_else(|| Error::provider("no domains available"))
        }

        async fn create_mailbox(&self, domain: &str) -> Result<Option<Mailbox>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.decline {
                return Ok(None);
            }
            Ok(Some(Mailbox {
                address: format!("{}@{}", credentials::generate_local_part(), domain),
                password: credentials::generate_password(12),
                auth_token: "jwt".to_string(),
            }))
        }

        async fn list_messages(&self, auth_token: &str) -> Result<Vec<Message>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(auth_token, "jwt");
            match self.inbox.lock().take() {
                Some(inbox) => inbox,
                None => Ok(Vec::new()),
            }
        }
    }

    fn screen(reply: Reply) -> Screen {
        match reply {
            Reply::Screen(screen) => screen,
            Reply::Notice(notice) => panic!("expected a screen, got notice {notice:?}"),
        }
    }

    #[tokio::test]
    async fn start_and_help_are_pure_navigation() {
        let handler = Handler::new(FakeProvider::default(), SessionStore::new());

        assert_eq!(
            screen(handler.handle(1, Action::Start).await),
            render::main_menu()
        );
        assert_eq!(screen(handler.handle(1, Action::Help).await), render::help());
        assert_eq!(handler.provider.calls(), 0);
    }

    #[tokio::test]
    async fn generate_stores_mailbox_for_user() {
        let handler = Handler::new(FakeProvider::with_domain("example.com"), SessionStore::new());

        let shown = screen(handler.handle(7, Action::GenerateEmail).await);

        let stored = handler.sessions().get(7).expect("mailbox stored");
        assert!(stored.address.ends_with("@example.com"));
        assert_eq!(shown, render::mailbox_created(&stored));
        assert_eq!(handler.sessions().get(8), None);
    }

    #[tokio::test]
    async fn generating_twice_keeps_only_second_mailbox() {
        let handler = Handler::new(FakeProvider::with_domain("example.com"), SessionStore::new());

        handler.handle(7, Action::GenerateEmail).await;
        let first = handler.sessions().get(7).unwrap();
        handler.handle(7, Action::GenerateEmail).await;
        let second = handler.sessions().get(7).unwrap();

        assert_ne!(first.address, second.address);
        assert_eq!(handler.sessions().len(), 1);
    }

    #[tokio::test]
    async fn declined_creation_shows_failure_and_stores_nothing() {
        let provider = FakeProvider {
            decline: true,
            ..FakeProvider::with_domain("example.com")
        };
        let handler = Handler::new(provider, SessionStore::new());

        let shown = screen(handler.handle(7, Action::GenerateEmail).await);

        assert_eq!(shown, render::creation_failed());
        assert!(handler.sessions().is_empty());
    }

    #[tokio::test]
    async fn provider_error_during_creation_shows_error_screen() {
        let handler = Handler::new(FakeProvider::default(), SessionStore::new());

        let shown = screen(handler.handle(7, Action::GenerateEmail).await);

        assert_eq!(shown, render::creation_error());
        assert_eq!(shown.actions(), [Action::GenerateEmail]);
    }

    #[tokio::test]
    async fn check_without_mailbox_never_calls_provider() {
        let handler = Handler::new(FakeProvider::with_domain("example.com"), SessionStore::new());

        let reply = handler.handle(7, Action::CheckMessages).await;

        assert_eq!(reply, Reply::Notice(NEED_MAILBOX_TO_CHECK));
        assert_eq!(handler.provider.calls(), 0);
    }

    #[tokio::test]
    async fn show_without_mailbox_is_a_notice() {
        let handler = Handler::new(FakeProvider::default(), SessionStore::new());
        assert_eq!(
            handler.handle(7, Action::ShowEmail).await,
            Reply::Notice(NEED_MAILBOX_TO_SHOW)
        );
    }

    #[tokio::test]
    async fn precondition_tracks_stored_mailbox() {
        let handler = Handler::new(FakeProvider::with_domain("example.com"), SessionStore::new());

        assert_eq!(
            handler.precondition(7, Action::CheckMessages),
            Some(NEED_MAILBOX_TO_CHECK)
        );
        assert_eq!(
            handler.precondition(7, Action::ShowEmail),
            Some(NEED_MAILBOX_TO_SHOW)
        );
        assert_eq!(handler.precondition(7, Action::GenerateEmail), None);

        handler.handle(7, Action::GenerateEmail).await;
        assert_eq!(handler.precondition(7, Action::CheckMessages), None);
        assert_eq!(handler.precondition(7, Action::ShowEmail), None);
        assert_eq!(handler.provider.calls(), 2);
    }

    #[tokio::test]
    async fn show_displays_stored_mailbox() {
        let handler = Handler::new(FakeProvider::with_domain("example.com"), SessionStore::new());
        handler.handle(7, Action::GenerateEmail).await;
        let stored = handler.sessions().get(7).unwrap();

        let shown = screen(handler.handle(7, Action::ShowEmail).await);
        assert_eq!(shown, render::current_mailbox(&stored));
    }

    #[tokio::test]
    async fn expired_token_shows_listing_error() {
        let provider =
            FakeProvider::with_domain("example.com").with_inbox(Err(Error::AuthExpired));
        let handler = Handler::new(provider, SessionStore::new());
        handler.handle(7, Action::GenerateEmail).await;

        let shown = screen(handler.handle(7, Action::CheckMessages).await);
        assert_eq!(shown, render::listing_error());
    }

    #[tokio::test]
    async fn start_generate_check_against_mail_tm() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/domains");
            then.status(200).json_body(json!({
                "hydra:member": [{ "domain": "example.com", "isActive": true }]
            }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/accounts");
            then.status(201).json_body(json!({ "id": "acc-1" }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).json_body(json!({ "token": "jwt-e2e" }));
        });
        let inbox = server.mock(|when, then| {
            when.method(GET)
                .path("/messages")
                .header("Authorization", "Bearer jwt-e2e");
            then.status(200).json_body(json!({ "hydra:member": [] }));
        });

        let client = Client::builder().base_url(server.base_url()).build().unwrap();
        let handler = Handler::new(client, SessionStore::new());

        let menu = screen(handler.handle(99, Action::Start).await);
        assert_eq!(menu, render::main_menu());

        let created = screen(handler.handle(99, Action::GenerateEmail).await);
        let mailbox = handler.sessions().get(99).unwrap();
        assert!(mailbox.address.ends_with("@example.com"));
        assert!(created.text.contains(&mailbox.address));

        let listed = screen(handler.handle(99, Action::CheckMessages).await);
        assert!(listed.text.starts_with("📭 No messages yet!"));
        assert_eq!(listed.actions(), [Action::CheckMessages, Action::ShowEmail]);
        inbox.assert();
    }
}
