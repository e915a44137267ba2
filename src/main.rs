use std::process::ExitCode;

use tracing::{error, info};

use tempmail_bot::telegram::{Bot, TelegramApi};
use tempmail_bot::{Client, Config, Handler, SessionStore};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    tempmail_bot::logging::init(&config.log_level);
    info!(?config, "TempMail Bot starting");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), error = %e, "bot stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> tempmail_bot::Result<()> {
    let client = Client::builder()
        .base_url(&config.mailtm_base_url)
        .timeout(config.http_timeout)
        .build()?;

    let api = TelegramApi::builder(&config.bot_token)
        .api_url(&config.telegram_api_url)
        .timeout(Bot::<Client>::request_timeout(config.poll_timeout))
        .build()?;

    let handler = Handler::new(client, SessionStore::new());
    Bot::new(api, handler, config.poll_timeout).run().await
}
