//! One-time-code delivery over the Telegram Bot API.

use std::time::Duration;

use serde::Serialize;

use crate::domain::repository::MessagePort;
use crate::error::AuthServiceError;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramMessenger {
    client: reqwest::Client,
    /// Absent in local setups without a bot; every send then fails as
    /// upstream-unavailable and issuance falls back to undelivered.
    bot_token: Option<String>,
    api_base: String,
}

impl TelegramMessenger {
    pub fn new(bot_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_default(),
            bot_token,
            api_base: "https://api.telegram.org".to_owned(),
        }
    }
}

impl MessagePort for TelegramMessenger {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), AuthServiceError> {
        let Some(token) = self.bot_token.as_deref() else {
            return Err(AuthServiceError::UpstreamUnavailable);
        };
        // Identifiers are stored as "telegram_<chat id>"; the API wants the
        // bare chat id.
        let chat_id = recipient.strip_prefix("telegram_").unwrap_or(recipient);
        let url = format!("{}/bot{token}/sendMessage", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageBody { chat_id, text })
            .send()
            .await
            .map_err(|_| AuthServiceError::UpstreamUnavailable)?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "telegram sendMessage rejected");
            return Err(AuthServiceError::UpstreamUnavailable);
        }
        Ok(())
    }
}
