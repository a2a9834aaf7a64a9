use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::notify::Notifier;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel. Messages go to a single chat with link
/// previews suppressed.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        TelegramNotifier {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point the notifier at a different API host (mock servers in tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Validates the bot token against `getMe` and the destination against
    /// `getChat`. Called once at startup so a bad credential or chat id
    /// fails the process before the first poll cycle.
    pub async fn connect(&self) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await?;
        Self::check_response(response).await?;

        let response = self
            .client
            .post(self.method_url("getChat"))
            .json(&json!({ "chat_id": self.chat_id }))
            .send()
            .await?;
        Self::check_response(response).await?;

        debug!("telegram bot token and chat accepted");
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn check_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({ "ok": false, "description": "unreadable response" }));

        if status.is_success() && body["ok"].as_bool() == Some(true) {
            return Ok(());
        }

        let description = body["description"].as_str().unwrap_or("unknown error");
        Err(AppError::Notify(format!(
            "telegram API returned {status}: {description}"
        )))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        Self::check_response(response).await
    }
}
