use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{clamp_chars, Publisher};

const TELEGRAM_API: &str = "https://api.telegram.org";
// sendMessage text limit
const TELEGRAM_TEXT_MAX: usize = 4096;

pub struct TelegramPublisher {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramPublisher {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            api_base: TELEGRAM_API.to_string(),
            token,
            chat_id,
            client: Client::new(),
        }
    }

    /// Reads TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("Missing TELEGRAM_BOT_TOKEN env var"))?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .map_err(|_| anyhow!("Missing TELEGRAM_CHAT_ID env var"))?;
        Ok(Self::new(token, chat_id))
    }

    /// Point at a different Bot API host (self-hosted server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    fn body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.chat_id,
            "text": clamp_chars(text, TELEGRAM_TEXT_MAX),
            "disable_web_page_preview": true,
        })
    }
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        let rsp = self
            .client
            .post(self.endpoint())
            .json(&self.body(text))
            .send()
            .await
            .context("telegram post")?;
        let status = rsp.status();
        let parsed: TelegramResponse = rsp.json().await.context("telegram response body")?;
        if !status.is_success() || !parsed.ok {
            bail!(
                "telegram sendMessage failed ({status}): {}",
                parsed.description.unwrap_or_default()
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
