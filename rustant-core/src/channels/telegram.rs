//! Telegram Bot API channel implementation.
//!
//! Uses the Telegram Bot API via reqwest for `getUpdates` / `sendMessage`.
//! In tests, an `HttpClient` trait abstraction allows mocking.

use super::{Channel, ChannelCapabilities, ChannelMessage, ChannelStatus, ChannelType, ChannelUser, MessageId, StreamingMode};
use crate::error::{ChannelError, RustantError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a Telegram channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub allowed_chat_ids: Vec<i64>,
    pub polling_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chat_ids: Vec::new(),
            polling_timeout_secs: 30,
        }
    }
}

/// Trait for HTTP interactions, allowing test mocking.
#[async_trait]
pub trait TelegramHttpClient: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, String>;
    async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, String>;
}

/// A Telegram update from the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub from_id: i64,
    pub from_name: String,
    pub text: String,
}

/// Telegram channel using the Bot API.
pub struct TelegramChannel {
    config: TelegramConfig,
    status: ChannelStatus,
    http_client: Box<dyn TelegramHttpClient>,
    last_update_id: i64,
    name: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, http_client: Box<dyn TelegramHttpClient>) -> Self {
        Self {
            config,
            status: ChannelStatus::Disconnected,
            http_client,
            last_update_id: 0,
            name: "telegram".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    async fn connect(&mut self) -> Result<(), RustantError> {
        if self.config.bot_token.is_empty() {
            return Err(RustantError::Channel(ChannelError::AuthFailed {
                name: self.name.clone(),
            }));
        }
        self.status = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RustantError> {
        self.status = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send_message(&self, msg: ChannelMessage) -> Result<MessageId, RustantError> {
        let text = msg.content.as_text().unwrap_or("");
        let chat_id: i64 = msg.channel_id.parse().unwrap_or(0);

        self.http_client
            .send_message(chat_id, text)
            .await
            .map(MessageId::new)
            .map_err(|e| {
                RustantError::Channel(ChannelError::SendFailed {
                    name: self.name.clone(),
                    message: e,
                })
            })
    }

    async fn receive_messages(&self) -> Result<Vec<ChannelMessage>, RustantError> {
        let updates = self
            .http_client
            .get_updates(self.last_update_id + 1)
            .await
            .map_err(|e| {
                RustantError::Channel(ChannelError::ConnectionFailed {
                    name: self.name.clone(),
                    message: e,
                })
            })?;

        let messages: Vec<ChannelMessage> = updates
            .into_iter()
            .filter(|u| {
                self.config.allowed_chat_ids.is_empty()
                    || self.config.allowed_chat_ids.contains(&u.chat_id)
            })
            .map(|u| {
                let sender = ChannelUser::new(u.from_id.to_string(), ChannelType::Telegram)
                    .with_name(u.from_name);
                ChannelMessage::text(ChannelType::Telegram, u.chat_id.to_string(), sender, u.text)
            })
            .collect();

        Ok(messages)
    }

    fn status(&self) -> ChannelStatus {
        self.status
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_threads: true,
            supports_reactions: true,
            supports_files: true,
            supports_voice: true,
            supports_video: false,
            max_message_length: Some(4096),
            supports_editing: false,
            supports_deletion: false,
        }
    }

    fn streaming_mode(&self) -> StreamingMode {
        StreamingMode::Polling {
            interval_ms: self.config.polling_timeout_secs * 1000,
        }
    }
}

/// Real Telegram Bot API HTTP client using reqwest.
pub struct RealTelegramHttp {
    client: reqwest::Client,
    base_url: String,
}

impl RealTelegramHttp {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", bot_token),
        }
    }
}

#[async_trait]
impl TelegramHttpClient for RealTelegramHttp {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, String> {
        let url = format!("{}/sendMessage", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.map_err(|e| format!("JSON parse error: {e}"))?;

        if !body["ok"].as_bool().unwrap_or(false) {
            let desc = body["description"].as_str().unwrap_or("unknown error");
            return Err(format!("Telegram API error ({}): {}", status, desc));
        }

        let message_id = body["result"]["message_id"]
            .as_i64()
            .unwrap_or(0)
            .to_string();
        Ok(message_id)
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, String> {
        let url = format!(
            "{}/getUpdates?offset={}&timeout=30",
            self.base_url, offset
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let body: serde_json::Value = resp.json().await.map_err(|e| format!("JSON parse error: {e}"))?;

        if !body["ok"].as_bool().unwrap_or(false) {
            let desc = body["description"].as_str().unwrap_or("unknown error");
            return Err(format!("Telegram API error: {}", desc));
        }

        let updates = body["result"]
            .as_array()
            .unwrap_or(&Vec::new())
            .iter()
            .filter_map(|u| {
                let msg = &u["message"];
                Some(TelegramUpdate {
                    update_id: u["update_id"].as_i64()?,
                    chat_id: msg["chat"]["id"].as_i64()?,
                    from_id: msg["from"]["id"].as_i64().unwrap_or(0),
                    from_name: msg["from"]["first_name"]
                        .as_str()
                        .unwrap_or("Unknown")
                        .to_string(),
                    text: msg["text"].as_str().unwrap_or("").to_string(),
                })
            })
            .collect();

        Ok(updates)
    }
}

/// Create a Telegram channel with a real HTTP client.
pub fn create_telegram_channel(config: TelegramConfig) -> TelegramChannel {
    let http = RealTelegramHttp::new(&config.bot_token);
    TelegramChannel::new(config, Box::new(http))
}
