//! Telegram transport — long-polls the Bot API for updates.
//!
//! Inbound updates (messages and callback queries) are decoded once into
//! [`InboundEvent`]s and exposed as a stream. Outbound traffic goes through
//! the [`Messenger`] trait: sendMessage, editMessageReplyMarkup, and
//! answerCallbackQuery.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{InboundEvent, InlineKeyboard, Messenger, SendOptions};
use crate::error::ChannelError;

/// Stream of decoded inbound events.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API client.
pub struct TelegramApi {
    bot_token: SecretString,
    poll_timeout_secs: u64,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramApi {
    pub fn new(bot_token: SecretString, poll_timeout_secs: u64) -> Self {
        Self {
            bot_token,
            poll_timeout_secs,
            base_url: TELEGRAM_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url,
            self.bot_token.expose_secret()
        )
    }

    /// POST one Bot API call and treat any non-2xx reply as an error.
    async fn call_api(&self, method: &str, body: &serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram {method} failed ({status}): {err}");
        }

        Ok(())
    }

    /// Verify the token against the Bot API. Returns the bot's username.
    pub async fn get_me(&self) -> Result<String, ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        Ok(data
            .get("result")
            .and_then(|r| r.get("username"))
            .and_then(|u| u.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    /// Start long-polling `getUpdates` and return the decoded event stream.
    ///
    /// Poll and parse failures are logged and retried after a short sleep;
    /// the stream only ends when the receiver is dropped.
    pub fn start(&self) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");
        let timeout = self.poll_timeout_secs;

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": timeout,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(serde_json::Value::as_array)
                else {
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let Some(event) = decode_update(update) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }
}

/// Decode one Bot API update into an [`InboundEvent`].
///
/// Updates without a usable shape (edited messages, media without text,
/// callbacks with no origin message) are dropped.
fn decode_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(message) = update.get("message") {
        let text = message.get("text")?.as_str()?;
        let from = message.get("from")?;
        let user_id = from.get("id")?.as_i64()?;
        let chat_id = message.get("chat")?.get("id")?.as_i64()?;
        let username = from
            .get("username")
            .and_then(|u| u.as_str())
            .map(String::from);

        return Some(InboundEvent::Command {
            user_id,
            chat_id,
            username,
            text: text.to_string(),
        });
    }

    if let Some(callback) = update.get("callback_query") {
        let callback_id = callback.get("id")?.as_str()?;
        let payload = callback.get("data")?.as_str()?;
        let user_id = callback.get("from")?.get("id")?.as_i64()?;
        let message = callback.get("message")?;
        let chat_id = message.get("chat")?.get("id")?.as_i64()?;
        let message_id = message.get("message_id")?.as_i64()?;

        return Some(InboundEvent::Callback {
            user_id,
            chat_id,
            message_id,
            callback_id: callback_id.to_string(),
            payload: payload.to_string(),
        });
    }

    None
}

// ── Messenger trait implementation ──────────────────────────────────

#[async_trait]
impl Messenger for TelegramApi {
    /// Send a text message, trying Markdown first (when requested) with
    /// plain-text fallback.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(ref keyboard) = options.keyboard {
            body["reply_markup"] = serde_json::json!({ "inline_keyboard": keyboard });
        }

        if options.markdown {
            let mut markdown_body = body.clone();
            markdown_body["parse_mode"] = "Markdown".into();

            match self.call_api("sendMessage", &markdown_body).await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(
                    "Telegram sendMessage with Markdown failed; retrying without parse_mode: {e}"
                ),
            }
        }

        self.call_api("sendMessage", &body)
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: InlineKeyboard,
    ) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": { "inline_keyboard": keyboard },
        });

        self.call_api("editMessageReplyMarkup", &body)
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.call_api(
            "answerCallbackQuery",
            &serde_json::json!({ "callback_query_id": callback_id }),
        )
        .await
        .map_err(|e| ChannelError::SendFailed {
            name: "telegram".into(),
            reason: e.to_string(),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
