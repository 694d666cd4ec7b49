//! Channel abstraction for message I/O.

pub mod telegram;

pub use telegram::TelegramApi;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChannelError;

/// One decoded inbound event from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user-typed message (commands arrive this way).
    Command {
        user_id: i64,
        chat_id: i64,
        username: Option<String>,
        text: String,
    },
    /// An inline-keyboard button press.
    Callback {
        user_id: i64,
        chat_id: i64,
        /// The message carrying the keyboard, needed to edit it in place.
        message_id: i64,
        callback_id: String,
        payload: String,
    },
}

/// A single inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Rows of inline buttons, matching Telegram's `inline_keyboard` layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }
}

/// Options for an outbound message.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub keyboard: Option<InlineKeyboard>,
    pub markdown: bool,
}

impl SendOptions {
    pub fn keyboard(keyboard: InlineKeyboard) -> Self {
        Self {
            keyboard: Some(keyboard),
            markdown: false,
        }
    }

    pub fn markdown() -> Self {
        Self {
            keyboard: None,
            markdown: true,
        }
    }

    pub fn markdown_keyboard(keyboard: InlineKeyboard) -> Self {
        Self {
            keyboard: Some(keyboard),
            markdown: true,
        }
    }
}

/// Outbound side of the chat transport.
///
/// Callers treat sends as fire-and-forget: a failed delivery is logged by
/// the caller and never rolls back state.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally with an inline keyboard.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<(), ChannelError>;

    /// Replace the inline keyboard on an existing message.
    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: InlineKeyboard,
    ) -> Result<(), ChannelError>;

    /// Acknowledge a button press, clearing its loading indicator.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError>;
}
