//! Core message model shared by the store, the AI gateway, and the engines.
//!
//! Decoupled from teloxide so the streaming loop and the store can be tested
//! without a Telegram connection; conversion from teloxide lives in
//! [`crate::telegram`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message, inbound or outbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message id assigned by Telegram.
    pub id: i32,
    /// Chat the message belongs to.
    pub chat: i64,
    /// Author user id; `0` for messages the bot sent itself.
    pub from: i64,
    /// Wall-clock timestamp from the platform.
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Whether this message was produced by a bot. Inbound messages carry
    /// Telegram's `via_bot` flag; outbound replies are tagged when stored.
    pub from_bot: bool,
    pub voice: Option<Voice>,
}

/// Voice note metadata attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub file_id: String,
    pub file_size: u32,
    pub duration_secs: u32,
    pub mime_type: Option<String>,
}

impl Message {
    /// Builds the bot's own outbound message record for storing into a thread.
    pub fn outbound(id: i32, chat: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            chat,
            from: 0,
            timestamp: Utc::now(),
            text: text.into(),
            from_bot: true,
            voice: None,
        }
    }
}
