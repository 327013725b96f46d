//! Telegram transport: the [`ChatTransport`] seam plus the teloxide-backed
//! implementation and the teloxide→core message conversion.
//!
//! Production code talks to Telegram through [`TelegramTransport`]; tests
//! substitute a recording implementation of the trait.

use std::path::Path;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::payloads::SetMyCommandsSetters;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommandScope, ChatAction, ChatId, FileId, InputFile, InputMedia, InputMediaPhoto,
    MessageId,
};
use teloxide::utils::command::BotCommands;
use tokio::io::AsyncWriteExt;

use crate::commands::Command;
use crate::error::{BotError, Result};
use crate::message::{Message, Voice};

/// Outbound operations against the messaging platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a new message and returns its core record.
    async fn send_message(&self, chat: i64, text: &str) -> Result<Message>;

    /// Replaces the text of an already-sent message and returns the updated record.
    async fn edit_message(&self, chat: i64, message_id: i32, text: &str) -> Result<Message>;

    /// Sends one ephemeral chat action (typing, upload_photo, ...).
    async fn send_chat_action(&self, chat: i64, action: ChatAction) -> Result<()>;

    /// Sends the image URLs as a single media group.
    async fn send_media_group(&self, chat: i64, urls: &[String]) -> Result<()>;

    /// Downloads the platform file behind `file_id` into `dest`.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()>;
}

/// Thin wrapper around [`teloxide::Bot`] implementing [`ChatTransport`].
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat: i64, text: &str) -> Result<Message> {
        let sent = self.bot.send_message(ChatId(chat), text.to_string()).await?;
        Ok(Message::outbound(sent.id.0, chat, text))
    }

    async fn edit_message(&self, chat: i64, message_id: i32, text: &str) -> Result<Message> {
        let sent = self
            .bot
            .edit_message_text(ChatId(chat), MessageId(message_id), text.to_string())
            .await?;
        Ok(Message::outbound(sent.id.0, chat, text))
    }

    async fn send_chat_action(&self, chat: i64, action: ChatAction) -> Result<()> {
        self.bot.send_chat_action(ChatId(chat), action).await?;
        Ok(())
    }

    async fn send_media_group(&self, chat: i64, urls: &[String]) -> Result<()> {
        let mut media = Vec::with_capacity(urls.len());
        for url in urls {
            let url = reqwest::Url::parse(url)
                .map_err(|e| BotError::Upstream(format!("Invalid image URL {url:?}: {e}")))?;
            media.push(InputMedia::Photo(InputMediaPhoto::new(InputFile::url(url))));
        }
        self.bot.send_media_group(ChatId(chat), media).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        let mut out = tokio::fs::File::create(dest).await?;
        self.bot.download_file(&file.path, &mut out).await?;
        out.flush().await?;
        Ok(())
    }
}

/// Registers the command surface with Telegram, scoped to private chats.
pub async fn register_commands(bot: &Bot) -> Result<()> {
    bot.set_my_commands(Command::bot_commands())
        .scope(BotCommandScope::AllPrivateChats)
        .await?;
    Ok(())
}

/// Converts a teloxide message to the core model. Returns `None` for messages
/// without a sender (channel posts and the like), which the dispatcher skips.
pub fn to_core_message(msg: &teloxide::types::Message) -> Option<Message> {
    let from = msg.from.as_ref()?;

    let voice = msg.voice().map(|v| Voice {
        file_id: v.file.id.0.clone(),
        file_size: v.file.size,
        duration_secs: v.duration.seconds(),
        mime_type: v.mime_type.as_ref().map(|m| m.to_string()),
    });

    Some(Message {
        id: msg.id.0,
        chat: msg.chat.id.0,
        from: i64::try_from(from.id.0).unwrap_or_default(),
        timestamp: msg.date,
        text: msg.text().unwrap_or_default().to_string(),
        from_bot: msg.via_bot.is_some(),
        voice,
    })
}
