//! Slash-command surface: `/clear` and `/imagine`.

use std::sync::Arc;

use teloxide::types::ChatAction;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::info;

use crate::ai::AiGateway;
use crate::error::Result;
use crate::message::Message;
use crate::reply::TypingIndicator;
use crate::store::ThreadStore;
use crate::telegram::ChatTransport;

/// Reply sent when `/imagine` is invoked without a prompt.
pub const MSG_EMPTY_PROMPT: &str = "Please provide a prompt.";

/// Commands registered with Telegram at startup.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "forget the current conversation")]
    Clear,
    #[command(description = "generate images from a prompt")]
    Imagine(String),
}

/// Dispatches slash-commands. Unknown commands are logged and ignored.
pub struct CommandHandler {
    transport: Arc<dyn ChatTransport>,
    ai: Arc<dyn AiGateway>,
    store: Arc<Mutex<ThreadStore>>,
}

impl CommandHandler {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        ai: Arc<dyn AiGateway>,
        store: Arc<Mutex<ThreadStore>>,
    ) -> Self {
        Self {
            transport,
            ai,
            store,
        }
    }

    pub async fn handle(&self, message: &Message) -> Result<()> {
        match Command::parse(&message.text, "") {
            Ok(Command::Clear) => {
                self.store.lock().await.clear(message.chat);
                info!(from = message.from, chat = message.chat, "Cleared thread.");
                Ok(())
            }
            Ok(Command::Imagine(prompt)) => self.imagine(message.chat, prompt.trim()).await,
            Err(_) => {
                info!(
                    from = message.from,
                    command = %message.text,
                    "Skipping unsupported command."
                );
                Ok(())
            }
        }
    }

    /// Generates images for the prompt and sends them as one media group,
    /// keeping an `upload_photo` action alive while generation runs.
    async fn imagine(&self, chat: i64, prompt: &str) -> Result<()> {
        if prompt.is_empty() {
            self.transport.send_message(chat, MSG_EMPTY_PROMPT).await?;
            return Ok(());
        }

        let typing =
            TypingIndicator::start(self.transport.clone(), chat, ChatAction::UploadPhoto).await?;
        let urls = self.ai.imagine(prompt).await?;
        typing.cancel();

        self.transport.send_media_group(chat, &urls).await?;
        info!(chat, images = urls.len(), "Sent generated images.");
        Ok(())
    }
}
