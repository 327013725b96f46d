//! Long-poll update dispatcher: allowlist filtering, message-kind routing, and
//! the per-handling deadline.
//!
//! Updates are handled strictly serially; one handling runs to completion (or
//! its deadline) before the next update is polled. Handling failures are
//! logged and the loop continues.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use teloxide::update_listeners::{AsUpdateStream, Polling};
use tracing::{error, info, warn};

use crate::commands::CommandHandler;
use crate::error::{BotError, Result};
use crate::message::Message;
use crate::reply::ReplyEngine;
use crate::telegram::to_core_message;

/// Upper bound for handling a single message.
pub const HANDLING_TIMEOUT: Duration = Duration::from_secs(60);

/// Long-poll timeout for get-updates.
const POLL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Dispatcher {
    bot: Bot,
    allowed_users: HashSet<i64>,
    reply: ReplyEngine,
    commands: CommandHandler,
}

impl Dispatcher {
    pub fn new(
        bot: Bot,
        allowed_users: HashSet<i64>,
        reply: ReplyEngine,
        commands: CommandHandler,
    ) -> Self {
        Self {
            bot,
            allowed_users,
            reply,
            commands,
        }
    }

    /// Polls Telegram until the update stream closes.
    pub async fn run(self) -> Result<()> {
        let mut listener = Polling::builder(self.bot.clone())
            .timeout(POLL_TIMEOUT)
            .build();
        let stream = listener.as_stream();
        futures::pin_mut!(stream);

        while let Some(next) = stream.next().await {
            let update = match next {
                Ok(update) => update,
                Err(e) => {
                    warn!(error = %e, "Polling failed.");
                    continue;
                }
            };

            let UpdateKind::Message(raw) = update.kind else {
                info!("Skipping unsupported update.");
                continue;
            };
            let Some(message) = to_core_message(&raw) else {
                info!("Skipping message without sender.");
                continue;
            };

            let from = message.from;
            match tokio::time::timeout(HANDLING_TIMEOUT, self.process(message)).await {
                Ok(Ok(())) => info!(from, "Handled message."),
                Ok(Err(e)) => error!(from, error = %e, "Handling failed."),
                Err(_) => {
                    let e = BotError::Cancelled("handling deadline elapsed".to_string());
                    error!(from, error = %e, "Handling failed.");
                }
            }
        }

        Ok(())
    }

    /// Filters by the allowlist and routes one message by kind. Disallowed and
    /// unsupported messages are logged and produce no side effects.
    pub async fn process(&self, message: Message) -> Result<()> {
        if !self.allowed_users.contains(&message.from) {
            info!(from = message.from, "User is not allowed.");
            return Ok(());
        }

        if message.text.starts_with('/') {
            self.commands.handle(&message).await
        } else if !message.text.is_empty() {
            self.reply.handle_text(message).await
        } else if message.voice.is_some() {
            self.reply.handle_voice(message).await
        } else {
            info!(from = message.from, "Skipping unsupported message.");
            Ok(())
        }
    }
}
