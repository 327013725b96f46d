//! Error types for the bot.
//!
//! [`BotError`] is the top-level error; everything inside a handling that can
//! fail maps into one of its variants.

use async_openai::error::OpenAIError;
use thiserror::Error;

/// Top-level error (startup config, transports, provider, media tool).
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Telegram transport error: {0}")]
    Transport(#[from] teloxide::RequestError),

    #[error("File download error: {0}")]
    Download(#[from] teloxide::DownloadError),

    /// Provider-side failure: a rejected request or a response the bot
    /// cannot use (no image URLs, unparsable URL).
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Handling cancelled: {0}")]
    Cancelled(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OpenAIError> for BotError {
    fn from(e: OpenAIError) -> Self {
        BotError::Upstream(e.to_string())
    }
}

/// Result type for bot operations; uses [`BotError`].
pub type Result<T> = std::result::Result<T, BotError>;
