//! # Robotron
//!
//! A personal Telegram assistant that forwards per-chat conversation threads to
//! OpenAI and streams the reply back by progressively editing a single sent
//! message. Voice notes are transcoded and transcribed before being treated as
//! text; `/clear` drops a thread and `/imagine` generates images.
//!
//! The library exposes trait seams for the Telegram transport
//! ([`ChatTransport`]), the AI provider ([`AiGateway`]), and the media tool
//! ([`Transcoder`]) so the streaming loop is testable without the network.

pub mod ai;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod message;
pub mod reply;
pub mod store;
pub mod telegram;
pub mod transcode;

pub use ai::{AiGateway, ChunkStream, OpenAiGateway};
pub use commands::{Command, CommandHandler};
pub use config::{Config, MeasureUnits};
pub use dispatcher::Dispatcher;
pub use error::{BotError, Result};
pub use logger::init_tracing;
pub use message::{Message, Voice};
pub use reply::{ReplyEngine, TypingIndicator, STREAM_BATCH_SIZE};
pub use store::ThreadStore;
pub use telegram::{register_commands, to_core_message, ChatTransport, TelegramTransport};
pub use transcode::{FfmpegTranscoder, Transcoder};
