//! AI gateway: chat completion streaming, voice transcription, image generation.
//!
//! [`AiGateway`] is the seam the engines depend on; [`OpenAiGateway`] implements
//! it over one async-openai client. Nothing here retries; errors surface to the
//! caller as-is.

use std::path::Path;
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        AudioInput, AudioResponseFormat, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateImageRequestArgs, CreateTranscriptionRequestArgs, Image, ImageModel,
        ImageResponseFormat, ImageSize,
    },
    Client,
};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::MeasureUnits;
use crate::error::{BotError, Result};
use crate::message::Message;

const COMPLETION_MODEL: &str = "gpt-3.5-turbo";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// System prompt body; `{date}` and `{units}` are filled per request.
const SYSTEM_PROMPT_TEMPLATE: &str = "You are Robotron, a personal robot assistant.
Today is {date}.
Use the {units} system for measurements.
";

/// A finite, single-consumer sequence of completion deltas. The channel closing
/// is the normal end-of-stream; an `Err` item is the error terminal. Nothing
/// arrives after either.
pub type ChunkStream = mpsc::Receiver<Result<String>>;

/// Completion, transcription, and image generation behind one interface so the
/// reply engine and command handler can be tested without the provider.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Transcribes the audio file at `path` to text.
    async fn transcribe(&self, path: &Path) -> Result<String>;

    /// Opens a streaming completion for the thread and returns the chunk stream.
    async fn streaming_reply(&self, thread: Vec<Message>) -> Result<ChunkStream>;

    /// Generates images for the prompt and returns their URLs in provider order.
    async fn imagine(&self, prompt: &str) -> Result<Vec<String>>;
}

/// Masks an API key for safe logging: first 7 chars + "***" + last 4 chars;
/// keys of 11 chars or fewer become "***" outright.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

/// [`AiGateway`] implementation over the OpenAI API.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    units: MeasureUnits,
    /// Stored only for masked logging.
    api_key_for_logging: String,
}

impl OpenAiGateway {
    pub fn new(api_key: String, units: MeasureUnits) -> Self {
        let api_key_for_logging = mask_token(&api_key);
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Arc::new(Client::with_config(config)),
            model: COMPLETION_MODEL.to_string(),
            units,
            api_key_for_logging,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Renders the per-request system prompt with the local date/time and the
    /// configured measurement units.
    fn render_system_prompt(now: DateTime<Local>, units: MeasureUnits) -> String {
        SYSTEM_PROMPT_TEMPLATE
            .replace("{date}", &now.format("%A, %B %-d, %Y %-I:%M %p").to_string())
            .replace("{units}", units.as_str())
    }

    /// Builds the completion request messages: one system message, then one
    /// entry per thread message with the role derived from authorship.
    fn build_messages(
        thread: &[Message],
        units: MeasureUnits,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(Self::render_system_prompt(Local::now(), units))
                .build()?
                .into(),
        ];

        for msg in thread {
            let entry: ChatCompletionRequestMessage = if msg.from_bot {
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.text.clone())
                    .build()?
                    .into()
            } else {
                ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.text.clone())
                    .build()?
                    .into()
            };
            messages.push(entry);
        }

        Ok(messages)
    }
}

#[async_trait]
impl AiGateway for OpenAiGateway {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.mp3".to_string());

        debug!(
            file = %path.display(),
            size = bytes.len(),
            api_key = %self.api_key_for_logging,
            "Transcription request"
        );

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(filename, bytes))
            .model(TRANSCRIPTION_MODEL)
            .response_format(AudioResponseFormat::Json)
            .build()?;

        let response = self.client.audio().transcribe(request).await?;
        Ok(response.text)
    }

    async fn streaming_reply(&self, thread: Vec<Message>) -> Result<ChunkStream> {
        let messages = Self::build_messages(&thread, self.units)?;

        info!(
            model = %self.model,
            message_count = messages.len(),
            api_key = %self.api_key_for_logging,
            "Opening streaming completion"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()?;

        let mut stream = self.client.chat().create_stream(request).await?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        let delta = chunk
                            .choices
                            .first()
                            .and_then(|choice| choice.delta.content.clone())
                            .unwrap_or_default();
                        // A closed receiver means the handling was torn down.
                        if tx.send(Ok(delta)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(BotError::from(e))).await;
                        return;
                    }
                }
            }
            // Dropping the sender closes the channel: normal end-of-stream.
        });

        Ok(rx)
    }

    async fn imagine(&self, prompt: &str) -> Result<Vec<String>> {
        info!(
            prompt = %prompt,
            api_key = %self.api_key_for_logging,
            "Image generation request"
        );

        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(ImageModel::DallE3)
            .size(ImageSize::S1024x1024)
            .response_format(ImageResponseFormat::Url)
            .n(1)
            .build()?;

        let response = self.client.images().create(request).await?;

        let urls: Vec<String> = response
            .data
            .iter()
            .filter_map(|image| match image.as_ref() {
                Image::Url { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect();

        if urls.is_empty() {
            return Err(BotError::Upstream(
                "Image generation returned no URLs".to_string(),
            ));
        }

        Ok(urls)
    }
}
