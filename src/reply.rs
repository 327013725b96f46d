//! The streaming reply loop: typing indicator, chunk batching, edit-in-place
//! rendering, and the voice preamble.

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::ChatAction;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ai::AiGateway;
use crate::error::Result;
use crate::message::Message;
use crate::store::ThreadStore;
use crate::telegram::ChatTransport;
use crate::transcode::Transcoder;

/// Number of buffered deltas that triggers a message-edit flush.
pub const STREAM_BATCH_SIZE: usize = 10;

/// How often the chat action is refreshed while a stream is in flight.
const TYPING_REFRESH: Duration = Duration::from_secs(3);

/// Keeps a chat action alive until cancelled.
///
/// One action is sent immediately; a background task re-sends it every 3 s.
/// [`cancel`](Self::cancel) is idempotent, and dropping the guard also stops
/// the ticker, so a deadline unwind cannot leak it. Ticker send failures are
/// logged and stop the ticker silently; they never fail the turn.
pub struct TypingIndicator {
    ticker: JoinHandle<()>,
}

impl TypingIndicator {
    pub async fn start(
        transport: Arc<dyn ChatTransport>,
        chat: i64,
        action: ChatAction,
    ) -> Result<Self> {
        transport.send_chat_action(chat, action.clone()).await?;

        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(TYPING_REFRESH).await;
                if let Err(e) = transport.send_chat_action(chat, action.clone()).await {
                    warn!(chat, error = %e, "Failed to send chat action.");
                    return;
                }
            }
        });

        Ok(Self { ticker })
    }

    /// Stops the ticker. Safe to call more than once.
    pub fn cancel(&self) {
        self.ticker.abort();
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

/// Handles the text and voice paths of a turn: reads and writes the thread
/// store, consumes the completion stream, and renders the reply into the chat
/// by progressively editing a single anchored message.
pub struct ReplyEngine {
    transport: Arc<dyn ChatTransport>,
    ai: Arc<dyn AiGateway>,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<Mutex<ThreadStore>>,
}

impl ReplyEngine {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        ai: Arc<dyn AiGateway>,
        transcoder: Arc<dyn Transcoder>,
        store: Arc<Mutex<ThreadStore>>,
    ) -> Self {
        Self {
            transport,
            ai,
            transcoder,
            store,
        }
    }

    /// The text path: store the inbound message, stream the model's reply into
    /// the chat in batches of [`STREAM_BATCH_SIZE`] deltas, and store the
    /// finished outbound reply so it participates in future threads.
    pub async fn handle_text(&self, inbound: Message) -> Result<()> {
        let chat = inbound.chat;
        self.store.lock().await.put(inbound.clone());
        let thread = self.store.lock().await.thread(chat);

        debug!(
            from = inbound.from,
            thread_size = thread.len(),
            "Handling text."
        );

        let mut stream = self.ai.streaming_reply(thread).await?;
        let typing = TypingIndicator::start(self.transport.clone(), chat, ChatAction::Typing).await?;

        let mut reply: Option<Message> = None;
        let mut buffer: Vec<String> = Vec::new();
        let mut awaiting_first_chunk = true;

        while let Some(chunk) = stream.recv().await {
            // The first chunk means a visible reply is imminent.
            if awaiting_first_chunk {
                typing.cancel();
                awaiting_first_chunk = false;
            }

            buffer.push(chunk?);
            if buffer.len() < STREAM_BATCH_SIZE {
                continue;
            }

            reply = self.stream_message(chat, reply, &buffer.concat()).await?;
            buffer.clear();
        }

        // Residual flush after normal end-of-stream.
        reply = self.stream_message(chat, reply, &buffer.concat()).await?;

        if let Some(outbound) = reply {
            self.store.lock().await.put(outbound);
        }
        Ok(())
    }

    /// The voice path: download, transcode, transcribe, then fall through to
    /// the text path with the transcription substituted in. Both scratch files
    /// are removed on every exit path when the guards drop.
    pub async fn handle_voice(&self, mut inbound: Message) -> Result<()> {
        let Some(voice) = inbound.voice.clone() else {
            debug!(from = inbound.from, "Voice handler called without attachment.");
            return Ok(());
        };

        let ogg = tempfile::Builder::new()
            .prefix("voice-")
            .suffix(".ogg")
            .tempfile()?;
        let mp3 = tempfile::Builder::new()
            .prefix("voice-")
            .suffix(".mp3")
            .tempfile()?;

        self.transport.download_file(&voice.file_id, ogg.path()).await?;
        self.transcoder.transcode(ogg.path(), mp3.path()).await?;
        let text = self.ai.transcribe(mp3.path()).await?;

        debug!(
            from = inbound.from,
            voice_size = voice.file_size,
            voice_duration = voice.duration_secs,
            voice_mime_type = voice.mime_type.as_deref().unwrap_or(""),
            text = %text,
            "Transcribed voice."
        );

        inbound.text = text;
        self.handle_text(inbound).await
    }

    /// Renders one flushed delta into the chat.
    ///
    /// A whitespace-only delta is a no-op. Without a prior anchor the delta is
    /// sent as a new message; otherwise the anchor is edited to its text plus
    /// the delta, and the updated record replaces the anchor.
    async fn stream_message(
        &self,
        chat: i64,
        prior: Option<Message>,
        delta: &str,
    ) -> Result<Option<Message>> {
        if delta.trim().is_empty() {
            return Ok(prior);
        }

        match prior {
            None => {
                let sent = self.transport.send_message(chat, delta).await?;
                Ok(Some(sent))
            }
            Some(anchor) => {
                let text = format!("{}{}", anchor.text, delta);
                let sent = self.transport.edit_message(chat, anchor.id, &text).await?;
                Ok(Some(sent))
            }
        }
    }
}
