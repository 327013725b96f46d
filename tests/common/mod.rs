//! Shared test doubles: a recording transport, a scripted AI gateway, and a
//! copying transcoder. No network, no external tools.

// Each integration test crate uses a different subset of these helpers.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use teloxide::types::ChatAction;
use tokio::sync::{mpsc, Mutex};

use robotron::{
    AiGateway, ChatTransport, ChunkStream, Message, Result, Transcoder, Voice,
};

/// One outbound-platform operation observed by the recording transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Send { chat: i64, text: String },
    Edit { chat: i64, message_id: i32, text: String },
    ChatAction { chat: i64, action: String },
    MediaGroup { chat: i64, urls: Vec<String> },
    Download { file_id: String },
}

/// ChatTransport double that records every operation and never touches the
/// network. Downloads write preset bytes into the destination.
pub struct RecordingTransport {
    ops: Mutex<Vec<Op>>,
    next_message_id: AtomicI32,
    download_bytes: Vec<u8>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(1),
            download_bytes: b"not really ogg".to_vec(),
        }
    }

    pub async fn ops(&self) -> Vec<Op> {
        self.ops.lock().await.clone()
    }

    /// Sends and edits only, for asserting on batching behavior.
    pub async fn writes(&self) -> Vec<Op> {
        self.ops
            .lock()
            .await
            .iter()
            .filter(|op| matches!(op, Op::Send { .. } | Op::Edit { .. }))
            .cloned()
            .collect()
    }

    pub async fn chat_action_count(&self) -> usize {
        self.ops
            .lock()
            .await
            .iter()
            .filter(|op| matches!(op, Op::ChatAction { .. }))
            .count()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, chat: i64, text: &str) -> Result<Message> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.ops.lock().await.push(Op::Send {
            chat,
            text: text.to_string(),
        });
        Ok(Message::outbound(id, chat, text))
    }

    async fn edit_message(&self, chat: i64, message_id: i32, text: &str) -> Result<Message> {
        self.ops.lock().await.push(Op::Edit {
            chat,
            message_id,
            text: text.to_string(),
        });
        Ok(Message::outbound(message_id, chat, text))
    }

    async fn send_chat_action(&self, chat: i64, action: ChatAction) -> Result<()> {
        self.ops.lock().await.push(Op::ChatAction {
            chat,
            action: format!("{:?}", action),
        });
        Ok(())
    }

    async fn send_media_group(&self, chat: i64, urls: &[String]) -> Result<()> {
        self.ops.lock().await.push(Op::MediaGroup {
            chat,
            urls: urls.to_vec(),
        });
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        self.ops.lock().await.push(Op::Download {
            file_id: file_id.to_string(),
        });
        tokio::fs::write(dest, &self.download_bytes).await?;
        Ok(())
    }
}

/// AiGateway double scripted with a fixed chunk sequence, transcription text,
/// and image URLs. Records the prompts handed to `imagine`.
pub struct ScriptedGateway {
    chunks: Mutex<Option<Vec<Result<String>>>>,
    chunk_delay: Option<Duration>,
    transcription: String,
    image_urls: Vec<String>,
    imagine_prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(chunks: Vec<Result<String>>) -> Self {
        Self {
            chunks: Mutex::new(Some(chunks)),
            chunk_delay: None,
            transcription: String::new(),
            image_urls: Vec::new(),
            imagine_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Paces delivery: the first chunk arrives immediately, each later chunk
    /// (and the closing of the channel) waits `delay`. Use with
    /// `#[tokio::test(start_paused = true)]` to let background timers fire
    /// while the stream is still open.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn with_transcription(mut self, text: &str) -> Self {
        self.transcription = text.to_string();
        self
    }

    pub fn with_image_urls(mut self, urls: &[&str]) -> Self {
        self.image_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub async fn imagine_prompts(&self) -> Vec<String> {
        self.imagine_prompts.lock().await.clone()
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn transcribe(&self, _path: &Path) -> Result<String> {
        Ok(self.transcription.clone())
    }

    async fn streaming_reply(&self, _thread: Vec<Message>) -> Result<ChunkStream> {
        let chunks = self
            .chunks
            .lock()
            .await
            .take()
            .expect("streaming_reply scripted once per test");
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        match self.chunk_delay {
            None => {
                for chunk in chunks {
                    tx.send(chunk).await.expect("receiver alive");
                }
            }
            Some(delay) => {
                tokio::spawn(async move {
                    let mut first = true;
                    for chunk in chunks {
                        if !first {
                            tokio::time::sleep(delay).await;
                        }
                        first = false;
                        if tx.send(chunk).await.is_err() {
                            return;
                        }
                    }
                    // Keep the stream open a while so in-flight timers get a
                    // chance to fire before end-of-stream.
                    tokio::time::sleep(delay).await;
                });
            }
        }
        Ok(rx)
    }

    async fn imagine(&self, prompt: &str) -> Result<Vec<String>> {
        self.imagine_prompts.lock().await.push(prompt.to_string());
        Ok(self.image_urls.clone())
    }
}

/// Transcoder double that copies the input file to the output path.
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

pub fn user_message(chat: i64, from: i64, text: &str) -> Message {
    Message {
        id: 100,
        chat,
        from,
        timestamp: Utc::now(),
        text: text.to_string(),
        from_bot: false,
        voice: None,
    }
}

pub fn voice_message(chat: i64, from: i64) -> Message {
    Message {
        id: 101,
        chat,
        from,
        timestamp: Utc::now(),
        text: String::new(),
        from_bot: false,
        voice: Some(Voice {
            file_id: "voice-file-1".to_string(),
            file_size: 14,
            duration_secs: 2,
            mime_type: Some("audio/ogg".to_string()),
        }),
    }
}

/// Ok-wrapped deltas for scripting the happy path.
pub fn deltas(parts: &[&str]) -> Vec<Result<String>> {
    parts.iter().map(|p| Ok(p.to_string())).collect()
}

// Arc helper so each test reads naturally.
pub fn arcs(
    transport: RecordingTransport,
    gateway: ScriptedGateway,
) -> (Arc<RecordingTransport>, Arc<ScriptedGateway>) {
    (Arc::new(transport), Arc::new(gateway))
}
