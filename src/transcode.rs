//! One-shot audio container conversion via an external ffmpeg process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BotError, Result};

/// Rewrites an audio file into a container the transcription endpoint accepts.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Shells out to `ffmpeg` with output-overwrite enabled and its own chatter
/// suppressed.
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        debug!(input = %input.display(), output = %output.display(), "Transcoding voice file");

        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-loglevel")
            .arg("panic")
            .arg("-i")
            .arg(input)
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(BotError::Transcode(format!(
                "ffmpeg exited with {status}"
            )));
        }
        Ok(())
    }
}
