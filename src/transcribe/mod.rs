//! Speech-to-text collaborators.
//!
//! Both services are black boxes at this boundary: the coarse transcriber
//! returns segment-level timestamps for a whole recording, the word-level
//! transcriber returns millisecond word timings for a short rough clip.

pub mod assembly;
pub mod whisper;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::media::{MediaError, extract_audio, is_audio_file};
use crate::transcript::WordToken;
use crate::ui::{Level, emit};
use crate::workspace::{Workspace, compute_file_hash};

pub use assembly::AssemblyClient;
pub use whisper::WhisperClient;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),

    /// The service accepted the job but reported a non-completed status.
    #[error("Transcription service reported failure: {0}")]
    Service(String),

    #[error("Transcription API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscribeError {
    /// Failures worth one retry before falling back to the rough cut.
    /// Timeouts are not retried: a second 600s wait doubles the stall for a
    /// clip that already failed to come back in time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TranscribeError::Service(_)
                | TranscribeError::Api { .. }
                | TranscribeError::Transport(_)
        )
    }
}

/// Word-level transcription of one short clip.
///
/// Implementations must distinguish service failure from "completed with
/// zero words": the latter is `Ok` with an empty vector.
#[async_trait]
pub trait WordTranscriber: Send + Sync {
    async fn transcribe_words(
        &self,
        media: &Path,
        language: &str,
    ) -> Result<Vec<WordToken>, TranscribeError>;
}

/// Produce (or reuse) the coarse transcript for a recording and return its
/// cache path. The cache is keyed by content hash, so renaming the source
/// file does not trigger a re-transcription.
pub async fn ensure_coarse_transcript(
    media: &Path,
    workspace: &Workspace,
    config: &Config,
    force: bool,
) -> Result<PathBuf> {
    let hash = compute_file_hash(media)?;
    let transcript_path = workspace.transcript_path(&hash);
    if transcript_path.exists() && !force {
        emit(
            Level::Info,
            "transcript.cached",
            &format!(
                "Transcript already cached at {} (use --force to regenerate)",
                transcript_path.display()
            ),
            None,
        );
        return Ok(transcript_path);
    }

    let audio = if is_audio_file(media) {
        media.to_path_buf()
    } else {
        let extracted = workspace.transcript_dir().join(format!("{hash}_audio.mp3"));
        if !extracted.exists() || force {
            extract_audio(media, &extracted)?;
        }
        extracted
    };

    emit(
        Level::Info,
        "transcript.start",
        &format!("Transcribing {}...", media.display()),
        None,
    );

    let client = WhisperClient::new(config.openai_api_key()?, config.chunk_seconds);
    let transcript = client.transcribe(&audio).await?;
    transcript.save(&transcript_path)?;

    emit(
        Level::Success,
        "transcript.saved",
        &format!(
            "Saved transcript with {} segments to {}",
            transcript.timestamps.len(),
            transcript_path.display()
        ),
        None,
    );

    Ok(transcript_path)
}
