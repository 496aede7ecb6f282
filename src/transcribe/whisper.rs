//! Coarse segment-level transcription via the OpenAI audio API.
//!
//! Long recordings are chunked before upload; the returned segment
//! timestamps are shifted by each chunk's absolute start so the persisted
//! transcript is in the full recording's time base.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::TranscribeError;
use crate::media::{probe_duration_seconds, trim_audio};
use crate::transcript::{CoarseTranscript, TranscriptSegment};
use crate::ui::{Level, emit};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const MODEL: &str = "whisper-1";
const PROMPT: &str = "Write the transcript for the following interview to text";

pub struct WhisperClient {
    client: Client,
    api_key: String,
    base_url: String,
    chunk_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

impl WhisperClient {
    pub fn new(api_key: String, chunk_seconds: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chunk_seconds,
        }
    }

    /// Transcribe a full recording into segment-level timestamps.
    pub async fn transcribe(&self, audio: &Path) -> Result<CoarseTranscript, TranscribeError> {
        let total_seconds = probe_duration_seconds(audio)?;
        let scratch = tempfile::tempdir()?;

        let mut segments: Vec<TranscriptSegment> = Vec::new();
        let mut chunk_start = 0u64;
        let mut chunk_index = 0usize;

        while (chunk_start as f64) < total_seconds {
            chunk_index += 1;
            let duration = (total_seconds - chunk_start as f64).min(self.chunk_seconds as f64);
            let chunk_path = scratch.path().join(format!("chunk_{chunk_index:03}.mp3"));
            trim_audio(audio, &chunk_path, chunk_start as f64, duration)?;

            emit(
                Level::Info,
                "transcript.chunk",
                &format!(
                    "Transcribing chunk {} ({}s-{:.0}s)...",
                    chunk_index,
                    chunk_start,
                    chunk_start as f64 + duration
                ),
                None,
            );

            let chunk_segments = self.transcribe_chunk(&chunk_path).await?;
            let offset = chunk_start as f64;
            segments.extend(chunk_segments.into_iter().map(|s| TranscriptSegment {
                start: s.start + offset,
                end: s.end + offset,
                text: s.text,
            }));

            chunk_start += self.chunk_seconds;
        }

        Ok(CoarseTranscript::from_segments(segments))
    }

    async fn transcribe_chunk(&self, chunk: &Path) -> Result<Vec<ApiSegment>, TranscribeError> {
        let bytes = tokio::fs::read(chunk).await?;
        let file_name = chunk
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk.mp3".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .text("model", MODEL)
            .text("response_format", "verbose_json")
            .text("prompt", PROMPT)
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranscribeError::Api { status, body });
        }

        let transcription: VerboseTranscription = resp.json().await?;
        Ok(transcription.segments)
    }
}
