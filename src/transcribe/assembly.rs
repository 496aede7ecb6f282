//! AssemblyAI word-level transcription client.
//!
//! Uploads a rough clip, submits a transcription job with a language hint,
//! and polls the job status under a hard deadline.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, sleep};

use super::{TranscribeError, WordTranscriber};
use crate::media::extract_audio;
use crate::transcript::WordToken;
use crate::ui::{Level, emit};

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";

pub struct AssemblyClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    deadline: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    words: Option<Vec<ApiWord>>,
}

#[derive(Debug, Deserialize)]
struct ApiWord {
    text: String,
    start: u64,
    end: u64,
    #[serde(default)]
    confidence: Option<f64>,
}

impl AssemblyClient {
    pub fn new(api_key: String, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval,
            deadline,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// The upload endpoint wants plain audio; pull the track out of video
    /// containers into a throwaway mp3 first.
    fn ensure_audio_for_upload(
        media: &Path,
        scratch: &tempfile::TempDir,
    ) -> Result<PathBuf, TranscribeError> {
        if crate::media::is_audio_file(media) {
            return Ok(media.to_path_buf());
        }
        let audio_path = scratch.path().join("clip.mp3");
        extract_audio(media, &audio_path)?;
        Ok(audio_path)
    }

    async fn upload(&self, audio: &Path) -> Result<String, TranscribeError> {
        let bytes = tokio::fs::read(audio).await?;

        emit(
            Level::Debug,
            "words.upload",
            &format!("Uploading {} ({} bytes)", audio.display(), bytes.len()),
            None,
        );

        let resp = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranscribeError::Api { status, body });
        }

        let upload: UploadResponse = resp.json().await?;
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str, language: &str) -> Result<String, TranscribeError> {
        let resp = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .json(&json!({
                "audio_url": audio_url,
                "language_code": language,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranscribeError::Api { status, body });
        }

        let job: JobResponse = resp.json().await?;
        emit(
            Level::Debug,
            "words.submitted",
            &format!("Word-level transcription job started: {}", job.id),
            None,
        );
        Ok(job.id)
    }

    async fn wait_for_completion(&self, job_id: &str) -> Result<Vec<WordToken>, TranscribeError> {
        let url = format!("{}/v2/transcript/{}", self.base_url, job_id);
        let started = Instant::now();

        loop {
            if started.elapsed() > self.deadline {
                return Err(TranscribeError::Timeout(self.deadline));
            }

            let resp = self
                .client
                .get(&url)
                .header(AUTHORIZATION, &self.api_key)
                .send()
                .await?;

            if !resp.status().is_success() {
                emit(
                    Level::Warn,
                    "words.poll",
                    "Failed to check transcription status, retrying...",
                    None,
                );
                sleep(self.poll_interval).await;
                continue;
            }

            let status: StatusResponse = resp.json().await?;
            emit(
                Level::Debug,
                "words.poll",
                &format!("Status: {}", status.status),
                None,
            );

            match status.status.as_str() {
                // Completed with zero words is a valid outcome; the refiner
                // will report not-found on its own.
                "completed" => {
                    return Ok(status
                        .words
                        .unwrap_or_default()
                        .into_iter()
                        .map(|w| WordToken {
                            text: w.text,
                            start_ms: w.start,
                            end_ms: w.end,
                            confidence: w.confidence,
                        })
                        .collect());
                }
                "error" => {
                    return Err(TranscribeError::Service(
                        status.error.unwrap_or_else(|| "unknown error".to_string()),
                    ));
                }
                _ => sleep(self.poll_interval).await,
            }
        }
    }
}

#[async_trait::async_trait]
impl WordTranscriber for AssemblyClient {
    async fn transcribe_words(
        &self,
        media: &Path,
        language: &str,
    ) -> Result<Vec<WordToken>, TranscribeError> {
        let scratch = tempfile::tempdir()?;
        let audio = Self::ensure_audio_for_upload(media, &scratch)?;

        let audio_url = self.upload(&audio).await?;
        let job_id = self.submit(&audio_url, language).await?;
        self.wait_for_completion(&job_id).await
    }
}
