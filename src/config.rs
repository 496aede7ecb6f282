use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool configuration, persisted as TOML under the user config directory.
/// Created with defaults on first use; API keys may instead come from
/// `OPENAI_API_KEY` / `ASSEMBLYAI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language hint for the word-level transcription service
    pub language: String,
    /// Safety margin added around the coarse segment span (seconds)
    pub locate_margin_seconds: f64,
    /// Extra buffer applied before cutting the rough clip (seconds)
    pub rough_buffer_seconds: f64,
    /// Chunk length when transcribing long recordings (seconds)
    pub chunk_seconds: u64,
    /// Poll interval while waiting on word-level transcription (seconds)
    pub poll_interval_seconds: u64,
    /// Hard deadline for one word-level transcription job (seconds)
    pub transcribe_timeout_seconds: u64,
    /// Retries for transient word-level transcription failures
    pub word_retries: u32,
    /// OpenAI API key (coarse transcription)
    pub openai_api_key: Option<String>,
    /// AssemblyAI API key (word-level transcription)
    pub assemblyai_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "de".to_string(),
            locate_margin_seconds: 5.0,
            rough_buffer_seconds: 10.0,
            chunk_seconds: 1400,
            poll_interval_seconds: 5,
            transcribe_timeout_seconds: 600,
            word_retries: 1,
            openai_api_key: None,
            assemblyai_api_key: None,
        }
    }
}

impl Config {
    pub fn load(path_override: Option<&Path>) -> Result<Self> {
        let path = match path_override {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents).context("parsing config")?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.locate_margin_seconds.is_finite() || self.locate_margin_seconds < 0.0 {
            self.locate_margin_seconds = defaults.locate_margin_seconds;
        }
        if !self.rough_buffer_seconds.is_finite() || self.rough_buffer_seconds < 0.0 {
            self.rough_buffer_seconds = defaults.rough_buffer_seconds;
        }
        if self.chunk_seconds == 0 {
            self.chunk_seconds = defaults.chunk_seconds;
        }
        if self.poll_interval_seconds == 0 {
            self.poll_interval_seconds = defaults.poll_interval_seconds;
        }
        if self.transcribe_timeout_seconds == 0 {
            self.transcribe_timeout_seconds = defaults.transcribe_timeout_seconds;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.transcribe_timeout_seconds)
    }

    pub fn openai_api_key(&self) -> Result<String> {
        key_from("OPENAI_API_KEY", self.openai_api_key.as_deref())
            .context("No OpenAI API key: set OPENAI_API_KEY or `openai_api_key` in the config")
    }

    pub fn assemblyai_api_key(&self) -> Result<String> {
        key_from("ASSEMBLYAI_API_KEY", self.assemblyai_api_key.as_deref()).context(
            "No AssemblyAI API key: set ASSEMBLYAI_API_KEY or `assemblyai_api_key` in the config",
        )
    }
}

fn key_from(env_var: &str, configured: Option<&str>) -> Result<String> {
    if let Ok(key) = std::env::var(env_var)
        && !key.trim().is_empty()
    {
        return Ok(key);
    }
    configured
        .map(|k| k.to_string())
        .filter(|k| !k.trim().is_empty())
        .context("missing key")
}

pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Unable to determine config directory")?;
    Ok(dir.join("clipsnip").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.language, "de");
        assert_eq!(config.locate_margin_seconds, 5.0);
        assert_eq!(config.transcribe_timeout_seconds, 600);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "locate_margin_seconds = -3.0\nchunk_seconds = 0\nlanguage = \"en\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.locate_margin_seconds, 5.0);
        assert_eq!(config.chunk_seconds, 1400);
        assert_eq!(config.language, "en");
    }
}
