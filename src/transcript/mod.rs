//! Transcript data model and persistence.
//!
//! A coarse transcript is produced once per recording by the segment-level
//! transcription service and is read-only afterwards. Word tokens are
//! produced per rough clip by the word-level service.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One segment of the coarse transcript. Segments are ordered by start time
/// and `end >= start`; gaps between segments are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Persisted transcript document: the full text plus the timestamped
/// segments it was concatenated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseTranscript {
    pub transcript: String,
    pub timestamps: Vec<TranscriptSegment>,
}

impl CoarseTranscript {
    /// Build the document from segments, caching the concatenated text.
    pub fn from_segments(timestamps: Vec<TranscriptSegment>) -> Self {
        let transcript = timestamps
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<String>();
        Self {
            transcript,
            timestamps,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse transcript JSON at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create transcript directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize transcript")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        Ok(())
    }
}

/// A single word with millisecond timing, scoped to one rough clip's audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_segments_caches_concatenated_text() {
        let transcript = CoarseTranscript::from_segments(vec![
            TranscriptSegment {
                start: 0.0,
                end: 5.0,
                text: "Hallo ".to_string(),
            },
            TranscriptSegment {
                start: 5.0,
                end: 12.0,
                text: "wie geht es dir".to_string(),
            },
        ]);
        assert_eq!(transcript.transcript, "Hallo wie geht es dir");
        assert_eq!(transcript.timestamps.len(), 2);
    }

    #[test]
    fn round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");

        let transcript = CoarseTranscript::from_segments(vec![TranscriptSegment {
            start: 1.5,
            end: 3.0,
            text: "ein Satz".to_string(),
        }]);
        transcript.save(&path).unwrap();

        let loaded = CoarseTranscript::load(&path).unwrap();
        assert_eq!(loaded.transcript, "ein Satz");
        assert_eq!(loaded.timestamps[0].start, 1.5);
        assert_eq!(loaded.timestamps[0].end, 3.0);
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(CoarseTranscript::load(&path).is_err());
    }
}
