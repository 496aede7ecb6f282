//! Topic collection documents: curated statements awaiting clips.
//!
//! Produced upstream by the text-mining stage; this tool only fills in
//! `clip_path` and `timestamps` per statement. Unknown fields (scores,
//! speaker metadata) round-trip untouched.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::align::Span;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub statements: Vec<Statement>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ClipTimestamps>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Audit record persisted per processed statement. `precise` stays null
/// when refinement fell back to the rough cut.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClipTimestamps {
    pub rough: Option<Span>,
    pub precise: Option<Span>,
}

/// Statement ids appear as integers or strings depending on the upstream
/// extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementId {
    Number(u64),
    Text(String),
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementId::Number(n) => write!(f, "{n}"),
            StatementId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Collection {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read collection from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse collection JSON at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize collection")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write collection to {}", path.display()))?;
        Ok(())
    }
}

/// Collection files in a directory, sorted for stable processing order.
pub fn list_collection_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read collections directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "json" || ext == "jsonl")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_round_trip() {
        let json = r#"{
            "topic": "Energie",
            "curator": "run-42",
            "statements": [
                {"id": 3, "quote": "ein Zitat", "score": 0.91}
            ]
        }"#;

        let mut collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.topic.as_deref(), Some("Energie"));
        assert_eq!(collection.extra["curator"], "run-42");
        assert_eq!(collection.statements[0].extra["score"], 0.91);
        assert_eq!(collection.statements[0].id, StatementId::Number(3));

        collection.statements[0].timestamps = Some(ClipTimestamps {
            rough: Some(Span::new(10.0, 40.0)),
            precise: None,
        });

        let out = serde_json::to_string(&collection).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(reparsed["curator"], "run-42");
        assert_eq!(reparsed["statements"][0]["score"], 0.91);
        // The precise slot must be an explicit null, not omitted.
        assert!(reparsed["statements"][0]["timestamps"]["precise"].is_null());
        assert_eq!(
            reparsed["statements"][0]["timestamps"]["rough"]["start"],
            10.0
        );
    }

    #[test]
    fn string_ids_format_into_filenames() {
        let id: StatementId = serde_json::from_str("\"a-7\"").unwrap();
        assert_eq!(format!("statement_{id}_rough.mp4"), "statement_a-7_rough.mp4");
    }

    #[test]
    fn lists_only_collection_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.jsonl"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_collection_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.json"]);
    }
}
