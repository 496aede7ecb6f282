use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// On-disk layout for intermediate artifacts: cached transcripts and clip
/// drafts. Rooted at `intermediate/` next to the invocation by default.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub const DEFAULT_ROOT: &'static str = "intermediate";

    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_ROOT));
        let workspace = Self { root };
        fs::create_dir_all(workspace.transcript_dir()).with_context(|| {
            format!(
                "Failed to create transcript directory {}",
                workspace.transcript_dir().display()
            )
        })?;
        fs::create_dir_all(workspace.drafts_dir()).with_context(|| {
            format!(
                "Failed to create drafts directory {}",
                workspace.drafts_dir().display()
            )
        })?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transcript_dir(&self) -> PathBuf {
        self.root.join("transcript")
    }

    /// Transcripts are cached by content hash of the source media, so a
    /// renamed or moved recording still hits the cache.
    pub fn transcript_path(&self, media_hash: &str) -> PathBuf {
        self.transcript_dir().join(format!("{media_hash}.json"))
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.root.join("shorts_draft")
    }

    pub fn topic_dir(&self, topic: &str) -> PathBuf {
        self.drafts_dir().join(topic)
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.root.join("topic_collections")
    }
}

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn extension_or_default(path: &Path, default: &str) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_layout_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("work");
        let workspace = Workspace::new(Some(root.clone())).unwrap();

        assert!(workspace.transcript_dir().is_dir());
        assert!(workspace.drafts_dir().is_dir());
        assert_eq!(
            workspace.transcript_path("abc123"),
            root.join("transcript").join("abc123.json")
        );
        assert_eq!(
            workspace.topic_dir("energie"),
            root.join("shorts_draft").join("energie")
        );
    }

    #[test]
    fn file_hash_is_stable_and_content_keyed() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"same content").unwrap();
        fs::write(&b, b"same content").unwrap();

        let hash_a = compute_file_hash(&a).unwrap();
        let hash_b = compute_file_hash(&b).unwrap();
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a.len(), 64);

        fs::write(&b, b"different").unwrap();
        assert_ne!(hash_a, compute_file_hash(&b).unwrap());
    }
}
