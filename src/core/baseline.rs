//! Persisted configuration baseline
//!
//! The last successfully applied configuration document, used as the "old"
//! side of the next diff. Saves are atomic (temp file in the same directory,
//! then rename) and leave a `.sha256` sidecar next to the document.

use crate::core::error::{Result, SnapshotError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Hex-encoded SHA-256 of `data`
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn empty_document() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone)]
pub struct Baseline {
    path: PathBuf,
}

impl Baseline {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checksum_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".sha256");
        PathBuf::from(name)
    }

    /// Loads the saved document.
    ///
    /// Never fails: a missing file is `{}`, and an unreadable or undecodable
    /// file is `{}` with an error logged. A checksum mismatch only warns.
    pub fn load(&self) -> Value {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No baseline at {}", self.path.display());
                return empty_document();
            }
            Err(e) => {
                error!("Failed to read baseline {}: {}", self.path.display(), e);
                return empty_document();
            }
        };

        if let Ok(expected) = std::fs::read_to_string(self.checksum_path()) {
            let actual = checksum(content.as_bytes());
            if expected.trim() != actual {
                warn!(
                    "{}: {}",
                    self.path.display(),
                    SnapshotError::ChecksumMismatch {
                        expected: expected.trim().to_string(),
                        actual,
                    }
                );
            }
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(doc) if doc.is_object() => doc,
            Ok(_) => {
                error!("{}: {}", self.path.display(), SnapshotError::NotAnObject);
                empty_document()
            }
            Err(e) => {
                error!(
                    "Failed to decode JSON config file {}: {}",
                    self.path.display(),
                    e
                );
                empty_document()
            }
        }
    }

    /// Atomically replaces the saved document.
    pub fn save(&self, doc: &Value) -> Result<()> {
        if !doc.is_object() {
            return Err(SnapshotError::NotAnObject.into());
        }

        let json = serde_json::to_string_pretty(doc)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        std::fs::write(self.checksum_path(), checksum(json.as_bytes()))?;

        info!("Saved baseline to {}", self.path.display());
        Ok(())
    }
}
