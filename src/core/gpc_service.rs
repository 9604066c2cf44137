//! Packet-classifier service
//!
//! Holds the current packet-classifier document and its compiled model, and
//! answers ruleset lookups by group or classifier name.

use crate::core::baseline::Baseline;
use crate::core::classifier::Classifier;
use crate::core::error::Result;
use crate::core::gpc_config::GpcConfig;
use bytes::Bytes;
use serde_json::Value;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

fn is_empty_document(doc: &Value) -> bool {
    doc.as_object().is_none_or(serde_json::Map::is_empty)
}

#[derive(Debug)]
pub struct GpcService {
    baseline: Baseline,
    current: Option<Value>,
    compiled: Option<GpcConfig>,
    loaded_mtime: Option<SystemTime>,
}

impl GpcService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            baseline: Baseline::new(path),
            current: None,
            compiled: None,
            loaded_mtime: None,
        }
    }

    /// Creates the service and compiles the persisted document, if any.
    pub fn start(path: impl Into<PathBuf>) -> Self {
        let mut service = Self::new(path);
        service.reload(None);
        service
    }

    fn file_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(self.baseline.path())
            .and_then(|m| m.modified())
            .ok()
    }

    /// Recompiles from disk, diffing names against `previous`.
    fn reload(&mut self, previous: Option<&Value>) {
        self.loaded_mtime = self.file_mtime();
        let doc = self.baseline.load();

        match GpcConfig::build(&doc, previous) {
            Ok(compiled) => {
                info!(
                    "Loaded {} groups/classifiers from {}",
                    compiled.len(),
                    self.baseline.path().display()
                );
                self.compiled = Some(compiled);
            }
            Err(e) => error!(
                "Failed to compile {}: {}",
                self.baseline.path().display(),
                e
            ),
        }
        self.current = Some(doc);
    }

    /// Reloads the persisted document when another process has replaced it.
    pub fn reload_if_changed(&mut self) {
        let mtime = self.file_mtime();
        if mtime.is_some() && mtime != self.loaded_mtime {
            debug!("{} changed on disk", self.baseline.path().display());
            let previous = self.current.take();
            self.reload(previous.as_ref());
        }
    }

    /// Applies a new document.
    ///
    /// The document becomes current even when it fails to compile; the
    /// previous compiled model then stays in place and nothing is persisted.
    pub fn set(&mut self, new: Value) -> Result<()> {
        debug!("Config set: {}", new);
        let old = match self.current.take() {
            Some(doc) if !is_empty_document(&doc) => doc,
            _ => self.baseline.load(),
        };

        let result = GpcConfig::build(&new, Some(&old)).and_then(|compiled| {
            self.baseline.save(&new)?;
            Ok(compiled)
        });
        self.current = Some(new);

        match result {
            Ok(compiled) => {
                if !compiled.modified().is_empty() {
                    info!("Modified: {}", compiled.modified().join(", "));
                }
                self.compiled = Some(compiled);
                self.loaded_mtime = self.file_mtime();
                Ok(())
            }
            Err(e) => {
                error!("Failed to apply packet-classifier config: {}", e);
                Err(e)
            }
        }
    }

    /// The current document, loaded from disk on first use.
    pub fn get(&mut self) -> &Value {
        if self.current.as_ref().is_none_or(is_empty_document) {
            self.current = Some(self.baseline.load());
        }
        self.current.get_or_insert_with(|| Value::Object(serde_json::Map::new()))
    }

    /// Business checks beyond the schema; there are none.
    pub fn check(&self, proposed: &Value) -> Result<()> {
        debug!("Config check: {}", proposed);
        Ok(())
    }

    pub fn compiled(&self) -> Option<&GpcConfig> {
        self.compiled.as_ref()
    }

    /// Serialized ruleset for `name`: a group first, then a classifier.
    pub fn lookup(&mut self, name: &str) -> Option<Bytes> {
        self.reload_if_changed();

        let Some(compiled) = self.compiled.as_ref() else {
            warn!("Lookup of '{}' before any config was compiled", name);
            return None;
        };
        compiled.get(name).map(Classifier::serialize)
    }
}
