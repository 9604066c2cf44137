//! Resource-group commit service
//!
//! Diffs each new resource-group document against the last one that was
//! applied, sends the operations to the control-plane store, and only then
//! records the new document as the baseline.

use crate::core::baseline::Baseline;
use crate::core::error::Result;
use crate::core::provisioner::Provisioner;
use crate::core::store::{ControlStore, Operation};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct ResGrpService {
    baseline: Baseline,
    applied: Option<Value>,
}

impl ResGrpService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            baseline: Baseline::new(path),
            applied: None,
        }
    }

    /// The last applied document, cached after the first read.
    fn previous(&mut self) -> &Value {
        self.applied.get_or_insert_with(|| self.baseline.load())
    }

    /// Operations a commit of `new` would send, without sending them.
    pub fn plan(&mut self, new: &Value) -> Vec<Operation> {
        let old = self.previous().clone();
        Provisioner::new(&old, new).operations()
    }

    /// Applies `new` and returns the number of operations sent.
    ///
    /// On any failure the baseline is left untouched, so the next commit
    /// diffs against the same last-good document.
    pub fn commit(&mut self, new: &Value, store: &mut dyn ControlStore) -> Result<usize> {
        debug!("Commit requested");
        let old = self.previous().clone();
        let prov = Provisioner::new(&old, new);

        let count = match prov.apply(store) {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to provision resource groups: {}", e);
                return Err(e);
            }
        };

        self.baseline.save(new)?;
        self.applied = Some(new.clone());
        info!("Committed resource groups ({} operations)", count);
        Ok(count)
    }

    pub fn get_config(&self) -> Value {
        self.baseline.load()
    }

    /// Operational state; resource groups have none.
    pub fn get_state(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// The schema already covers every constraint on resource groups.
    pub fn validate(&self, proposed: &Value) -> Result<()> {
        debug!("Validate: {}", proposed);
        Ok(())
    }
}
