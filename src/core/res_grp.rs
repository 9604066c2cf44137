//! Resource-group configuration
//!
//! DSCP groups are the one resource-group category provisioned today. Each
//! group keeps the configuration object it was built from, and two groups are
//! equal exactly when those objects are.

use crate::core::dscp;
use crate::core::error::{Error, Result};
use crate::core::provisioner::ProvisionedObject;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

pub const RES_NAMESPACE: &str = "vyatta-resources-v1:resources";
pub const GROUP_MISC_NAMESPACE: &str = "vyatta-resources-group-misc-v1:group";
pub const DSCP_GROUP_NAMESPACE: &str = "vyatta-resources-dscp-group-v1:dscp-group";

/// Config-tree path prefix shared by every DSCP group operation
pub const DSCP_GROUP_PATH: &str = "resources group dscp-group";

/// A named set of DSCP values
#[derive(Debug, Clone)]
pub struct DscpGroup {
    name: String,
    values: Vec<u32>,
    raw: Value,
}

impl DscpGroup {
    /// Builds a group from its `{group-name, dscp: [...]}` object.
    ///
    /// Each `dscp` entry is a code-point name or a decimal literal, which is
    /// passed through as written. Entries that are neither are dropped with a
    /// warning and the rest of the group is kept.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let name = raw
            .get("group-name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::config("dscp-group", "missing group-name"))?
            .to_string();

        let entries = match raw.get("dscp") {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(_) => {
                return Err(Error::config(
                    format!("dscp-group {name}"),
                    "dscp must be a list",
                ));
            }
            None => &[],
        };

        let values = entries
            .iter()
            .filter_map(|entry| {
                let text = match entry {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let value = dscp::parse_value(&text);
                if value.is_none() {
                    warn!("dscp-group {}: ignoring unknown DSCP value '{}'", name, text);
                }
                value
            })
            .collect();

        Ok(Self {
            name,
            values,
            raw: raw.clone(),
        })
    }

    /// Values in configured order
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Values ascending, `;`-separated
    fn value_list(&self) -> String {
        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        sorted
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl PartialEq for DscpGroup {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl ProvisionedObject for DscpGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<(String, String)> {
        vec![(
            format!("{DSCP_GROUP_PATH} {} dscp", self.name),
            format!("npf-cfg add dscp-group:{} 0 {}", self.name, self.value_list()),
        )]
    }

    fn delete_command(&self) -> (String, String) {
        (
            format!("{DSCP_GROUP_PATH} {}", self.name),
            format!("npf-cfg delete dscp-group:{}", self.name),
        )
    }
}

/// All resource-group objects of one configuration snapshot
#[derive(Debug, Clone, Default)]
pub struct RgConfig {
    dscp_groups: IndexMap<String, DscpGroup>,
}

impl RgConfig {
    /// Missing namespace wrappers yield an empty configuration. A malformed
    /// group is skipped with a warning and never hides the others.
    pub fn from_value(doc: &Value) -> Self {
        let list = doc
            .get(RES_NAMESPACE)
            .and_then(|v| v.get(GROUP_MISC_NAMESPACE))
            .and_then(|v| v.get(DSCP_GROUP_NAMESPACE))
            .and_then(Value::as_array);

        let mut dscp_groups = IndexMap::new();
        for raw in list.into_iter().flatten() {
            match DscpGroup::from_value(raw) {
                Ok(group) => {
                    dscp_groups.insert(group.name.clone(), group);
                }
                Err(e) => warn!("Skipping dscp-group: {}", e),
            }
        }

        debug!("Parsed {} dscp-groups", dscp_groups.len());
        Self { dscp_groups }
    }

    pub fn dscp_groups(&self) -> &IndexMap<String, DscpGroup> {
        &self.dscp_groups
    }

    pub fn get_dscp_group(&self, name: &str) -> Option<&DscpGroup> {
        self.dscp_groups.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.dscp_groups.is_empty()
    }
}
