//! Packet-classifier configuration model
//!
//! Builds every group and classifier of one configuration document and
//! remembers which of them already existed in the previous document.

use crate::core::classifier::{Classifier, ClassifierConfig, GroupConfig};
use crate::core::error::Result;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

pub const RES_NAMESPACE: &str = "vyatta-resources-v1:resources";
pub const GPC_NAMESPACE: &str = "vyatta-resources-packet-classifier-v1:packet-classifier";

/// The packet-classifier container of `doc`, if every wrapper is present.
fn gpc_container(doc: &Value) -> Option<&Value> {
    doc.get(RES_NAMESPACE)?.get(GPC_NAMESPACE)
}

/// Deserializes one list of the packet-classifier container; absent lists are empty.
fn entries<T: DeserializeOwned>(doc: Option<&Value>, list: &str) -> Result<Vec<T>> {
    match doc.and_then(gpc_container).and_then(|c| c.get(list)) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(Vec::new()),
    }
}

/// Group and classifier names present in `doc`, in document order.
pub fn names_in(doc: Option<&Value>) -> Vec<String> {
    let Some(container) = doc.and_then(gpc_container) else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for (list, key) in [("group", "group-name"), ("classifier", "classifier-name")] {
        if let Some(Value::Array(items)) = container.get(list) {
            names.extend(
                items
                    .iter()
                    .filter_map(|item| item.get(key).and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
    }
    names
}

/// Compiled view of one packet-classifier configuration snapshot
#[derive(Debug, Clone, Default)]
pub struct GpcConfig {
    groups: IndexMap<String, Classifier>,
    classifiers: IndexMap<String, Classifier>,
    modified: Vec<String>,
}

impl GpcConfig {
    /// Compiles `new`; `old` only feeds the modified-name list.
    pub fn build(new: &Value, old: Option<&Value>) -> Result<Self> {
        let mut groups = IndexMap::new();
        for cfg in entries::<GroupConfig>(Some(new), "group")? {
            let compiled = Classifier::from_group(&cfg)?;
            groups.insert(compiled.name().to_string(), compiled);
        }

        let mut classifiers = IndexMap::new();
        for cfg in entries::<ClassifierConfig>(Some(new), "classifier")? {
            let compiled = Classifier::from_classifier(&cfg)?;
            classifiers.insert(compiled.name().to_string(), compiled);
        }

        let previous = names_in(old);
        let modified: Vec<String> = groups
            .keys()
            .chain(classifiers.keys())
            .filter(|name| previous.contains(name))
            .cloned()
            .collect();

        info!(
            "Built GPC config: {} groups, {} classifiers, {} modified",
            groups.len(),
            classifiers.len(),
            modified.len()
        );
        debug!("Modified: {:?}", modified);

        Ok(Self {
            groups,
            classifiers,
            modified,
        })
    }

    /// A group by name, else a classifier by name.
    pub fn get(&self, name: &str) -> Option<&Classifier> {
        self.groups.get(name).or_else(|| self.classifiers.get(name))
    }

    /// Names compiled from this snapshot that also existed in the previous one.
    pub fn modified(&self) -> &[String] {
        &self.modified
    }

    pub fn groups(&self) -> impl Iterator<Item = &Classifier> {
        self.groups.values()
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &Classifier> {
        self.classifiers.values()
    }

    /// Every group then every classifier, in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Classifier> {
        self.groups().chain(self.classifiers())
    }

    pub fn len(&self) -> usize {
        self.groups.len() + self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::ClassifierKind;
    use serde_json::json;

    fn doc(groups: Value, classifiers: Value) -> Value {
        json!({
            RES_NAMESPACE: {
                GPC_NAMESPACE: {
                    "group": groups,
                    "classifier": classifiers,
                }
            }
        })
    }

    #[test]
    fn test_missing_wrappers_yield_empty() {
        for value in [
            json!({}),
            json!({ RES_NAMESPACE: {} }),
            json!({ RES_NAMESPACE: { GPC_NAMESPACE: {} } }),
        ] {
            let cfg = GpcConfig::build(&value, None).unwrap();
            assert!(cfg.is_empty());
            assert!(cfg.modified().is_empty());
        }
    }

    #[test]
    fn test_get_prefers_group() {
        let value = doc(
            json!([{ "group-name": "shared", "ip-version": "ipv4" }]),
            json!([{ "classifier-name": "shared" }, { "classifier-name": "c1" }]),
        );
        let cfg = GpcConfig::build(&value, None).unwrap();
        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.get("shared").unwrap().kind(), ClassifierKind::Group);
        assert_eq!(cfg.get("c1").unwrap().kind(), ClassifierKind::Classifier);
        assert!(cfg.get("nope").is_none());
    }

    #[test]
    fn test_modified_names() {
        let old = doc(json!([{ "group-name": "g1" }, { "group-name": "g2" }]), json!([]));
        let new = doc(
            json!([{ "group-name": "g2" }, { "group-name": "g3" }]),
            json!([{ "classifier-name": "g1" }]),
        );
        let cfg = GpcConfig::build(&new, Some(&old)).unwrap();
        assert_eq!(cfg.modified(), ["g2".to_string(), "g1".to_string()]);
    }

    #[test]
    fn test_names_in() {
        let value = doc(json!([{ "group-name": "a" }]), json!([{ "classifier-name": "b" }]));
        assert_eq!(names_in(Some(&value)), vec!["a", "b"]);
        assert!(names_in(None).is_empty());
    }
}
