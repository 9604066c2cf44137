//! Provisioning differ
//!
//! Compares an old and a new configuration snapshot and emits the operations
//! that move the control plane from one to the other. Changed objects are
//! replaced (deleted, then re-created), never updated in place.
//!
//! Emission order is fixed: every deletion, then every creation, then a single
//! `qos commit` so the dataplane re-evaluates whatever references the category.

use crate::core::error::Result;
use crate::core::res_grp::RgConfig;
use crate::core::store::{ControlStore, Operation};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

pub const QOS_COMMIT: &str = "qos commit";

/// A named, structurally comparable object the differ can provision
pub trait ProvisionedObject: PartialEq {
    fn name(&self) -> &str;

    /// `(path, command)` pairs that create the object
    fn commands(&self) -> Vec<(String, String)>;

    /// `(path, command)` pair that deletes the object
    fn delete_command(&self) -> (String, String);
}

/// Delete and create sets for one object category
#[derive(Debug)]
pub struct CategoryDiff<'a, T> {
    pub delete: Vec<&'a T>,
    pub create: Vec<&'a T>,
}

impl<T> Default for CategoryDiff<'_, T> {
    fn default() -> Self {
        Self {
            delete: Vec::new(),
            create: Vec::new(),
        }
    }
}

/// Diffs one category: new objects in order, then old objects missing from new.
pub fn diff_category<'a, T: ProvisionedObject>(
    old: &'a IndexMap<String, T>,
    new: &'a IndexMap<String, T>,
) -> CategoryDiff<'a, T> {
    let mut diff = CategoryDiff::default();

    for obj in new.values() {
        match old.get(obj.name()) {
            Some(prev) if prev != obj => {
                diff.delete.push(prev);
                diff.create.push(obj);
            }
            Some(_) => {}
            None => diff.create.push(obj),
        }
    }

    for obj in old.values() {
        if !new.contains_key(obj.name()) {
            diff.delete.push(obj);
        }
    }

    diff
}

/// The computed operation list for one old/new pair
#[derive(Debug, Clone, Default)]
pub struct Provisioner {
    deletes: Vec<Operation>,
    creates: Vec<Operation>,
    commit_required: bool,
}

impl Provisioner {
    /// Parses both documents and diffs every resource-group category.
    pub fn new(old: &Value, new: &Value) -> Self {
        Self::from_configs(&RgConfig::from_value(old), &RgConfig::from_value(new))
    }

    pub fn from_configs(old: &RgConfig, new: &RgConfig) -> Self {
        let mut prov = Self {
            commit_required: !old.is_empty() || !new.is_empty(),
            ..Self::default()
        };
        prov.add_category(&diff_category(old.dscp_groups(), new.dscp_groups()));

        info!(
            "Diff: {} deletes, {} creates",
            prov.deletes.len(),
            prov.creates.len()
        );
        prov
    }

    fn add_category<T: ProvisionedObject>(&mut self, diff: &CategoryDiff<'_, T>) {
        for obj in &diff.delete {
            let (path, command) = obj.delete_command();
            self.deletes.push(Operation::delete(path, command));
        }
        for obj in &diff.create {
            for (path, command) in obj.commands() {
                self.creates.push(Operation::set(path, command));
            }
        }
    }

    /// Deletions, then creations, then the trailing commit when any object exists.
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(self.deletes.len() + self.creates.len() + 1);
        ops.extend(self.deletes.iter().cloned());
        ops.extend(self.creates.iter().cloned());
        if self.commit_required {
            ops.push(Operation::set(QOS_COMMIT, QOS_COMMIT));
        }
        ops
    }

    /// Sends every operation in order; stops at the first store failure.
    pub fn apply(&self, store: &mut dyn ControlStore) -> Result<usize> {
        let ops = self.operations();
        for op in &ops {
            store.store(op)?;
            debug!("{}", op);
        }
        Ok(ops.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{MemoryStore, Verb};
    use serde_json::json;

    fn doc(groups: &[(&str, &[&str])]) -> Value {
        let list: Vec<Value> = groups
            .iter()
            .map(|(name, dscp)| json!({ "group-name": name, "dscp": dscp }))
            .collect();
        json!({
            "vyatta-resources-v1:resources": {
                "vyatta-resources-group-misc-v1:group": {
                    "vyatta-resources-dscp-group-v1:dscp-group": list
                }
            }
        })
    }

    #[test]
    fn test_empty_both_sides() {
        let prov = Provisioner::new(&json!({}), &json!({}));
        assert!(prov.operations().is_empty());
    }

    #[test]
    fn test_unchanged_yields_commit_only() {
        let d = doc(&[("a", &["1"]), ("b", &["2"])]);
        let ops = Provisioner::new(&d, &d).operations();
        assert_eq!(ops, vec![Operation::set(QOS_COMMIT, QOS_COMMIT)]);
    }

    #[test]
    fn test_replace_deletes_before_create() {
        let old = doc(&[("group-a", &["0", "1"])]);
        let new = doc(&[("group-a", &["0", "2"])]);
        let ops = Provisioner::new(&old, &new).operations();
        assert_eq!(
            ops,
            vec![
                Operation::delete(
                    "resources group dscp-group group-a",
                    "npf-cfg delete dscp-group:group-a"
                ),
                Operation::set(
                    "resources group dscp-group group-a dscp",
                    "npf-cfg add dscp-group:group-a 0 0;2"
                ),
                Operation::set(QOS_COMMIT, QOS_COMMIT),
            ]
        );
    }

    #[test]
    fn test_out_of_range_value_still_provisions_every_group() {
        let new = doc(&[("good", &["1"]), ("bad", &["64"])]);
        let ops = Provisioner::new(&json!({}), &new).operations();
        let commands: Vec<&str> = ops.iter().map(|op| op.command.as_str()).collect();
        assert_eq!(
            commands,
            vec![
                "npf-cfg add dscp-group:good 0 1",
                "npf-cfg add dscp-group:bad 0 64",
                QOS_COMMIT,
            ]
        );
    }

    #[test]
    fn test_removed_group_deleted() {
        let old = doc(&[("a", &["1"]), ("b", &["2"])]);
        let new = doc(&[("b", &["2"])]);
        let ops = Provisioner::new(&old, &new).operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].verb, Verb::Delete);
        assert_eq!(ops[0].command, "npf-cfg delete dscp-group:a");
        assert_eq!(ops[1].command, QOS_COMMIT);
    }

    #[test]
    fn test_all_deletes_precede_all_creates() {
        let old = doc(&[("a", &["1"]), ("b", &["2"]), ("gone", &["3"])]);
        let new = doc(&[("new", &["4"]), ("b", &["5"]), ("a", &["6"])]);
        let ops = Provisioner::new(&old, &new).operations();

        let verbs: Vec<Verb> = ops.iter().map(|op| op.verb).collect();
        assert_eq!(
            verbs,
            vec![
                Verb::Delete,
                Verb::Delete,
                Verb::Delete,
                Verb::Set,
                Verb::Set,
                Verb::Set,
                Verb::Set
            ]
        );
        let deleted: Vec<&str> = ops[..3].iter().map(|op| op.path.as_str()).collect();
        assert_eq!(
            deleted,
            vec![
                "resources group dscp-group b",
                "resources group dscp-group a",
                "resources group dscp-group gone"
            ]
        );
    }

    #[test]
    fn test_apply_stops_on_failure() {
        struct FailAfter(usize, Vec<Operation>);

        impl ControlStore for FailAfter {
            fn store(&mut self, op: &Operation) -> std::result::Result<(), crate::core::error::StoreError> {
                if self.1.len() == self.0 {
                    return Err(crate::core::error::StoreError::Rejected {
                        command: op.command.clone(),
                        reply: "no".to_string(),
                    });
                }
                self.1.push(op.clone());
                Ok(())
            }
        }

        let new = doc(&[("a", &["1"]), ("b", &["2"])]);
        let prov = Provisioner::new(&json!({}), &new);

        let mut store = FailAfter(1, Vec::new());
        assert!(prov.apply(&mut store).is_err());
        assert_eq!(store.1.len(), 1);

        let mut store = MemoryStore::new();
        assert_eq!(prov.apply(&mut store).unwrap(), 3);
        assert_eq!(store.operations, prov.operations());
    }
}
