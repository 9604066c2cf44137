//! Shared test utilities for core module tests
//!
//! Builders for the namespaced configuration documents the services consume.
//! This module is only compiled in test mode.

use crate::core::gpc_config::{GPC_NAMESPACE, RES_NAMESPACE};
use crate::core::res_grp::{DSCP_GROUP_NAMESPACE, GROUP_MISC_NAMESPACE};
use serde_json::{Value, json};

/// A packet-classifier document holding `groups` and `classifiers`.
pub fn gpc_doc(groups: Vec<Value>, classifiers: Vec<Value>) -> Value {
    json!({
        RES_NAMESPACE: {
            GPC_NAMESPACE: {
                "group": groups,
                "classifier": classifiers,
            }
        }
    })
}

/// A group object; `ip_version` is omitted when `None`.
pub fn group(name: &str, ip_version: Option<&str>, rules: Vec<Value>) -> Value {
    let mut group = json!({
        "group-name": name,
        "results": ["r1", "r2"],
        "rule": rules,
    });
    if let Some(version) = ip_version {
        group["ip-version"] = json!(version);
    }
    group
}

/// A rule object with an optional match and disable flag.
pub fn rule(number: u32, result: &str, spec: Option<Value>, disabled: bool) -> Value {
    let mut rule = json!({ "number": number, "result": result });
    if let Some(spec) = spec {
        rule["match"] = spec;
    }
    if disabled {
        rule["disable"] = Value::Null;
    }
    rule
}

/// A resource-group document holding the given DSCP groups in order.
pub fn res_grp_doc(groups: &[(&str, Vec<String>)]) -> Value {
    let list: Vec<Value> = groups
        .iter()
        .map(|(name, dscp)| json!({ "group-name": name, "dscp": dscp }))
        .collect();
    json!({
        RES_NAMESPACE: {
            GROUP_MISC_NAMESPACE: {
                DSCP_GROUP_NAMESPACE: list
            }
        }
    })
}

/// `count` sequential DSCP values starting at `start`, as strings.
pub fn sequential_dscp(start: u8, count: u8) -> Vec<String> {
    (start..start + count).map(|v| v.to_string()).collect()
}
