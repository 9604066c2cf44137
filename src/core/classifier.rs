//! Group and classifier compiler
//!
//! Groups and classifiers share one shape: a name, a traffic type and an
//! ordered rule list. Each compiles to exactly one [`RulesetMessage`].

use crate::core::error::Result;
use crate::core::rule::{self, RuleConfig};
use crate::core::ruleset::{RulesetMessage, TrafficType};
use crate::core::wire;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A `group` list entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupConfig {
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

/// A `classifier` list entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassifierConfig {
    pub classifier_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub traffic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ClassifierKind {
    Group,
    Classifier,
}

/// A compiled group or classifier
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    kind: ClassifierKind,
    name: String,
    message: RulesetMessage,
}

impl Classifier {
    /// Compiles the enabled rules in their configured order.
    pub fn compile(
        kind: ClassifierKind,
        name: &str,
        traffic_type: TrafficType,
        rules: &[RuleConfig],
    ) -> Result<Self> {
        let mut message = RulesetMessage::new(traffic_type);

        for rule in rules {
            if rule.disable {
                debug!("{} {}: skipping disabled rule {}", kind, name, rule.number);
                continue;
            }
            rule::compile_rule(rule, &mut message)?;
        }

        Ok(Self {
            kind,
            name: name.to_string(),
            message,
        })
    }

    pub fn from_group(config: &GroupConfig) -> Result<Self> {
        Self::compile(
            ClassifierKind::Group,
            &config.group_name,
            TrafficType::from_config(config.ip_version.as_deref()),
            &config.rule,
        )
    }

    pub fn from_classifier(config: &ClassifierConfig) -> Result<Self> {
        Self::compile(
            ClassifierKind::Classifier,
            &config.classifier_name,
            TrafficType::from_config(config.traffic_type.as_deref()),
            &config.rule,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    pub fn message(&self) -> &RulesetMessage {
        &self.message
    }

    /// Binary ruleset; identical input always yields identical bytes.
    pub fn serialize(&self) -> Bytes {
        debug!("{} {} message:\n{}", self.kind, self.name, self.message);
        wire::encode(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(value: Value) -> GroupConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let cfg = group(json!({
            "group-name": "g1",
            "ip-version": "ipv4",
            "results": ["a", "b"],
            "rule": [
                { "number": 1, "result": "a" },
                { "number": 2, "result": "b", "disable": null },
                { "number": 3, "result": "a" },
            ]
        }));
        let compiled = Classifier::from_group(&cfg).unwrap();
        let numbers: Vec<u32> = compiled.message().rules.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_rule_order_preserved() {
        let cfg = group(json!({
            "group-name": "g1",
            "rule": [
                { "number": 30, "result": "x" },
                { "number": 10, "result": "y" },
            ]
        }));
        let compiled = Classifier::from_group(&cfg).unwrap();
        let numbers: Vec<u32> = compiled.message().rules.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![30, 10]);
    }

    #[test]
    fn test_traffic_type_fields() {
        let g = group(json!({ "group-name": "g", "ip-version": "ipv4" }));
        assert_eq!(
            Classifier::from_group(&g).unwrap().message().traffic_type,
            TrafficType::Ipv4
        );

        let g = group(json!({ "group-name": "g" }));
        assert_eq!(
            Classifier::from_group(&g).unwrap().message().traffic_type,
            TrafficType::Ipv6
        );

        let c: ClassifierConfig =
            serde_json::from_value(json!({ "classifier-name": "c", "type": "ipv4" })).unwrap();
        let compiled = Classifier::from_classifier(&c).unwrap();
        assert_eq!(compiled.kind(), ClassifierKind::Classifier);
        assert_eq!(compiled.message().traffic_type, TrafficType::Ipv4);
    }

    #[test]
    fn test_serialize_deterministic() {
        let cfg = group(json!({
            "group-name": "g1",
            "ip-version": "ipv4",
            "rule": [{
                "number": 1,
                "result": "mark",
                "match": {
                    "ttl": { "equals": 3 },
                    "dscp": { "name": "af11" },
                    "source": { "ipv4": { "host": "192.0.2.1" } }
                }
            }]
        }));
        let a = Classifier::from_group(&cfg).unwrap().serialize();
        let b = Classifier::from_group(&cfg).unwrap().serialize();
        assert_eq!(a, b);
        assert_eq!(wire::decode(&a).unwrap(), *Classifier::from_group(&cfg).unwrap().message());
    }
}
