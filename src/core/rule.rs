//! Rule compiler
//!
//! Turns one configured rule into a [`RuleMessage`] appended to the owning
//! classifier's [`RulesetMessage`].

use crate::core::error::Result;
use crate::core::matches;
use crate::core::ruleset::RulesetMessage;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One rule as it appears in a group or classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub number: u32,
    #[serde(default)]
    pub result: String,
    /// Presence flag: any value, `null` included, disables the rule
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub disable: bool,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_spec: Option<Map<String, Value>>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer).map(|_| true)
}

impl RuleConfig {
    pub fn new(number: u32, result: impl Into<String>) -> Self {
        Self {
            number,
            result: result.into(),
            ..Self::default()
        }
    }

    pub fn with_match(mut self, spec: Value) -> Self {
        if let Value::Object(map) = spec {
            self.match_spec = Some(map);
        }
        self
    }
}

/// Appends the compiled form of `rule` to `message`.
///
/// The match object is parsed in full before anything is appended, so a
/// structural error leaves `message` untouched.
pub fn compile_rule(rule: &RuleConfig, message: &mut RulesetMessage) -> Result<()> {
    let context = format!("rule {}", rule.number);
    let predicates = match &rule.match_spec {
        Some(spec) => matches::parse_match(spec, &context)?,
        None => Vec::new(),
    };

    let compiled = message.add_rule(rule.number, rule.result.as_str());
    for predicate in &predicates {
        predicate.compile_into(&mut compiled.matches);
    }

    debug!(
        "Compiled rule {} ({} match entries)",
        rule.number,
        compiled.matches.len()
    );
    Ok(())
}
