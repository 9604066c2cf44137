//! Classifier compiler and provisioning core
//!
//! - [`protocols`], [`dscp`], [`icmp`]: name tables used while compiling matches
//! - [`matches`], [`rule`], [`classifier`]: configuration to [`ruleset`] messages
//! - [`wire`]: binary encoding of compiled rulesets
//! - [`gpc_config`], [`gpc_service`]: packet-classifier snapshots and lookups
//! - [`res_grp`], [`provisioner`], [`store`], [`res_grp_service`]: resource-group
//!   diffing and provisioning
//! - [`baseline`]: persisted last-applied documents
//! - [`error`]: error types

pub mod baseline;
pub mod classifier;
pub mod dscp;
pub mod error;
pub mod gpc_config;
pub mod gpc_service;
pub mod icmp;
pub mod matches;
pub mod protocols;
pub mod provisioner;
pub mod res_grp;
pub mod res_grp_service;
pub mod rule;
pub mod ruleset;
pub mod store;
pub mod wire;

#[cfg(test)]
pub mod test_helpers;
