//! GPC compiler
//!
//! Compiles packet-classifier groups and classifiers into binary rulesets, and
//! provisions resource groups by diffing configuration snapshots.
//!
//! # Architecture
//!
//! - [`core`] - Rule compilation, wire encoding, configuration models and the differ
//! - [`server`] - Unix-socket rule fetch server
//! - [`audit`] - Audit logging for configuration changes
//! - [`config`] - Service configuration
//! - [`utils`] - Utility functions (XDG directories, etc.)

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use core::classifier::Classifier;
pub use core::error::{Error, Result};
pub use core::provisioner::Provisioner;
pub use core::ruleset::RulesetMessage;
