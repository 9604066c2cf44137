use thiserror::Error;

/// Core error types for the classifier compiler and provisioner
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration has the wrong structural shape
    #[error("Config error in {context}: {message}")]
    Config { context: String, message: String },

    /// Provisioning store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Baseline snapshot operation failed
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Binary ruleset could not be decoded
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),
}

impl Error {
    /// Shorthand for a structural configuration error.
    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the external store could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unreachable { .. }))
    }
}

/// Errors from the external provisioning store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("controller unreachable at {path}: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("controller rejected '{command}': {reply}")]
    Rejected { command: String, reply: String },

    #[error("controller I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Baseline snapshot errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Snapshot corrupted: root is not a JSON object")]
    NotAnObject,
}

/// Binary ruleset decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("malformed message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("invalid {what} value {value}")]
    InvalidValue { what: &'static str, value: i64 },

    #[error("match entry carries no predicate")]
    EmptyMatch,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = Error::config("rule 10", "bad prefix");
        assert_eq!(err.to_string(), "Config error in rule 10: bad prefix");
    }

    #[test]
    fn test_unreachable_detection() {
        let err: Error = StoreError::Unreachable {
            path: "/run/x.sock".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(err.is_unreachable());

        let err: Error = StoreError::Rejected {
            command: "qos commit".to_string(),
            reply: "error".to_string(),
        }
        .into();
        assert!(!err.is_unreachable());
        assert!(err.to_string().contains("qos commit"));
    }
}
