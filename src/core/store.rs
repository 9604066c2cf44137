//! Provisioning operations and the stores that receive them

use crate::core::error::StoreError;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use tracing::debug;

/// Scope every provisioning operation is sent with
pub const SCOPE_ALL: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verb {
    Set,
    Delete,
}

/// One unit of work for the control-plane store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub path: String,
    pub command: String,
    pub scope: String,
    pub verb: Verb,
}

impl Operation {
    pub fn set(path: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            command: command.into(),
            scope: SCOPE_ALL.to_string(),
            verb: Verb::Set,
        }
    }

    pub fn delete(path: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            command: command.into(),
            scope: SCOPE_ALL.to_string(),
            verb: Verb::Delete,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} => {}",
            self.verb, self.scope, self.path, self.command
        )
    }
}

/// Receiver of provisioning operations
pub trait ControlStore {
    fn store(&mut self, op: &Operation) -> Result<(), StoreError>;
}

/// Records operations in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub operations: Vec<Operation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlStore for MemoryStore {
    fn store(&mut self, op: &Operation) -> Result<(), StoreError> {
        self.operations.push(op.clone());
        Ok(())
    }
}

/// Controller connection over a Unix socket
///
/// Each operation is sent as one JSON line; the controller answers with a
/// line reading `ok`, anything else is a rejection.
#[derive(Debug)]
pub struct SocketStore {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl SocketStore {
    pub fn connect(path: &Path) -> Result<Self, StoreError> {
        let unreachable = |source| StoreError::Unreachable {
            path: path.display().to_string(),
            source,
        };
        let writer = UnixStream::connect(path).map_err(unreachable)?;
        let reader = BufReader::new(writer.try_clone().map_err(unreachable)?);
        debug!("Connected to controller at {}", path.display());

        Ok(Self { reader, writer })
    }
}

impl ControlStore for SocketStore {
    fn store(&mut self, op: &Operation) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(op).map_err(std::io::Error::other)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "controller closed the connection",
            )));
        }

        let reply = reply.trim();
        if reply == "ok" {
            debug!("{}", op);
            Ok(())
        } else {
            Err(StoreError::Rejected {
                command: op.command.clone(),
                reply: reply.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::thread;

    #[test]
    fn test_operation_json_shape() {
        let op = Operation::set("qos commit", "qos commit");
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "path": "qos commit",
                "command": "qos commit",
                "scope": "ALL",
                "verb": "SET"
            })
        );
        assert_eq!(Verb::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_memory_store_records() {
        let mut store = MemoryStore::new();
        store.store(&Operation::delete("p", "c")).unwrap();
        assert_eq!(store.operations, vec![Operation::delete("p", "c")]);
    }

    #[test]
    fn test_socket_store_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SocketStore::connect(&dir.path().join("missing.sock")).unwrap_err();
        assert!(matches!(err, StoreError::Unreachable { .. }));
    }

    #[test]
    fn test_socket_store_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctrl.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let controller = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut received = Vec::new();
            for reply in ["ok", "busy"] {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                received.push(serde_json::from_str::<Operation>(&line).unwrap());
                writeln!(writer, "{reply}").unwrap();
            }
            received
        });

        let mut store = SocketStore::connect(&path).unwrap();
        store.store(&Operation::set("a", "b")).unwrap();
        let err = store.store(&Operation::delete("c", "d")).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { ref reply, .. } if reply == "busy"));

        let received = controller.join().unwrap();
        assert_eq!(
            received,
            vec![Operation::set("a", "b"), Operation::delete("c", "d")]
        );
    }
}
