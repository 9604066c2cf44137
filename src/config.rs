use crate::utils::get_state_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Service configuration: file locations and socket paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Last applied resource-group document
    #[serde(default = "default_res_grp_config_file")]
    pub res_grp_config_file: PathBuf,
    /// Last set packet-classifier document
    #[serde(default = "default_gpc_config_file")]
    pub gpc_config_file: PathBuf,
    /// Socket the rule fetch server listens on
    #[serde(default = "default_fetch_socket")]
    pub fetch_socket: PathBuf,
    /// Control-plane store socket
    #[serde(default = "default_controller_socket")]
    pub controller_socket: PathBuf,
    /// Audit log location; defaults to `audit.log` in the XDG state directory
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            res_grp_config_file: default_res_grp_config_file(),
            gpc_config_file: default_gpc_config_file(),
            fetch_socket: default_fetch_socket(),
            controller_socket: default_controller_socket(),
            audit_log: None,
        }
    }
}

fn default_res_grp_config_file() -> PathBuf {
    PathBuf::from("/etc/vyatta/res-grp.json")
}

fn default_gpc_config_file() -> PathBuf {
    PathBuf::from("/etc/vyatta/resources-gpc.json")
}

fn default_fetch_socket() -> PathBuf {
    PathBuf::from("/tmp/gpc_update.socket")
}

fn default_controller_socket() -> PathBuf {
    PathBuf::from("/run/vplane/cstore.socket")
}

impl AppConfig {
    /// Audit log path, falling back to the XDG state directory.
    pub fn audit_log_path(&self) -> Option<PathBuf> {
        self.audit_log
            .clone()
            .or_else(|| get_state_dir().map(|dir| dir.join("audit.log")))
    }
}

/// Loads the config from `path`, or returns defaults.
///
/// A missing or undecodable file is not an error: defaults are used and a
/// warning is logged.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let Some(path) = path else {
        return AppConfig::default();
    };

    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                AppConfig::default()
            }
        },
        Err(e) => {
            warn!("Cannot read config {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.res_grp_config_file,
            PathBuf::from("/etc/vyatta/res-grp.json")
        );
        assert_eq!(
            config.gpc_config_file,
            PathBuf::from("/etc/vyatta/resources-gpc.json")
        );
        assert_eq!(config.fetch_socket, PathBuf::from("/tmp/gpc_update.socket"));
        assert!(config.audit_log.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpcc.json");
        std::fs::write(&path, r#"{ "fetch_socket": "/run/gpc.sock" }"#).unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.fetch_socket, PathBuf::from("/run/gpc.sock"));
        assert_eq!(
            config.controller_socket,
            AppConfig::default().controller_socket
        );
    }

    #[test]
    fn test_missing_or_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_config(Some(&dir.path().join("missing.json"))),
            AppConfig::default()
        );

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_config(Some(&path)), AppConfig::default());
        assert_eq!(load_config(None), AppConfig::default());
    }

    #[test]
    fn test_explicit_audit_log() {
        let config = AppConfig {
            audit_log: Some(PathBuf::from("/var/log/gpcc.log")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.audit_log_path(),
            Some(PathBuf::from("/var/log/gpcc.log"))
        );
    }
}
