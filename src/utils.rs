//! Directory helpers
//!
//! Per-user state, such as the audit log when none is configured, lives in the
//! XDG state directory (`~/.local/state/gpcc/` on Linux).

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub fn get_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("net", "vyatta", "gpcc")
        .and_then(|pd| pd.state_dir().map(Path::to_path_buf))
}

/// Creates the parent directory of `path` with owner-only permissions.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        DirBuilder::new().mode(0o700).recursive(true).create(dir)
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a").join("b").join("audit.log");
        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
        ensure_parent_dir(Path::new("bare.log")).unwrap();
    }
}
