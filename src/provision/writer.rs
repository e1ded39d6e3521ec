use std::path::Path;

use crate::error::{format_error, AddDeployContext, DeployError};

/// What [`ensure_config()`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    /// The file was present and left untouched.
    AlreadyExists,
    /// The file was absent and has been written.
    Created,
    /// The file was present and has been replaced.
    Replaced,
}

/// Writes `payload` to `path` unless a file is already there.
///
/// With `overwrite`, an existing file is removed and written again. A
/// failed removal is only a warning because the atomic write replaces the
/// file anyway.
pub fn ensure_config(
    path: &Path,
    payload: &[u8],
    overwrite: bool,
) -> Result<ConfigStatus, DeployError> {
    let exists = path.exists();

    if exists && !overwrite {
        tracing::warn!(?path, "configuration file already exists");
        return Ok(ConfigStatus::AlreadyExists);
    }

    if exists {
        tracing::info!(?path, "removing configuration file");

        if let Err(error) = std::fs::remove_file(path) {
            tracing::warn!(?path, error = %format_error(error), "could not remove configuration file");
        }
    }

    crate::os::write_atomic(path, payload)
        .deploy_contextc(|| format!("could not write configuration file {path:?}"))?;

    tracing::info!(?path, "configuration file written");

    if exists {
        Ok(ConfigStatus::Replaced)
    } else {
        Ok(ConfigStatus::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_missing_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("aria2.conf");

        let status = ensure_config(&path, b"dir=/tmp\n", false).unwrap();

        assert_eq!(status, ConfigStatus::Created);
        assert_eq!(std::fs::read(&path).unwrap(), b"dir=/tmp\n");
    }

    #[test]
    fn test_never_overwrites_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aria2.conf");
        std::fs::write(&path, b"rpc-listen-port=7000\n").unwrap();

        let status = ensure_config(&path, b"rpc-listen-port=6800\n", false).unwrap();

        assert_eq!(status, ConfigStatus::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"rpc-listen-port=7000\n");
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aria2.conf");
        std::fs::write(&path, b"rpc-listen-port=7000\n").unwrap();

        let status = ensure_config(&path, b"rpc-listen-port=6800\n", true).unwrap();

        assert_eq!(status, ConfigStatus::Replaced);
        assert_eq!(std::fs::read(&path).unwrap(), b"rpc-listen-port=6800\n");
    }
}
