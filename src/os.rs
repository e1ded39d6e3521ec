//! OS specific functionalities.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::{DeployError, DeployErrorKind};

#[cfg(unix)]
pub(crate) mod unix;

/// OS specific error wrapper.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OsError {
    /// Standard IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<OsError> for DeployError {
    fn from(value: OsError) -> Self {
        DeployError::new(DeployErrorKind::Io).with_source(value)
    }
}

/// Returns the directory portion of the current executable's path.
///
/// See also [`std::env::current_exe()`].
pub fn current_exe_dir() -> std::io::Result<PathBuf> {
    tracing::trace!("current_exe_dir");
    let mut path = std::env::current_exe()?;

    if !path.pop() {
        return Err(std::io::Error::other(DeployErrorKind::UnknownExecutablePath));
    }

    Ok(path)
}

/// Marks a file as runnable.
///
/// On Unix, the mode becomes `0o777` filtered by the process umask
/// (typically `0o755`). On other OS families this does nothing.
pub fn ensure_executable(path: &Path) -> Result<(), OsError> {
    #[cfg(unix)]
    {
        let mode = unix::get_effective_posix_permission(unix::PermissionClass::Executable);
        tracing::debug!(mode, ?path, "set POSIX permissions");
        unix::set_posix_permission(path, mode)?;
    }

    #[cfg(not(unix))]
    {
        tracing::trace!(?path, "no permissions to set on this OS family");
    }

    Ok(())
}

/// Writes `contents` to `destination` so that readers never observe a
/// partially written file.
///
/// The parent directories are created when missing. The contents go to a
/// temporary file in the same directory which is then renamed over the
/// destination, replacing any existing file.
pub fn write_atomic(destination: &Path, contents: &[u8]) -> Result<(), DeployError> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tracing::debug!(dir = ?parent, "creating directories");
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(".ariad-")
        .suffix(".part")
        .tempfile_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;

    // Temporary files are created owner-only; give the result the mode a
    // freshly created file would have.
    #[cfg(unix)]
    unix::set_posix_permission(
        temp_file.path(),
        unix::get_effective_posix_permission(unix::PermissionClass::Data),
    )?;

    tracing::trace!(temp_path = ?temp_file.path(), ?destination, "renaming into place");
    temp_file.persist(destination)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("config").join("nested").join("aria2.conf");

        write_atomic(&destination, b"dir=/tmp\n").unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"dir=/tmp\n");
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("aria2c");
        std::fs::write(&destination, b"old").unwrap();

        write_atomic(&destination, b"new").unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"new");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aria2c");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();

        ensure_executable(&path).unwrap();

        let mode = path.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o700, 0o700);
    }

    #[test]
    fn test_ensure_executable_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");

        if cfg!(unix) {
            assert!(ensure_executable(&path).is_err());
        } else {
            assert!(ensure_executable(&path).is_ok());
        }
    }
}
