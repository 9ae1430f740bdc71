//! Directory helpers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Delete `path` recursively if it exists, then recreate it (with parents).
///
/// Safe to call repeatedly; the directory is always empty afterwards.
pub fn ensure_empty_directory(path: &Path) -> DeployResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path).map_err(|e| DeployError::filesystem(path, e))?;
        }
        Ok(_) => {
            fs::remove_file(path).map_err(|e| DeployError::filesystem(path, e))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(DeployError::filesystem(path, e)),
    }

    fs::create_dir_all(path).map_err(|e| DeployError::filesystem(path, e))?;
    debug!(path = %path.display(), "Directory emptied");
    Ok(())
}

/// Canonical absolute form of `path`, with symlinks and `.`/`..` resolved.
///
/// The path must exist.
pub fn resolve_absolute_path(path: &Path) -> DeployResult<PathBuf> {
    fs::canonicalize(path).map_err(|e| DeployError::filesystem(path, e))
}

/// Anchor a possibly relative path at the current directory, without
/// requiring it to exist.
pub fn absolute_path(path: &Path) -> DeployResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| DeployError::filesystem(path, e))?;
    Ok(cwd.join(path.strip_prefix(".").unwrap_or(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_missing_directory_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        ensure_empty_directory(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_clears_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("prefix");
        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("nested/file.txt"), "stale").unwrap();

        ensure_empty_directory(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("twice");
        ensure_empty_directory(&target).unwrap();
        ensure_empty_directory(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_replaces_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("was-a-file");
        fs::write(&target, "x").unwrap();
        ensure_empty_directory(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_resolve_absolute_path_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("site/root")).unwrap();
        let messy = dir.path().join("site/./root/../root");

        let resolved = resolve_absolute_path(&messy).unwrap();

        assert!(resolved.is_absolute());
        assert_eq!(
            resolved,
            fs::canonicalize(dir.path()).unwrap().join("site/root")
        );
    }

    #[test]
    fn test_absolute_path_without_existing_target() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            absolute_path(Path::new("./nginx")).unwrap(),
            cwd.join("nginx")
        );
        assert_eq!(
            absolute_path(Path::new("/opt/nginx")).unwrap(),
            PathBuf::from("/opt/nginx")
        );
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_absolute_path(&dir.path().join("missing"));
        assert!(matches!(result, Err(DeployError::Filesystem { .. })));
    }
}
