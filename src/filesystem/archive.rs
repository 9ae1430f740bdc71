//! Gzip tarball extraction.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use crate::error::{DeployError, DeployResult};

/// Extract a `.tar.gz` whose content sits under a single top-level entry
/// (e.g. `nginx-1.21.6/`) so that `target_dir` holds that content directly.
///
/// Any previous `target_dir` is removed.
pub fn extract_tarball(archive_path: &Path, target_dir: &Path) -> DeployResult<()> {
    info!(
        archive = %archive_path.display(),
        target = %target_dir.display(),
        "Extracting archive"
    );

    let extract_err = |message: String| DeployError::Extract {
        archive: archive_path.to_path_buf(),
        message,
    };

    let top_level = top_level_entry(archive_path)?;

    let staging = sibling_with_suffix(target_dir, "-tmp");
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| DeployError::filesystem(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| DeployError::filesystem(&staging, e))?;

    let file = File::open(archive_path).map_err(|e| extract_err(e.to_string()))?;
    Archive::new(GzDecoder::new(file))
        .unpack(&staging)
        .map_err(|e| extract_err(e.to_string()))?;

    let extracted = staging.join(&top_level);
    if !extracted.exists() {
        return Err(extract_err(format!(
            "top-level entry '{}' missing after extraction",
            top_level.display()
        )));
    }

    if target_dir.exists() {
        fs::remove_dir_all(target_dir).map_err(|e| DeployError::filesystem(target_dir, e))?;
    }
    fs::rename(&extracted, target_dir).map_err(|e| DeployError::filesystem(target_dir, e))?;
    fs::remove_dir_all(&staging).map_err(|e| DeployError::filesystem(&staging, e))?;

    Ok(())
}

/// First path component of the first entry in the archive.
fn top_level_entry(archive_path: &Path) -> DeployResult<PathBuf> {
    let extract_err = |message: String| DeployError::Extract {
        archive: archive_path.to_path_buf(),
        message,
    };

    let file = File::open(archive_path).map_err(|e| extract_err(e.to_string()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut entries = archive.entries().map_err(|e| extract_err(e.to_string()))?;

    let entry = match entries.next() {
        Some(entry) => entry.map_err(|e| extract_err(e.to_string()))?,
        None => return Err(extract_err("archive is empty".to_string())),
    };
    let path = entry.path().map_err(|e| extract_err(e.to_string()))?;

    path.components()
        .find_map(|c| match c {
            Component::Normal(name) => Some(PathBuf::from(name)),
            _ => None,
        })
        .ok_or_else(|| extract_err(format!("unusable entry name '{}'", path.display())))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("extract"));
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_tarball(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_flattens_single_top_level_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("foo.tar.gz");
        write_tarball(
            &archive,
            &[
                ("foo-1.2.3/README", "hello"),
                ("foo-1.2.3/src/main.c", "int main;"),
            ],
        );
        let target = dir.path().join("bar");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("old.txt"), "stale").unwrap();

        extract_tarball(&archive, &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("README")).unwrap(), "hello");
        assert!(target.join("src/main.c").is_file());
        assert!(!target.join("foo-1.2.3").exists());
        assert!(!target.join("old.txt").exists());
        assert!(!dir.path().join("bar-tmp").exists());
    }

    #[test]
    fn test_empty_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.tar.gz");
        write_tarball(&archive, &[]);

        let result = extract_tarball(&archive, &dir.path().join("out"));
        assert!(matches!(result, Err(DeployError::Extract { .. })));
    }

    #[test]
    fn test_malformed_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("junk.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let result = extract_tarball(&archive, &dir.path().join("out"));
        assert!(matches!(result, Err(DeployError::Extract { .. })));
    }

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/a/src/zlib"), "-tmp"),
            PathBuf::from("/a/src/zlib-tmp")
        );
    }
}
