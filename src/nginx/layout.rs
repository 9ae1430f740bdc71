//! On-disk layout of the nginx install prefix.

use std::path::{Path, PathBuf};

/// Marker file dropped into the challenge directory.
pub const CHALLENGE_SENTINEL: &str = "THIS_FOLDER_IS_PUBLIC.txt";

/// Paths of a self-contained nginx build.
///
/// ```text
/// <prefix>/
///   sbin/nginx
///   conf/nginx.conf
///   logs/nginx.pid
///   certbot_challenges/THIS_FOLDER_IS_PUBLIC.txt
///   src/{nginx,pcre2,zlib}/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxLayout {
    prefix: PathBuf,
}

impl NginxLayout {
    /// Layout rooted at `prefix`. Should be absolute, since it is baked
    /// into the nginx binary at configure time.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn src_dir(&self) -> PathBuf {
        self.prefix.join("src")
    }

    /// Unpacked source tree of an upstream archive.
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.src_dir().join(name)
    }

    pub fn binary(&self) -> PathBuf {
        self.prefix.join("sbin").join("nginx")
    }

    pub fn conf_file(&self) -> PathBuf {
        self.prefix.join("conf").join("nginx.conf")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.prefix.join("logs").join("nginx.pid")
    }

    /// Webroot handed to certbot; served on port 80 for challenge requests.
    pub fn challenge_dir(&self) -> PathBuf {
        self.prefix.join("certbot_challenges")
    }

    /// The prefix can exist without a build (the challenge webroot is
    /// created on its own by `--certify`), so the installed binary decides.
    pub fn is_built(&self) -> bool {
        self.binary().is_file()
    }
}
