//! Building nginx from source into the install prefix.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use tracing::{info, warn};

use super::layout::{NginxLayout, CHALLENGE_SENTINEL};
use super::manager::NginxManager;
use crate::config::{BuildConfig, SERVER_SOURCE};
use crate::error::{DeployError, DeployResult};
use crate::executor::SubprocessBuilder;
use crate::filesystem::{ensure_empty_directory, extract_tarball};

/// Arguments for nginx's `./configure`.
pub fn configure_args(layout: &NginxLayout, build: &BuildConfig) -> Vec<String> {
    let mut args = vec![format!("--prefix={}", layout.prefix().display())];

    for source in &build.sources {
        if let Some(flag) = &source.configure_flag {
            args.push(format!(
                "{}={}",
                flag,
                layout.source_dir(&source.name).display()
            ));
        }
    }

    args.extend(build.modules.iter().map(|m| format!("--with-{}", m)));
    args
}

/// Arguments for `make`; `-j` without a count lets make schedule freely.
pub fn make_args(parallel: bool) -> Vec<&'static str> {
    if parallel {
        vec!["install", "-j"]
    } else {
        vec!["install"]
    }
}

/// Create the world-readable webroot for certbot challenges, with its
/// marker file. Existing content is wiped.
pub fn prepare_challenge_dir(layout: &NginxLayout) -> DeployResult<()> {
    let dir = layout.challenge_dir();
    ensure_empty_directory(&dir)?;
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755))
        .map_err(|e| DeployError::filesystem(&dir, e))?;

    let sentinel = dir.join(CHALLENGE_SENTINEL);
    fs::write(&sentinel, b"").map_err(|e| DeployError::filesystem(&sentinel, e))?;
    fs::set_permissions(&sentinel, fs::Permissions::from_mode(0o644))
        .map_err(|e| DeployError::filesystem(&sentinel, e))?;
    Ok(())
}

impl NginxManager {
    /// Build nginx unless it is already installed.
    ///
    /// Returns whether a build happened.
    pub fn ensure_built(&self, force_rebuild: bool, parallel: bool) -> DeployResult<bool> {
        if !force_rebuild && self.layout().is_built() {
            info!(
                prefix = %self.layout().prefix().display(),
                "nginx already built, skipping"
            );
            return Ok(false);
        }

        info!(force_rebuild = force_rebuild, "Building nginx from sources");
        self.build_from_source(parallel)?;
        Ok(true)
    }

    /// Download, configure, compile and install nginx and its bundled
    /// libraries.
    ///
    /// Any failure aborts; the prefix is left as-is and a rebuild starts over.
    pub fn build_from_source(&self, parallel: bool) -> DeployResult<()> {
        let layout = self.layout();
        let build = self.build();

        ensure_empty_directory(layout.prefix())?;
        ensure_empty_directory(&layout.src_dir())?;

        info!(count = build.sources.len(), "Downloading sources");
        for source in &build.sources {
            let archive = layout.src_dir().join(format!("{}.tar.gz", source.name));
            self.downloader().download(&source.url, &archive)?;
            extract_tarball(&archive, &layout.source_dir(&source.name))?;
        }

        let work_dir = layout.source_dir(SERVER_SOURCE);
        let timeout = build.timeout_seconds.map(Duration::from_secs);

        info!(work_dir = %work_dir.display(), "Configuring nginx");
        let mut configure = SubprocessBuilder::new(work_dir.join("configure"))
            .args(configure_args(layout, build))
            .current_dir(&work_dir)
            .inherit_output();
        if let Some(timeout) = timeout {
            configure = configure.timeout(timeout);
        }
        configure.run()?.check()?;

        info!(parallel = parallel, "Compiling and installing nginx");
        let mut make = SubprocessBuilder::new("make")
            .args(make_args(parallel))
            .current_dir(&work_dir)
            .inherit_output();
        if let Some(timeout) = timeout {
            make = make.timeout(timeout);
        }
        make.run()?.check()?;

        prepare_challenge_dir(layout)?;

        if !layout.binary().exists() {
            warn!(
                binary = %layout.binary().display(),
                "make install finished but the nginx binary is missing"
            );
        }
        info!(prefix = %layout.prefix().display(), "nginx built");
        Ok(())
    }
}
