//! The nginx manager: owns the layout and build settings of one install.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use tracing::{error, info};

use super::config::{generate_config, ConfigOptions};
use super::layout::NginxLayout;
use super::service::Service;
use crate::config::BuildConfig;
use crate::error::{DeployError, DeployResult};
use crate::executor::SubprocessBuilder;
use crate::filesystem::Downloader;
use crate::templates::TemplateEngine;

/// Builds, configures and runs one nginx install prefix.
///
/// Everything that used to be process-wide (paths, upstream URLs, configure
/// options) is held here, so several managers can coexist in one process.
pub struct NginxManager {
    layout: NginxLayout,
    build: BuildConfig,
    engine: TemplateEngine,
    downloader: Downloader,
}

impl NginxManager {
    pub fn new(layout: NginxLayout, build: BuildConfig, engine: TemplateEngine) -> Self {
        Self {
            layout,
            build,
            engine,
            downloader: Downloader::new(),
        }
    }

    /// Replace the HTTP client used for source downloads.
    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn layout(&self) -> &NginxLayout {
        &self.layout
    }

    pub fn build(&self) -> &BuildConfig {
        &self.build
    }

    pub(super) fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Render the configuration for `services` without touching the disk.
    pub fn render_config(&self, services: &[Service], options: &ConfigOptions) -> DeployResult<String> {
        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        generate_config(&self.engine, services, options, &self.layout, generated_at)
    }

    /// Generate `conf/nginx.conf`, then have nginx check it with `-t`.
    ///
    /// Returns the path of the written configuration.
    pub fn configure(&self, services: &[Service], options: &ConfigOptions) -> DeployResult<PathBuf> {
        info!(
            services = services.len(),
            with_server_names = options.with_server_names,
            https = options.https.is_some(),
            "Generating nginx configuration"
        );
        let config = self.render_config(services, options)?;

        let conf_file = self.layout.conf_file();
        if let Some(parent) = conf_file.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::filesystem(parent, e))?;
        }
        fs::write(&conf_file, config).map_err(|e| DeployError::filesystem(&conf_file, e))?;

        let result = SubprocessBuilder::new(self.layout.binary()).arg("-t").run()?;
        if !result.success {
            error!(
                conf = %conf_file.display(),
                exit_code = ?result.exit_code,
                "nginx rejected the generated configuration"
            );
            return Err(DeployError::ConfigValidation {
                message: result.diagnostic(),
            });
        }

        info!(conf = %conf_file.display(), "nginx configuration is valid");
        Ok(conf_file)
    }
}
