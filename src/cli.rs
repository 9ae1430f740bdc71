//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{DeployError, DeployResult, ValidationErrorKind};
use crate::nginx::HttpsMaterial;
use crate::validation::validate_email;

/// Build, run and deploy the website's nginx.
#[derive(Parser, Debug)]
#[command(name = "site-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML). Built-in defaults are used when absent.
    #[arg(short = 'c', long = "config", env = "SITE_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use certbot to create HTTPS certificates
    #[arg(long)]
    pub certify: bool,

    /// Deploy server on port 80 (and 443 with HTTPS material)
    #[arg(long)]
    pub deploy: bool,

    /// Compile nginx without parallel make jobs
    #[arg(long)]
    pub build_single_thread: bool,

    /// Rebuild nginx from sources even if already installed
    #[arg(long)]
    pub rebuild_server: bool,

    /// Email registered with the certificate authority (required with --certify)
    #[arg(long, value_name = "EMAIL")]
    pub admin_email: Option<String>,

    /// Certificate chain for HTTPS (requires --https-privkey-path)
    #[arg(long, value_name = "PATH")]
    pub https_fullchain_path: Option<PathBuf>,

    /// Private key for HTTPS (requires --https-fullchain-path)
    #[arg(long, value_name = "PATH")]
    pub https_privkey_path: Option<PathBuf>,
}

/// What the invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Obtain certificates for every configured hostname.
    Certify { admin_email: String },
    /// Serve publicly on ports 80/443.
    Deploy { https: Option<HttpsMaterial> },
    /// Serve on loopback ports only.
    Local,
}

/// A validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub mode: Mode,
    pub parallel_build: bool,
    pub force_rebuild: bool,
}

impl Cli {
    /// Check flag combinations. Runs before anything touches the disk.
    pub fn into_invocation(self) -> DeployResult<Invocation> {
        if self.certify && self.deploy {
            return Err(DeployError::invalid_parameter(
                "certify",
                "--certify and --deploy cannot be combined",
            ));
        }

        let https = HttpsMaterial::from_parts(
            self.https_fullchain_path.as_deref(),
            self.https_privkey_path.as_deref(),
        )?;

        let mode = if self.certify {
            let admin_email = self.admin_email.ok_or(DeployError::Validation {
                kind: ValidationErrorKind::MissingParameter {
                    param: "admin-email".to_string(),
                },
            })?;
            validate_email(&admin_email)?;
            if https.is_some() {
                return Err(DeployError::invalid_parameter(
                    "https-fullchain-path",
                    "HTTPS paths only apply to --deploy",
                ));
            }
            Mode::Certify { admin_email }
        } else if self.deploy {
            Mode::Deploy { https }
        } else {
            if https.is_some() {
                return Err(DeployError::invalid_parameter(
                    "https-fullchain-path",
                    "HTTPS requires --deploy (named hosts)",
                ));
            }
            Mode::Local
        };

        Ok(Invocation {
            config: self.config,
            mode,
            parallel_build: !self.build_single_thread,
            force_rebuild: self.rebuild_server,
        })
    }
}
