//! Obtaining certificates with certbot's webroot plugin.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::CertbotConfig;
use crate::error::{DeployError, DeployResult};
use crate::executor::SubprocessBuilder;
use crate::filesystem::find_executable;
use crate::validation::{validate_email, validate_hostname};

/// Wrapper around a located certbot binary.
///
/// Certificates end up wherever certbot keeps them
/// (`/etc/letsencrypt/live/<first name>/` by default); their paths are
/// passed back in separately when enabling HTTPS.
#[derive(Debug, Clone)]
pub struct CertificateIssuer {
    exe: PathBuf,
    staging: bool,
}

impl CertificateIssuer {
    /// Find certbot on `PATH`.
    pub fn locate(config: &CertbotConfig) -> DeployResult<Self> {
        let exe = find_executable(&config.binary).ok_or_else(|| DeployError::ToolNotFound {
            tool: config.binary.clone(),
        })?;
        debug!(exe = %exe.display(), "Located certbot");
        Ok(Self {
            exe,
            staging: config.staging,
        })
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Obtain (or renew) one certificate covering all `hostnames`.
    ///
    /// `webroot` must be served on port 80 under the challenge path for each
    /// hostname. Each call is a fresh certbot run.
    pub fn certify(&self, hostnames: &[String], webroot: &Path, admin_email: &str) -> DeployResult<()> {
        validate_request(hostnames, admin_email)?;

        info!(
            hostnames = ?hostnames,
            webroot = %webroot.display(),
            staging = self.staging,
            "Requesting certificate"
        );

        SubprocessBuilder::new(&self.exe)
            .args(certify_args(hostnames, webroot, admin_email, self.staging))
            .inherit_output()
            .run()?
            .check()?;

        info!(primary = %hostnames[0], "Certificate obtained");
        Ok(())
    }
}

/// Check the hostnames and email of a certificate request.
///
/// Run before the challenge webroot is touched, and again by `certify`.
pub fn validate_request(hostnames: &[String], admin_email: &str) -> DeployResult<()> {
    if hostnames.is_empty() {
        return Err(DeployError::invalid_parameter(
            "hostnames",
            "At least one hostname is required",
        ));
    }
    for hostname in hostnames {
        validate_hostname(hostname)?;
    }
    validate_email(admin_email)?;
    Ok(())
}

/// Arguments for a non-interactive `certonly --webroot` run.
pub fn certify_args(
    hostnames: &[String],
    webroot: &Path,
    admin_email: &str,
    staging: bool,
) -> Vec<String> {
    let mut args = vec![
        "certonly".to_string(),
        "--non-interactive".to_string(),
        "--agree-tos".to_string(),
        "--webroot".to_string(),
        "--webroot-path".to_string(),
        webroot.display().to_string(),
    ];
    for hostname in hostnames {
        args.push("-d".to_string());
        args.push(hostname.clone());
    }
    args.push("--email".to_string());
    args.push(admin_email.to_string());
    args.push("--keep-until-expiring".to_string());

    if staging {
        args.push("--staging".to_string());
    }
    args
}
