//! Declarative description of the services nginx exposes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult, ValidationErrorKind};

/// How a service is reachable from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Served over plain HTTP on port 80.
    Http,
    /// Port 80 only redirects to HTTPS.
    HttpsOnly,
}

/// One site or application served by nginx.
///
/// Immutable once constructed. `directives` are raw nginx lines, copied
/// verbatim into each server block for the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    server_names: Vec<String>,
    local_port: u16,
    protocol: Protocol,
    directives: Vec<String>,
}

impl Service {
    /// Create a service. The local port must be non-zero.
    pub fn new<N, D>(
        server_names: N,
        local_port: u16,
        protocol: Protocol,
        directives: D,
    ) -> DeployResult<Self>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        if local_port == 0 {
            return Err(DeployError::invalid_parameter(
                "local_port",
                "Local port must be between 1 and 65535",
            ));
        }

        Ok(Self {
            server_names: server_names.into_iter().map(Into::into).collect(),
            local_port,
            protocol,
            directives: directives.into_iter().map(Into::into).collect(),
        })
    }

    pub fn server_names(&self) -> &[String] {
        &self.server_names
    }

    /// Name used as the canonical host for HTTPS redirects.
    pub fn primary_name(&self) -> Option<&str> {
        self.server_names.first().map(String::as_str)
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }
}

/// Certificate chain and private key used for the 443 listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsMaterial {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

impl HttpsMaterial {
    pub fn new(certificate: impl Into<PathBuf>, private_key: impl Into<PathBuf>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
        }
    }

    /// Build from two optional paths. Both or neither must be given.
    pub fn from_parts(
        certificate: Option<&Path>,
        private_key: Option<&Path>,
    ) -> DeployResult<Option<Self>> {
        match (certificate, private_key) {
            (Some(cert), Some(key)) => Ok(Some(Self::new(cert, key))),
            (None, None) => Ok(None),
            _ => Err(DeployError::Validation {
                kind: ValidationErrorKind::PartialHttpsMaterial,
            }),
        }
    }
}
