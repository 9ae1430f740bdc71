//! HTTP downloads of upstream source archives.

use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::info;

use crate::error::{DeployError, DeployResult};

/// Fetches URLs to files with a blocking HTTP client.
///
/// No retry and no partial resume: a failed download is reported and the
/// operator reruns the deployment.
#[derive(Clone, Default)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a downloader around a preconfigured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `url` and write the body verbatim to `destination`.
    pub fn download(&self, url: &str, destination: &Path) -> DeployResult<u64> {
        info!(url = url, destination = %destination.display(), "Downloading");

        let download_err = |message: String| DeployError::Download {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("server answered {}", status)));
        }

        let body = response.bytes().map_err(|e| download_err(e.to_string()))?;
        fs::write(destination, &body).map_err(|e| DeployError::filesystem(destination, e))?;

        Ok(body.len() as u64)
    }
}

