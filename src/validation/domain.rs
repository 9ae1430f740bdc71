//! Hostname validation.
//!
//! Validates the server names placed in `server_name` directives and passed
//! to certbot as `-d` flags.

use crate::error::{DeployError, DeployResult};

/// Maximum length for a domain name.
const MAX_DOMAIN_LENGTH: usize = 253;

/// Maximum length for a domain label (part between dots).
const MAX_LABEL_LENGTH: usize = 63;

/// Validates a hostname.
///
/// # Rules
///
/// - Must be 1-253 characters
/// - Each label (part between dots) must be 1-63 characters
/// - Labels must start and end with alphanumeric characters
/// - Labels can contain hyphens but not at start or end
/// - No wildcards (the webroot challenge cannot issue them)
/// - Must have at least one dot (no bare TLDs)
pub fn validate_hostname(hostname: &str) -> DeployResult<&str> {
    if hostname.is_empty() {
        return Err(DeployError::invalid_parameter(
            "hostname",
            "Hostname cannot be empty",
        ));
    }

    if hostname.len() > MAX_DOMAIN_LENGTH {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!(
                "Hostname exceeds maximum length of {} characters",
                MAX_DOMAIN_LENGTH
            ),
        ));
    }

    if hostname.contains('*') {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!("Wildcard hostname '{}' cannot be certified over HTTP-01", hostname),
        ));
    }

    let trimmed = hostname.trim_end_matches('.');
    let labels: Vec<&str> = trimmed.split('.').collect();

    if labels.len() < 2 {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!(
                "Hostname '{}' must have at least two parts (e.g., example.com)",
                hostname
            ),
        ));
    }

    for label in &labels {
        validate_label(label)?;
    }

    Ok(hostname)
}

/// Validates a single domain label (part between dots).
fn validate_label(label: &str) -> DeployResult<()> {
    if label.is_empty() {
        return Err(DeployError::invalid_parameter(
            "hostname",
            "Hostname contains empty label (consecutive dots)",
        ));
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!(
                "Label '{}' exceeds maximum length of {} characters",
                label, MAX_LABEL_LENGTH
            ),
        ));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!("Label '{}' must start and end with a letter or number", label),
        ));
    }

    if let Some(c) = label.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(DeployError::invalid_parameter(
            "hostname",
            format!("Label '{}' contains invalid character '{}'", label, c),
        ));
    }

    Ok(())
}
