//! Error types for the deployment helper.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for every deployment step.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Settings file could not be read or is inconsistent.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid user input (flags, services, hostnames).
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// A required external binary is not on the execution path.
    #[error("Required tool not found on PATH: {tool}")]
    ToolNotFound { tool: String },

    /// A source download returned a non-success status or failed in transit.
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// A tarball was empty or malformed.
    #[error("Cannot extract {}: {message}", archive.display())]
    Extract { archive: PathBuf, message: String },

    /// Directory manipulation failed.
    #[error("Filesystem error on {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    /// Generated nginx configuration was rejected, or the requested
    /// combination of options cannot produce a valid one.
    #[error("Invalid nginx configuration: {message}")]
    ConfigValidation { message: String },

    /// Subprocess execution errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Template-related errors.
    #[error("Template error: {message}")]
    Template { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("HTTPS certificate and private key must be given together")]
    PartialHttpsMaterial,

    #[error("Service on local port {local_port} has no server names")]
    EmptyServerNames { local_port: u16 },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("{program} exited with status {}:\n{output}", exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl DeployError {
    /// Shorthand for an invalid parameter error.
    pub fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        DeployError::Validation {
            kind: ValidationErrorKind::InvalidParameter {
                param: param.to_string(),
                message: message.into(),
            },
        }
    }

    /// Wrap an I/O error together with the path it happened on.
    pub fn filesystem(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        DeployError::Filesystem {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message() {
        let err = DeployError::Command {
            kind: CommandErrorKind::NonZeroExit {
                program: "make".to_string(),
                exit_code: Some(2),
                output: "no rule".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Command error: make exited with status 2:\nno rule"
        );
    }

    #[test]
    fn test_killed_by_signal_message() {
        let kind = CommandErrorKind::NonZeroExit {
            program: "nginx".to_string(),
            exit_code: None,
            output: String::new(),
        };
        assert!(kind.to_string().contains("status signal"));
    }

    #[test]
    fn test_filesystem_helper_keeps_path() {
        let err = DeployError::filesystem(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/x"));
        assert!(err.to_string().contains("denied"));
    }
}
