//! Administrative email validation.

use crate::error::{DeployError, DeployResult};

/// Validates the address certbot registers for expiry notices.
///
/// Besides basic shape checks, shell and argument metacharacters are
/// refused since the address ends up on certbot's command line.
pub fn validate_email(email: &str) -> DeployResult<&str> {
    if email.is_empty() {
        return Err(DeployError::invalid_parameter(
            "admin-email",
            "Email cannot be empty",
        ));
    }

    if email.len() > 254 {
        return Err(DeployError::invalid_parameter(
            "admin-email",
            "Email exceeds maximum length",
        ));
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            (local, domain)
        }
        _ => {
            return Err(DeployError::invalid_parameter(
                "admin-email",
                "Invalid email format",
            ))
        }
    };

    if local.starts_with('-') {
        return Err(DeployError::invalid_parameter(
            "admin-email",
            "Email cannot start with '-'",
        ));
    }

    if !domain.contains('.') {
        return Err(DeployError::invalid_parameter(
            "admin-email",
            "Email domain must contain a dot",
        ));
    }

    let invalid = email.chars().find(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(
                c,
                '<' | '>'
                    | '"'
                    | '\''
                    | '`'
                    | '$'
                    | '&'
                    | '|'
                    | ';'
                    | '('
                    | ')'
                    | '['
                    | ']'
                    | '{'
                    | '}'
                    | '\\'
                    | '!'
                    | '#'
                    | '*'
                    | '?'
                    | '~'
            )
    });
    if let Some(c) = invalid {
        return Err(DeployError::invalid_parameter(
            "admin-email",
            format!("Email contains invalid character: '{}'", c),
        ));
    }

    Ok(email)
}
