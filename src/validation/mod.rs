//! Input validation module.
//!
//! Validators for hostnames and the certbot registration email. Both end up
//! in generated configuration or on a command line, so they are checked
//! before any side effect happens.

mod domain;
mod email;

pub use domain::validate_hostname;
pub use email::validate_email;
