//! Command executor module.
//!
//! Spawns external tools (configure, make, nginx, certbot) and reports
//! their exit status.

mod output;
mod subprocess;

pub use output::sanitize_output;
pub use subprocess::{SubprocessBuilder, SubprocessResult};
