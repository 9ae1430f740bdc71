//! Error types for the deployment helper.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
