//! Configuration module.
//!
//! Handles loading and validating deployment settings from TOML files.

mod settings;

pub use settings::*;
