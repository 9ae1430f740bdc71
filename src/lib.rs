//! Site deployment library.
//!
//! Builds nginx from source into a private prefix, renders its configuration
//! from a declarative service list, starts or reloads it, and obtains TLS
//! certificates through certbot.

pub mod certbot;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod filesystem;
pub mod nginx;
pub mod templates;
pub mod validation;
