//! nginx management.
//!
//! Builds nginx from source into a private prefix, generates its
//! configuration from a list of services, validates it and starts or
//! reloads the server.

mod build;
mod config;
mod layout;
mod manager;
mod process;
mod service;

pub use build::{configure_args, make_args, prepare_challenge_dir};
pub use config::{generate_config, ConfigOptions, CHALLENGE_URI};
pub use layout::{NginxLayout, CHALLENGE_SENTINEL};
pub use manager::NginxManager;
pub use process::{RunAction, RunOutcome};
pub use service::{HttpsMaterial, Protocol, Service};
