//! Filesystem helpers.
//!
//! Downloads, archive extraction, directory resets and path resolution used
//! while building nginx and preparing the challenge webroot.

mod archive;
mod dirs;
mod download;
mod paths;

pub use archive::extract_tarball;
pub use dirs::{absolute_path, ensure_empty_directory, resolve_absolute_path};
pub use download::Downloader;
pub use paths::find_executable;
