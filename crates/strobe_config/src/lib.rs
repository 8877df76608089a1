//! Parsing and validation of `strobe.toml` run configuration.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`ProjectConfig`] covering convergence limits, clocking, tracing and
//! testbench stimulus.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
