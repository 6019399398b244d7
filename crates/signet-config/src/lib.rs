//! Configuration for signet renderer hosts.
//!
//! A host (such as the `signet` CLI) reads a small TOML file that sets the
//! garbage collector's terminal generation, how many GC steps to run after each
//! render, the default log filter, and the batch output format.
//!
//! # Example
//!
//! ```rust,no_run
//! use signet_config::{RendererConfig, paths};
//!
//! let config = match paths::find_config(None) {
//!     Some(path) => RendererConfig::load(path).unwrap(),
//!     None => RendererConfig::default(),
//! };
//! println!("terminal generation: {}", config.terminal_generation);
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

pub use config::{DEFAULT_TERMINAL_GENERATION, OutputFormat, RendererConfig};
pub use error::ConfigError;
pub use paths::{default_config_path, find_config, user_config_dir};
