//! Command-line interface for geocode.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{AddressArgs, CacheCommand, Cli, Commands};
pub use commands::{load_config, run};
