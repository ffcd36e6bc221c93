//! CLI, path resolution, commands and exit codes
//!
//! This crate provides the `fetch-todays-calendar` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use commands::Context;
pub use error::{ClientError, ClientResult};
