//! Command-line tooling for canvas documents
//!
//! Each subcommand lives in [`commands`] and returns its output as a
//! string so it can be tested without a process.

pub mod commands;
pub mod config;

pub use config::CanvasConfig;
