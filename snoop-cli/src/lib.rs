//! CLI interface for snoop
//!
//! This crate provides the command-line interface for snoop, including
//! argument parsing and the mapping from flags to session settings.

pub mod args;

pub use args::{Cli, Commands};
