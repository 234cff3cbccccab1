//! CLI command implementations

pub mod config;
pub mod error;
pub mod output;
pub mod process;
