//! filechat core - configuration and filesystem primitives
//!
//! This crate provides the foundational pieces shared by the agent and the CLI:
//! - Configuration loading and validation
//! - File I/O helpers used by the built-in file tools

pub mod config;
pub mod file_io;

pub use config::{AgentConfig, ApiConfig, Config, ConfigError};
pub use file_io::{list_dir, read_file, write_file, FileIoError};
