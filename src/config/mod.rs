//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/ragweave/config.toml)
//! 3. Project config (.ragweave/config.toml)
//! 4. Environment variables (RAGWEAVE_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
