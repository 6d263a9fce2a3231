//! Config Command
//!
//! Manage ragweave configuration.
//!
//! Usage:
//!   ragweave config show [-g] [-f json]
//!   ragweave config path
//!   ragweave config init [-g] [--force]

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(workspace: &Path, global: bool, format: &str) -> Result<()> {
    if !global {
        return ConfigLoader::show_config(workspace, format == "json");
    }

    match ConfigLoader::global_config_path() {
        Some(global_path) if global_path.exists() => {
            let content = std::fs::read_to_string(&global_path)?;
            println!("# Global Config: {}\n", global_path.display());
            println!("{}", content);
        }
        Some(_) => {
            println!("No global config found.");
            println!("Run 'ragweave config init --global' to create one.");
        }
        None => println!("Cannot determine global config directory."),
    }
    Ok(())
}

/// Show configuration paths
pub fn path(workspace: &Path) -> Result<()> {
    ConfigLoader::show_path(workspace);
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let path = ConfigLoader::init_global(force)?;
    Output::new().success("Initialized global configuration");
    println!("  Config: {}", path.display());
    Ok(())
}

/// Initialize project configuration
pub fn init_project(workspace: &Path, force: bool) -> Result<()> {
    let dir = ConfigLoader::init_project(workspace, force)?;
    Output::new().success("Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!(
        "  Config:    {}",
        ConfigLoader::project_config_path(workspace).display()
    );
    Ok(())
}
