//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/ragweave/config.toml)
//! 3. Project config (<workspace>/.ragweave/config.toml)
//! 4. Environment variables (RAGWEAVE_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants::workspace::{CONFIG_FILE, DATA_DIR};
use crate::types::{RagError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace` with the full resolution chain:
    /// defaults → global → project → env vars
    pub fn load(workspace: &Path) -> Result<Config> {
        Self::extract(Self::figment(workspace))
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| RagError::Config(format!("Configuration error: {}", e)))
    }

    fn figment(workspace: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path(workspace);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // RAGWEAVE_LLM__SUMMARY_MODEL -> llm.summary_model
        figment.merge(Env::prefixed("RAGWEAVE_").split("__").lowercase(true))
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| RagError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/ragweave/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("ragweave"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Get project data directory
    pub fn project_dir(workspace: &Path) -> PathBuf {
        workspace.join(DATA_DIR)
    }

    /// Get path to project config file
    pub fn project_config_path(workspace: &Path) -> PathBuf {
        Self::project_dir(workspace).join(CONFIG_FILE)
    }

    /// Check if project is initialized
    pub fn is_project_initialized(workspace: &Path) -> bool {
        Self::project_dir(workspace).exists()
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path(workspace: &Path) {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path(workspace);
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(workspace: &Path, as_json: bool) -> Result<()> {
        let config = Self::load(workspace)?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| RagError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            RagError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize the workspace data folder and project config
    pub fn init_project(workspace: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir(workspace);
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(project_dir)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# RagWeave Global Configuration
# User-wide defaults. Project settings in .ragweave/config.toml override these.

version = "1.0"

[llm]
provider = "openai"
summary_model = "gpt-3.5-turbo"
guide_model = "gpt-4o"
temperature = 0.2
timeout_secs = 300
max_retries = 2

# USD per million tokens, for cost estimates
summary_input_price_per_million = 0.5
summary_output_price_per_million = 1.5
input_price_per_million = 5.0
output_price_per_million = 15.0
"#
        .to_string()
    }

    fn default_project_config() -> String {
        r#"# RagWeave Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[code]
# "tree": file and directory summaries; "flat": one tagged summary per file
tagging = "tree"

[scan]
exclude = [
    "node_modules/**",
    "**/node_modules/**",
    ".git/**",
    "dist/**",
    "build/**",
    "target/**",
    "coverage/**",
    ".ragweave/**",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
]

[retrieval]
similarity_top_k = 10
"#
        .to_string()
    }
}
