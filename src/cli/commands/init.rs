//! Init Command
//!
//! Create the `.ragweave/` folder and project config in a workspace.

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{RagError, Result};

pub fn run(workspace: &Path, force: bool) -> Result<()> {
    if ConfigLoader::is_project_initialized(workspace) && !force {
        return Err(RagError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    let data_dir = ConfigLoader::init_project(workspace, force)?;

    // Existing global config is left untouched.
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let output = Output::new();
    output.success(&format!("Initialized ragweave in {}", data_dir.display()));
    println!();
    println!("Next steps:");
    println!("  1. Export OPENAI_API_KEY (or set [llm] in .ragweave/config.toml)");
    println!("  2. Run 'ragweave build' to summarize the codebase and dependencies");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_init_refuses_second_run_without_force() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            let workspace = jail.directory();

            run(workspace, false).expect("first init");
            assert!(workspace.join(".ragweave/config.toml").exists());
            assert!(workspace.join("xdg/ragweave/config.toml").exists());

            assert!(matches!(run(workspace, false), Err(RagError::Config(_))));
            run(workspace, true).expect("forced init");
            Ok(())
        });
    }
}
