//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::{Path, PathBuf};

use crate::ai::{SharedProvider, create_provider};
use crate::config::{Config, ConfigLoader};
use crate::pipeline::Workspace;
use crate::types::{RagError, Result};

/// Command execution context
///
/// Created via [`CommandContext::load`] for commands that need the loaded
/// configuration of an initialized workspace.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub workspace: Workspace,
    pub config: Config,
}

impl CommandContext {
    /// Validates initialization and loads config for `root`.
    pub fn load(root: &Path) -> Result<Self> {
        require_initialized(root)?;
        let config = ConfigLoader::load(root)?;

        Ok(Self {
            workspace: Workspace::new(root),
            config,
        })
    }

    /// Provider described by the `[llm]` section, with retry when enabled
    pub fn provider(&self) -> Result<SharedProvider> {
        create_provider(&self.config.llm.provider_config())
    }
}

/// Require the workspace to be initialized
///
/// Returns the `.ragweave` directory path if initialized,
/// or `RagError::NotInitialized` if not.
pub fn require_initialized(root: &Path) -> Result<PathBuf> {
    let data_dir = Workspace::new(root).data_dir();

    if !data_dir.is_dir() {
        return Err(RagError::NotInitialized);
    }

    Ok(data_dir)
}

/// Check if the workspace is initialized
pub fn is_initialized(root: &Path) -> bool {
    Workspace::new(root).data_dir().is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_require_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(!is_initialized(dir.path()));
        assert!(matches!(
            require_initialized(dir.path()),
            Err(RagError::NotInitialized)
        ));

        std::fs::create_dir_all(dir.path().join(".ragweave")).unwrap();
        assert!(is_initialized(dir.path()));
        assert_eq!(
            require_initialized(dir.path()).unwrap(),
            dir.path().join(".ragweave")
        );
    }
}
