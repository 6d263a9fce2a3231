//! Last-embedded dependency snapshot
//!
//! `dependencies.json` records the `dependencies` mapping that was current
//! when the dependency index was last extended. Comparison is by name only:
//! a dependency whose version changes is not considered missing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencySnapshot(BTreeMap<String, String>);

impl DependencySnapshot {
    pub fn new(dependencies: BTreeMap<String, String>) -> Self {
        Self(dependencies)
    }

    /// Read the snapshot. A missing or unreadable file is an empty snapshot.
    pub async fn load(path: &Path) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("No dependency snapshot at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Ignoring unparseable dependency snapshot {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Overwrite the snapshot file wholesale
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Names in `current` that this snapshot does not contain
    pub fn missing(&self, current: &BTreeMap<String, String>) -> Vec<String> {
        current
            .keys()
            .filter(|name| !self.0.contains_key(*name))
            .cloned()
            .collect()
    }

    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
