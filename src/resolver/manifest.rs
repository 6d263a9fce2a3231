//! `package.json` model
//!
//! Only the fields the pipelines read: name/version, the direct `types`
//! pointer, the `exports` map and the `dependencies` mapping.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{RagError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    /// Older alias of `types`
    #[serde(default)]
    pub typings: Option<String>,
    #[serde(default)]
    pub exports: Option<Value>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RagError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RagError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::parse(&text, path)
    }

    /// Single declaration entry file, if the manifest names one
    pub fn types_entry(&self) -> Option<&str> {
        self.types
            .as_deref()
            .or(self.typings.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// `exports` keys whose value declares a `types` condition, with that
    /// condition's path. Keys come back in map order.
    pub fn typed_exports(&self) -> Vec<(String, String)> {
        let Some(Value::Object(exports)) = &self.exports else {
            return Vec::new();
        };

        exports
            .iter()
            .filter_map(|(key, value)| {
                let types = value.get("types")?.as_str()?;
                (!types.trim().is_empty()).then(|| (key.clone(), types.to_string()))
            })
            .collect()
    }
}
