//! Dependency Type Resolver
//!
//! Collects the declaration text that makes up an installed package's public
//! type surface, following re-exports across files and packages.
//!
//! ## Strategy (first match wins per manifest)
//!
//! 1. `types` / `typings` entry: one resolution named after the package.
//! 2. `exports` keys with a `types` condition: one resolution per key,
//!    named `<package>/<key>`.
//! 3. Installed `@types/<package>` companion, resolved with the same rules
//!    and returned under the companion's own names.
//! 4. Nothing: a warning and an empty list.
//!
//! Relative re-export targets that point at neither a declaration file nor a
//! directory fail the whole resolution, as does a re-exported package whose
//! manifest cannot be read. `node:` builtins are skipped. Every file and package is expanded at
//! most once per resolution call; revisits contribute nothing, which breaks
//! re-export cycles.

pub mod manifest;
pub mod reexport;
pub mod state;

pub use manifest::PackageManifest;
pub use reexport::{is_relative, reexport_targets};
pub use state::DependencySnapshot;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument, warn};

use crate::constants::packages::{
    BUILTIN_PREFIX, DECLARATION_EXT, INDEX_DECLARATION, PACKAGE_MANIFEST, PACKAGES_DIR, README,
    TYPES_SCOPE,
};
use crate::types::{RagError, Result};

/// Concatenated declaration text for one entry point of a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    pub name: String,
    pub types: String,
}

/// Files and packages already expanded during one resolution call
#[derive(Debug, Clone, Default)]
struct Visited {
    files: HashSet<PathBuf>,
    packages: HashSet<String>,
}

/// Resolves declaration text for packages installed under `node_modules`
#[derive(Debug, Clone)]
pub struct DependencyTypeResolver {
    packages_root: PathBuf,
}

impl DependencyTypeResolver {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            packages_root: workspace_root.as_ref().join(PACKAGES_DIR),
        }
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_root.join(name)
    }

    /// Read an installed package's manifest
    pub async fn manifest(&self, name: &str) -> Result<PackageManifest> {
        PackageManifest::load(&self.package_dir(name).join(PACKAGE_MANIFEST)).await
    }

    /// Read an installed package's README. Absent READMEs are `None`.
    pub async fn readme(&self, name: &str) -> Option<String> {
        let path = self.package_dir(name).join(README);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("No README for {}: {}", name, e);
                None
            }
        }
    }

    pub async fn is_installed(&self, name: &str) -> bool {
        tokio::fs::metadata(self.package_dir(name)).await.is_ok()
    }

    /// Resolve the type surface of an installed dependency
    pub async fn resolve(&self, dependency: &str) -> Result<Vec<TypeResolution>> {
        let manifest = self.manifest(dependency).await?;
        self.resolve_manifest(dependency, &manifest).await
    }

    /// Resolve using an already loaded manifest
    #[instrument(skip(self, manifest))]
    pub async fn resolve_manifest(
        &self,
        dependency: &str,
        manifest: &PackageManifest,
    ) -> Result<Vec<TypeResolution>> {
        let mut visited = Visited::default();
        self.resolve_with(dependency, manifest, &mut visited).await
    }

    fn resolve_with<'a>(
        &'a self,
        dependency: &'a str,
        manifest: &'a PackageManifest,
        visited: &'a mut Visited,
    ) -> BoxFuture<'a, Result<Vec<TypeResolution>>> {
        async move {
            visited.packages.insert(dependency.to_string());
            let package_dir = self.package_dir(dependency);

            if let Some(entry) = manifest.types_entry() {
                debug!(dependency, entry, "Resolving types from types field");
                let types = self
                    .expand_file(dependency, package_dir.join(entry), visited)
                    .await?;
                return Ok(vec![TypeResolution {
                    name: dependency.to_string(),
                    types,
                }]);
            }

            let typed_exports = manifest.typed_exports();
            if !typed_exports.is_empty() {
                debug!(
                    dependency,
                    keys = typed_exports.len(),
                    "Resolving types from exports map"
                );
                let mut resolutions = Vec::with_capacity(typed_exports.len());
                for (key, types_path) in typed_exports {
                    // Each entry point is a complete document of its own.
                    let mut scope = visited.clone();
                    let types = self
                        .expand_file(dependency, package_dir.join(&types_path), &mut scope)
                        .await?;
                    visited.packages.extend(scope.packages);
                    resolutions.push(TypeResolution {
                        name: subpath_name(dependency, &key),
                        types,
                    });
                }
                return Ok(resolutions);
            }

            if let Some(companion) = companion_name(dependency)
                && !visited.packages.contains(&companion)
                && self.is_installed(&companion).await
            {
                debug!(dependency, companion = %companion, "Resolving types from companion package");
                let companion_manifest = self.manifest(&companion).await?;
                return self
                    .resolve_with(&companion, &companion_manifest, visited)
                    .await;
            }

            warn!("Dependency has no types: {}", dependency);
            Ok(Vec::new())
        }
        .boxed()
    }

    /// Read one declaration file followed by everything it re-exports
    fn expand_file<'a>(
        &'a self,
        dependency: &'a str,
        path: PathBuf,
        visited: &'a mut Visited,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let canonical = tokio::fs::canonicalize(&path).await.map_err(|e| {
                RagError::type_resolution(
                    dependency,
                    format!("cannot open {}: {}", path.display(), e),
                )
            })?;
            if !visited.files.insert(canonical.clone()) {
                debug!("Already expanded {}", canonical.display());
                return Ok(String::new());
            }

            let text = tokio::fs::read_to_string(&canonical).await.map_err(|e| {
                RagError::type_resolution(
                    dependency,
                    format!("cannot read {}: {}", canonical.display(), e),
                )
            })?;

            let mut blocks = vec![text.clone()];
            let targets = reexport_targets(&text).map_err(|e| {
                RagError::type_resolution(dependency, format!("{}: {}", canonical.display(), e))
            })?;
            for target in targets {
                debug!(from = %canonical.display(), target = %target, "Resolving nested types");

                let nested = if is_relative(&target) {
                    let file = self
                        .resolve_relative(dependency, &canonical, &target)
                        .await?;
                    self.expand_file(dependency, file, visited).await?
                } else {
                    self.expand_package(&target, visited).await?
                };

                if !nested.is_empty() {
                    blocks.push(nested);
                }
            }

            Ok(blocks.join("\n\n"))
        }
        .boxed()
    }

    /// All resolutions of another package, joined into one block
    async fn expand_package(&self, specifier: &str, visited: &mut Visited) -> Result<String> {
        if specifier.starts_with(BUILTIN_PREFIX) {
            debug!("Skipping builtin module {}", specifier);
            return Ok(String::new());
        }

        let package = package_of_specifier(specifier);
        if visited.packages.contains(package) {
            debug!("Already expanded package {}", package);
            return Ok(String::new());
        }

        let manifest = self.manifest(package).await?;

        let resolutions = self.resolve_with(package, &manifest, visited).await?;
        Ok(resolutions
            .into_iter()
            .map(|r| r.types)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Map a relative specifier to the declaration file it denotes
    async fn resolve_relative(&self, dependency: &str, from: &Path, target: &str) -> Result<PathBuf> {
        let base = from.parent().unwrap_or(Path::new(".")).join(target);

        if is_dir(&base).await {
            let index = base.join(INDEX_DECLARATION);
            return if is_file(&index).await {
                Ok(index)
            } else {
                Err(RagError::type_resolution(
                    dependency,
                    format!(
                        "re-export '{}' in {} is a directory without {}",
                        target,
                        from.display(),
                        INDEX_DECLARATION
                    ),
                ))
            };
        }

        let candidate = declaration_path(&base, target);
        if is_file(&candidate).await {
            Ok(candidate)
        } else {
            Err(RagError::type_resolution(
                dependency,
                format!(
                    "re-export '{}' in {} resolves to neither {} nor a directory",
                    target,
                    from.display(),
                    candidate.display()
                ),
            ))
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// `./leaf` → `./leaf.d.ts`, `./leaf.js` → `./leaf.d.ts`, `./leaf.d.ts` unchanged
fn declaration_path(base: &Path, target: &str) -> PathBuf {
    if target.ends_with(DECLARATION_EXT) {
        return base.to_path_buf();
    }

    let stem = match target.strip_suffix(".js") {
        Some(_) => base.with_extension(""),
        None => base.to_path_buf(),
    };
    let mut path = stem.into_os_string();
    path.push(DECLARATION_EXT);
    PathBuf::from(path)
}

/// `lodash/fp` → `lodash`, `@scope/pkg/sub` → `@scope/pkg`
fn package_of_specifier(specifier: &str) -> &str {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().unwrap_or(specifier);
    if first.starts_with('@') {
        match parts.next() {
            Some(second) => &specifier[..first.len() + 1 + second.len()],
            None => specifier,
        }
    } else {
        first
    }
}

/// `exports` key to resolution name: `.` → `dep`, `./server` → `dep/server`
fn subpath_name(dependency: &str, key: &str) -> String {
    let sub = key.trim_start_matches("./").trim_end_matches('/');
    if sub.is_empty() || sub == "." {
        dependency.to_string()
    } else {
        format!("{}/{}", dependency, sub)
    }
}

/// `@types` package for a dependency; `@scope/pkg` maps to `@types/scope__pkg`
fn companion_name(dependency: &str) -> Option<String> {
    if dependency.starts_with(&format!("{}/", TYPES_SCOPE)) {
        return None;
    }
    let flattened = match dependency.strip_prefix('@') {
        Some(scoped) => scoped.replacen('/', "__", 1),
        None => dependency.to_string(),
    };
    Some(format!("{}/{}", TYPES_SCOPE, flattened))
}
