use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::types::{RagError, Result};

/// Default maximum file size for summarization (1MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Workspace-relative globs skipped by default
pub const DEFAULT_EXCLUDE: &[&str] = &[
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
];

/// Enumerates workspace files as `/`-separated relative paths.
///
/// Honors `.gitignore` plus the configured exclude globs, which are matched
/// against the relative path.
pub struct FileScanner {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude: DEFAULT_EXCLUDE
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Replace the exclude globs. Invalid patterns are a config error.
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    RagError::Config(format!("Invalid exclude pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths of every eligible file, sorted
    pub fn paths(&self) -> Result<Vec<String>> {
        Ok(self.scan()?.into_iter().map(|f| f.relative).collect())
    }

    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(RagError::Config(format!(
                "Workspace {} is not a directory",
                self.root.display()
            )));
        }

        let root = self.root.clone();
        let exclude = self.exclude.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(move |entry| {
                // Prune directories whose contents are excluded.
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                match relative_path(&root, entry.path()) {
                    Some(rel) if !rel.is_empty() => {
                        let probe = format!("{}/_", rel);
                        !exclude.iter().any(|p| p.matches(&rel) || p.matches(&probe))
                    }
                    _ => true,
                }
            })
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(relative) = relative_path(&self.root, path) else {
                continue;
            };
            if self.should_exclude(&relative) {
                continue;
            }

            if let Ok(metadata) = path.metadata() {
                if metadata.len() > self.max_file_size {
                    tracing::debug!("Skipping large file {} ({} bytes)", relative, metadata.len());
                    continue;
                }

                files.push(ScannedFile {
                    path: path.to_path_buf(),
                    relative,
                    size: metadata.len(),
                });
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    fn should_exclude(&self, relative: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(relative))
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Workspace-relative, `/`-separated
    pub relative: String,
    pub size: u64,
}
