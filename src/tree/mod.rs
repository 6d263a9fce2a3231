//! Directory Tree Aggregation
//!
//! Turns a flat list of workspace-relative paths into a [`DirectoryNode`]
//! hierarchy and visits it bottom-up: every file of a directory and every
//! child directory resolves before the directory's own callback runs.
//!
//! Sibling subtrees are visited concurrently. Callers that need the callback
//! bodies serialized route them through a [`TaskQueue`](crate::queue::TaskQueue);
//! the tree only decides *when* a callback may start.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, try_join_all};
use tracing::debug;

use crate::constants::code::ROOT_SENTINEL;
use crate::types::Result;

/// One path prefix and its direct children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Full relative path; `None` for the root
    path: Option<String>,
    directories: BTreeMap<String, DirectoryNode>,
    files: BTreeSet<String>,
}

impl DirectoryNode {
    /// Build the tree for a set of relative paths.
    ///
    /// Paths are split on `/` and `\`; empty and `.` segments are dropped and
    /// duplicate paths collapse into one entry.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut root = DirectoryNode::default();
        for path in paths {
            root.insert(path.as_ref());
        }
        root
    }

    fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        let Some((_, dirs)) = segments.split_last() else {
            return;
        };

        let mut node = self;
        let mut prefix = String::new();
        for segment in dirs {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            node = node
                .directories
                .entry((*segment).to_string())
                .or_insert_with(|| DirectoryNode {
                    path: Some(prefix.clone()),
                    ..Default::default()
                });
        }
        node.files.insert(segments.join("/"));
    }

    /// Directory path, or `$ROOT` for the root node
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(ROOT_SENTINEL)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_none()
    }

    /// Direct child files (full relative paths)
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Direct child directories
    pub fn directories(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.directories.values()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Files in this subtree
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .directories
                .values()
                .map(DirectoryNode::file_count)
                .sum::<usize>()
    }

    /// Directories in this subtree, this node included
    pub fn directory_count(&self) -> usize {
        1 + self
            .directories
            .values()
            .map(DirectoryNode::directory_count)
            .sum::<usize>()
    }
}

/// Bottom-up visitor over a [`DirectoryNode`] tree
pub struct TreeAggregator;

impl TreeAggregator {
    /// Build the tree for `paths` and traverse it.
    ///
    /// Returns the root directory's result, or `None` when there are no paths
    /// (in which case neither callback is invoked).
    pub async fn traverse<I, P, S, F, FFut, D, DFut>(
        paths: I,
        on_file: F,
        on_directory: D,
    ) -> Result<Option<S>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
        S: Send,
        F: Fn(String) -> FFut + Sync,
        FFut: Future<Output = Result<S>> + Send,
        D: Fn(String, Vec<S>) -> DFut + Sync,
        DFut: Future<Output = Result<S>> + Send,
    {
        let root = DirectoryNode::from_paths(paths);
        Self::traverse_tree(&root, &on_file, &on_directory).await
    }

    /// Traverse an already built tree
    pub async fn traverse_tree<S, F, FFut, D, DFut>(
        root: &DirectoryNode,
        on_file: &F,
        on_directory: &D,
    ) -> Result<Option<S>>
    where
        S: Send,
        F: Fn(String) -> FFut + Sync,
        FFut: Future<Output = Result<S>> + Send,
        D: Fn(String, Vec<S>) -> DFut + Sync,
        DFut: Future<Output = Result<S>> + Send,
    {
        if root.is_empty() {
            debug!("Tree traversal skipped: no paths");
            return Ok(None);
        }

        debug!(
            files = root.file_count(),
            directories = root.directory_count(),
            "Traversing directory tree"
        );
        visit(root, on_file, on_directory).await.map(Some)
    }
}

/// Post-order visit. Child results are ordered files first, then
/// subdirectories, each group in path order.
fn visit<'a, S, F, FFut, D, DFut>(
    node: &'a DirectoryNode,
    on_file: &'a F,
    on_directory: &'a D,
) -> BoxFuture<'a, Result<S>>
where
    S: Send + 'a,
    F: Fn(String) -> FFut + Sync,
    FFut: Future<Output = Result<S>> + Send + 'a,
    D: Fn(String, Vec<S>) -> DFut + Sync,
    DFut: Future<Output = Result<S>> + Send + 'a,
{
    async move {
        let mut children: Vec<BoxFuture<'a, Result<S>>> =
            Vec::with_capacity(node.files.len() + node.directories.len());

        for file in node.files() {
            children.push(on_file(file.to_string()).boxed());
        }
        for directory in node.directories() {
            children.push(visit(directory, on_file, on_directory));
        }

        let results = try_join_all(children).await?;
        on_directory(node.key().to_string(), results).await
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskQueue;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_build_tree() {
        let root = DirectoryNode::from_paths(["a.ts", "b/c.ts", "b/d/e.ts", "b/c.ts"]);

        assert!(root.is_root());
        assert_eq!(root.key(), "$ROOT");
        assert_eq!(root.files().collect::<Vec<_>>(), vec!["a.ts"]);
        assert_eq!(root.file_count(), 3);
        assert_eq!(root.directory_count(), 3);

        let b = root.directories().next().unwrap();
        assert_eq!(b.key(), "b");
        assert_eq!(b.files().collect::<Vec<_>>(), vec!["b/c.ts"]);
        assert_eq!(b.directories().next().unwrap().key(), "b/d");
    }

    #[test]
    fn test_paths_are_normalized() {
        let root = DirectoryNode::from_paths(["./src//lib.rs", "src\\main.rs", ""]);
        let src = root.directories().next().unwrap();
        assert_eq!(src.key(), "src");
        assert_eq!(
            src.files().collect::<Vec<_>>(),
            vec!["src/lib.rs", "src/main.rs"]
        );
        assert_eq!(root.file_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_invokes_nothing() {
        let calls = AtomicUsize::new(0);
        let result = TreeAggregator::traverse(
            Vec::<String>::new(),
            |_path| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(String::new()) }
            },
            |_dir, _children| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(String::new()) }
            },
        )
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_queued_callbacks_run_leaf_first() {
        let queue = TaskQueue::new("tree");
        let log: Arc<Mutex<Vec<String>>> = Arc::default();

        let on_file = |path: String| {
            let log = log.clone();
            queue.enqueue(move || async move {
                log.lock().unwrap().push(format!("file {}", path));
                Ok(format!("summary of {}", path))
            })
        };
        let on_directory = |dir: String, children: Vec<String>| {
            let log = log.clone();
            queue.enqueue(move || async move {
                log.lock()
                    .unwrap()
                    .push(format!("directory {} [{}]", dir, children.join(", ")));
                Ok(format!("summary of {}", dir))
            })
        };

        let root = TreeAggregator::traverse(["a.ts", "b/c.ts"], on_file, on_directory)
            .await
            .unwrap();

        assert_eq!(root.as_deref(), Some("summary of $ROOT"));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "file a.ts",
                "file b/c.ts",
                "directory b [summary of b/c.ts]",
                "directory $ROOT [summary of a.ts, summary of b]",
            ]
        );
    }

    #[tokio::test]
    async fn test_directory_callback_follows_all_descendants() {
        let clock = AtomicUsize::new(0);
        let stamps: Mutex<HashMap<String, usize>> = Mutex::default();

        let paths = [
            "src/a.ts",
            "src/util/b.ts",
            "src/util/deep/c.ts",
            "docs/guide.md",
            "top.ts",
        ];

        TreeAggregator::traverse(
            paths,
            |path: String| {
                let delay = 1 + path.len() as u64 % 7;
                let clock = &clock;
                let stamps = &stamps;
                async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    let t = clock.fetch_add(1, Ordering::SeqCst);
                    stamps.lock().unwrap().insert(path.clone(), t);
                    Ok(())
                }
            },
            |dir: String, _children: Vec<()>| {
                let clock = &clock;
                let stamps = &stamps;
                async move {
                    let t = clock.fetch_add(1, Ordering::SeqCst);
                    stamps.lock().unwrap().insert(dir, t);
                    Ok(())
                }
            },
        )
        .await
        .unwrap();

        let stamps = stamps.into_inner().unwrap();
        assert_eq!(stamps.len(), paths.len() + 5);

        for (node, t) in &stamps {
            let is_descendant = |other: &str| {
                if node == "$ROOT" {
                    other != "$ROOT"
                } else {
                    other.starts_with(&format!("{}/", node))
                }
            };
            for (other, other_t) in &stamps {
                if is_descendant(other) {
                    assert!(t > other_t, "{} ran before descendant {}", node, other);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_callback_failure_aborts_traversal() {
        let result = TreeAggregator::traverse(
            ["ok.ts", "bad.ts"],
            |path: String| async move {
                if path == "bad.ts" {
                    Err(crate::types::RagError::Config("unreadable".to_string()))
                } else {
                    Ok(())
                }
            },
            |_dir: String, _children: Vec<()>| async { Ok(()) },
        )
        .await;

        assert!(result.is_err());
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..4),
            prop::sample::select(vec!["x.ts", "y.rs", "z.md"]),
        )
            .prop_map(|(dirs, file)| {
                let mut segments: Vec<&str> = dirs;
                segments.push(file);
                segments.join("/")
            })
    }

    proptest! {
        #[test]
        fn prop_each_file_and_directory_visited_once(
            paths in prop::collection::vec(path_strategy(), 1..40)
        ) {
            let distinct_files: BTreeSet<String> = paths.iter().cloned().collect();
            let mut distinct_dirs: BTreeSet<String> = BTreeSet::new();
            distinct_dirs.insert("$ROOT".to_string());
            for path in &distinct_files {
                let segments: Vec<&str> = path.split('/').collect();
                for end in 1..segments.len() {
                    distinct_dirs.insert(segments[..end].join("/"));
                }
            }

            let file_calls: Mutex<Vec<String>> = Mutex::default();
            let dir_calls: Mutex<Vec<String>> = Mutex::default();

            futures::executor::block_on(TreeAggregator::traverse(
                &paths,
                |path: String| {
                    file_calls.lock().unwrap().push(path);
                    async { Ok(()) }
                },
                |dir: String, _children: Vec<()>| {
                    dir_calls.lock().unwrap().push(dir);
                    async { Ok(()) }
                },
            ))
            .unwrap();

            let file_calls = file_calls.into_inner().unwrap();
            let dir_calls = dir_calls.into_inner().unwrap();

            prop_assert_eq!(file_calls.len(), distinct_files.len());
            prop_assert_eq!(file_calls.into_iter().collect::<BTreeSet<_>>(), distinct_files);
            prop_assert_eq!(dir_calls.len(), distinct_dirs.len());
            prop_assert_eq!(dir_calls.into_iter().collect::<BTreeSet<_>>(), distinct_dirs);
        }
    }
}
