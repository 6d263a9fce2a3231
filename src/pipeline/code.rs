//! Codebase pipeline
//!
//! Enumerates workspace files and summarizes them into the code index. When
//! an index already exists it is opened as-is and nothing is re-summarized.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use super::prompts::{directory_summary_prompt, file_summary_prompt};
use super::{Summarizer, Workspace};
use crate::ai::{MetricsCollector, SharedProvider};
use crate::analyzer::FileScanner;
use crate::config::{Config, TaggingMode};
use crate::constants::retrieval::{CODE_TOOL_DESCRIPTION, CODE_TOOL_NAME, FLAT_CODE_TOOL_NAME};
use crate::index::{IndexGateway, RetrieverDescriptor};
use crate::queue::TaskQueue;
use crate::tree::TreeAggregator;
use crate::types::{Document, DocumentKind, DocumentMetadata, RagError, Result};

/// Outcome of [`CodePipeline::build`]
#[derive(Debug)]
pub struct CodeBuild<I> {
    pub index: I,
    pub descriptor: RetrieverDescriptor,
    /// Files found in the workspace
    pub files: usize,
    /// Documents produced in this run (0 when an existing index was opened)
    pub documents: usize,
    pub rebuilt: bool,
}

pub struct CodePipeline {
    workspace: Workspace,
    scanner: FileScanner,
    summarizer: Summarizer,
    tagging: TaggingMode,
    similarity_top_k: usize,
}

impl CodePipeline {
    /// Must be called inside a Tokio runtime (the pipeline's queue starts here).
    pub fn new(workspace: Workspace, config: &Config, provider: SharedProvider) -> Result<Self> {
        let scanner = FileScanner::new(workspace.root())
            .with_exclude(&config.scan.exclude)?
            .with_max_file_size(config.scan.max_file_size);

        let summarizer = Summarizer::new(
            TaskQueue::new("code"),
            provider,
            Arc::new(MetricsCollector::new("code", config.llm.summary_pricing())),
            &config.llm.summary_model,
            config.llm.temperature,
        );

        Ok(Self {
            workspace,
            scanner,
            summarizer,
            tagging: config.code.tagging,
            similarity_top_k: config.retrieval.similarity_top_k,
        })
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Tool name and description handed to the query layer
    pub fn tool(&self) -> (&'static str, &'static str) {
        match self.tagging {
            TaggingMode::Tree => (CODE_TOOL_NAME, CODE_TOOL_DESCRIPTION),
            TaggingMode::Flat => (FLAT_CODE_TOOL_NAME, CODE_TOOL_DESCRIPTION),
        }
    }

    #[instrument(skip(self), fields(workspace = %self.workspace.root().display(), tagging = %self.tagging))]
    pub async fn build<I: IndexGateway>(&self) -> Result<CodeBuild<I>> {
        let paths = self.scanner.paths()?;
        let persist_dir = self.workspace.code_index_dir();
        let (name, description) = self.tool();

        match I::open(&persist_dir).await {
            Ok(index) => {
                info!("Opened existing code index ({} files in workspace)", paths.len());
                let descriptor =
                    index.retriever_descriptor(name, description, self.similarity_top_k);
                return Ok(CodeBuild {
                    index,
                    descriptor,
                    files: paths.len(),
                    documents: 0,
                    rebuilt: false,
                });
            }
            Err(e) => info!("No usable code index, building from scratch: {}", e),
        }

        if paths.is_empty() {
            return Err(RagError::Index(format!(
                "No files to index in {}",
                self.workspace.root().display()
            )));
        }

        let mtimes = stat_mtimes(self.workspace.root(), &paths).await?;
        info!("Summarizing {} files", paths.len());

        let documents = match self.tagging {
            TaggingMode::Tree => self.summarize_tree(&paths, &mtimes).await?,
            TaggingMode::Flat => self.summarize_flat(&paths, &mtimes).await?,
        };

        info!("{}", self.summarizer.metrics().summary().display());

        let count = documents.len();
        let index = I::from_documents(documents, &persist_dir).await?;
        let descriptor = index.retriever_descriptor(name, description, self.similarity_top_k);

        Ok(CodeBuild {
            index,
            descriptor,
            files: paths.len(),
            documents: count,
            rebuilt: true,
        })
    }

    /// File documents plus one document per directory, root last
    async fn summarize_tree(
        &self,
        paths: &[String],
        mtimes: &HashMap<String, i64>,
    ) -> Result<Vec<Document>> {
        let documents = Mutex::new(Vec::new());
        let summarizer = &self.summarizer;
        let root = self.workspace.root();

        let on_file = |path: String| {
            let read = spawn_read(root.join(&path));
            let documents = &documents;
            async move {
                let summary = summarizer
                    .summarize_with(path.clone(), move || async move {
                        let content = read.await.map_err(join_error)??;
                        Ok::<_, RagError>(file_summary_prompt(&content))
                    })
                    .await?;

                let metadata = DocumentMetadata::file(&path, mtimes.get(&path).copied());
                push(
                    documents,
                    Document::with_front_matter(&path, &summary.text, metadata),
                );
                Ok::<_, RagError>(summary.text)
            }
        };

        let on_directory = |dir: String, children: Vec<String>| {
            let documents = &documents;
            async move {
                debug!(directory = %dir, children = children.len(), "Directory ready");
                let summary = summarizer
                    .summarize(dir.clone(), directory_summary_prompt(&children))
                    .await?;

                push(
                    documents,
                    Document::with_front_matter(
                        &dir,
                        &summary.text,
                        DocumentMetadata::directory(&dir),
                    ),
                );
                Ok::<_, RagError>(summary.text)
            }
        };

        TreeAggregator::traverse(paths, on_file, on_directory).await?;

        documents
            .into_inner()
            .map_err(|_| RagError::Index("Document collection poisoned".to_string()))
    }

    /// One document per file, tagged `code` or `doc`
    async fn summarize_flat(
        &self,
        paths: &[String],
        mtimes: &HashMap<String, i64>,
    ) -> Result<Vec<Document>> {
        let root = self.workspace.root();

        let tasks = paths.iter().map(|path| {
            let read = spawn_read(root.join(path));
            let task = self.summarizer.summarize_with(path.clone(), move || async move {
                let content = read.await.map_err(join_error)??;
                Ok::<_, RagError>(file_summary_prompt(&content))
            });
            async move {
                let summary = task.await?;
                let kind = DocumentKind::classify(path);
                let metadata = DocumentMetadata::tagged(kind, path, mtimes.get(path).copied());
                Ok::<_, RagError>(Document::new(path, summary.text, metadata))
            }
        });

        try_join_all(tasks).await
    }
}

fn push(documents: &Mutex<Vec<Document>>, document: Document) {
    match documents.lock() {
        Ok(mut docs) => docs.push(document),
        Err(poisoned) => poisoned.into_inner().push(document),
    }
}

/// Start reading a file right away; the queued call awaits the result
fn spawn_read(path: PathBuf) -> tokio::task::JoinHandle<Result<String>> {
    tokio::spawn(async move {
        let bytes = tokio::fs::read(&path).await?;
        Ok::<_, RagError>(String::from_utf8_lossy(&bytes).into_owned())
    })
}

fn join_error(e: tokio::task::JoinError) -> RagError {
    RagError::Io(std::io::Error::other(e.to_string()))
}

/// Modification time (ms since epoch) of every path, gathered concurrently
async fn stat_mtimes(root: &Path, paths: &[String]) -> Result<HashMap<String, i64>> {
    let stats = paths.iter().map(|path| async move {
        let metadata = tokio::fs::metadata(root.join(path)).await?;
        let modified: chrono::DateTime<chrono::Utc> = metadata.modified()?.into();
        Ok::<_, RagError>((path.clone(), modified.timestamp_millis()))
    });

    Ok(try_join_all(stats).await?.into_iter().collect())
}
