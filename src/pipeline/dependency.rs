//! Dependency pipeline
//!
//! Writes usage guides for dependencies that are new since the last run.
//! The persisted snapshot is compared by name only, so a version bump of an
//! already documented dependency does not trigger a new guide.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use super::prompts::{usage_guide_prompt, usage_guide_with_readme_prompt};
use super::{Summarizer, Workspace};
use crate::ai::{MetricsCollector, SharedProvider, UsageReport};
use crate::config::Config;
use crate::constants::retrieval::{DEPENDENCY_TOOL_DESCRIPTION, DEPENDENCY_TOOL_NAME};
use crate::index::{IndexGateway, RetrieverDescriptor};
use crate::queue::TaskQueue;
use crate::resolver::{DependencySnapshot, DependencyTypeResolver, PackageManifest};
use crate::types::{Document, DocumentMetadata, Result};

/// Outcome of [`DependencyPipeline::build`]
#[derive(Debug)]
pub struct DependencyBuild<I> {
    pub index: I,
    pub descriptor: RetrieverDescriptor,
    /// Dependencies that were not in the snapshot
    pub missing: Vec<String>,
    /// Usage report of every guide written in this run, by entry name
    pub guides: Vec<(String, UsageReport)>,
}

/// One prompt per resolved entry point
#[derive(Debug)]
struct GuideRequest {
    name: String,
    prompt: String,
}

pub struct DependencyPipeline {
    workspace: Workspace,
    resolver: DependencyTypeResolver,
    summarizer: Summarizer,
    similarity_top_k: usize,
}

impl DependencyPipeline {
    /// Must be called inside a Tokio runtime (the pipeline's queue starts here).
    pub fn new(workspace: Workspace, config: &Config, provider: SharedProvider) -> Self {
        let resolver = DependencyTypeResolver::new(workspace.root());
        let summarizer = Summarizer::new(
            TaskQueue::new("dependencies"),
            provider,
            Arc::new(MetricsCollector::new("dependencies", config.llm.guide_pricing())),
            &config.llm.guide_model,
            config.llm.temperature,
        );

        Self {
            workspace,
            resolver,
            summarizer,
            similarity_top_k: config.retrieval.similarity_top_k,
        }
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    #[instrument(skip(self), fields(workspace = %self.workspace.root().display()))]
    pub async fn build<I: IndexGateway>(&self) -> Result<DependencyBuild<I>> {
        let state_path = self.workspace.dependency_state_path();
        let manifest_path = self.workspace.package_manifest_path();

        let (snapshot, manifest) = tokio::join!(
            DependencySnapshot::load(&state_path),
            PackageManifest::load(&manifest_path)
        );
        let manifest = manifest?;

        let missing = snapshot.missing(&manifest.dependencies);
        info!(
            "{} of {} dependencies need usage guides",
            missing.len(),
            manifest.dependencies.len()
        );

        // All-or-nothing: one broken dependency aborts the batch.
        let requests: Vec<GuideRequest> =
            try_join_all(missing.iter().map(|name| self.prepare(name)))
                .await?
                .into_iter()
                .flatten()
                .collect();

        let tasks = requests.into_iter().map(|request| {
            let task = self.summarizer.summarize(request.name.clone(), request.prompt);
            async move { task.await.map(|summary| (request.name, summary)) }
        });
        let summaries = try_join_all(tasks).await?;

        let mut documents = Vec::with_capacity(summaries.len());
        let mut guides = Vec::with_capacity(summaries.len());
        for (name, summary) in summaries {
            info!(entry = %name, "Usage guide written: {}", summary.usage);
            documents.push(Document::new(
                &name,
                summary.text,
                DocumentMetadata::dependency(&name),
            ));
            guides.push((name, summary.usage));
        }

        if !guides.is_empty() {
            info!("{}", self.summarizer.metrics().summary().display());
        }

        let persist_dir = self.workspace.dependency_index_dir();
        let index = match I::open(&persist_dir).await {
            Ok(index) => {
                debug!("Inserting {} guides into existing index", documents.len());
                for document in documents {
                    index.insert(document).await?;
                }
                index
            }
            Err(e) => {
                info!("No usable dependency index, building from scratch: {}", e);
                I::from_documents(documents, &persist_dir).await?
            }
        };

        DependencySnapshot::new(manifest.dependencies).save(&state_path).await?;

        let descriptor = index.retriever_descriptor(
            DEPENDENCY_TOOL_NAME,
            DEPENDENCY_TOOL_DESCRIPTION,
            self.similarity_top_k,
        );
        Ok(DependencyBuild {
            index,
            descriptor,
            missing,
            guides,
        })
    }

    /// Resolve types and read the README of one dependency
    async fn prepare(&self, dependency: &str) -> Result<Vec<GuideRequest>> {
        let (resolutions, readme) = tokio::join!(
            self.resolver.resolve(dependency),
            self.resolver.readme(dependency)
        );
        let readme = readme.unwrap_or_default();

        Ok(resolutions?
            .into_iter()
            .map(|resolution| {
                let prompt = if resolution.name == dependency {
                    usage_guide_with_readme_prompt(dependency, &readme, &resolution.types)
                } else {
                    usage_guide_prompt(dependency, &resolution.types)
                };
                GuideRequest {
                    name: resolution.name,
                    prompt,
                }
            })
            .collect())
    }
}
