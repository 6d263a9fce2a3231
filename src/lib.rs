//! ragweave - Codebase and Dependency Summaries for Retrieval
//!
//! Builds machine-written documentation for a workspace and for its
//! third-party dependencies, ready to be ingested by a retrieval index.
//!
//! ## Core Pieces
//!
//! - **Serial task queue**: model calls run one at a time, in submission
//!   order, while file reads and manifest lookups fan out freely
//! - **Bottom-up tree aggregation**: file summaries roll up into directory
//!   summaries, each directory after all of its descendants
//! - **Type resolution**: follows a dependency's re-exports across files and
//!   packages to collect its full declaration text
//!
//! ## Quick Start
//!
//! ```ignore
//! use ragweave::{CodePipeline, Config, SqliteIndex, Workspace, create_provider};
//!
//! let config = Config::default();
//! let provider = create_provider(&config.llm.provider_config())?;
//! let pipeline = CodePipeline::new(Workspace::new("."), &config, provider)?;
//! let build = pipeline.build::<SqliteIndex>().await?;
//! println!("{}", build.descriptor.name);
//! ```
//!
//! ## Modules
//!
//! - [`queue`]: strictly serial FIFO task runner
//! - [`tree`]: directory tree and post-order aggregation
//! - [`resolver`]: dependency type resolution and snapshot diffing
//! - [`pipeline`]: code and dependency summarization pipelines
//! - [`index`]: index gateway and the local SQLite document store
//! - [`ai`]: LLM providers, retry, usage metrics

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod index;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod tree;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, TaggingMode};

// Error Types
pub use types::error::{ErrorCategory, RagError, Result, ResultExt};
pub use types::{Document, DocumentKind, DocumentMetadata};

// Building blocks
pub use queue::{QueueStatus, QueuedTask, TaskQueue};
pub use resolver::{DependencySnapshot, DependencyTypeResolver, PackageManifest, TypeResolution};
pub use tree::{DirectoryNode, TreeAggregator};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    CodeBuild, CodePipeline, DependencyBuild, DependencyPipeline, Summarizer, Summary, Workspace,
};

pub use index::{IndexGateway, RetrieverDescriptor, SqliteIndex};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    LlmProvider, MetricsCollector, SharedMetrics, SharedProvider, UsageReport, create_provider,
};

// =============================================================================
// Analyzer Re-exports
// =============================================================================

pub use analyzer::scanner::FileScanner;
