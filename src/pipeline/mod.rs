//! Summarization Pipelines
//!
//! Turns a workspace into documents for two retrieval indexes:
//!
//! - [`CodePipeline`]: file and directory summaries driven by the
//!   [`TreeAggregator`](crate::tree::TreeAggregator), or flat per-file
//!   summaries tagged by extension
//! - [`DependencyPipeline`]: usage guides for dependencies that are not yet
//!   in the persisted snapshot
//!
//! Each pipeline owns its own [`TaskQueue`](crate::queue::TaskQueue), so
//! the two can run side by side without blocking each other's model calls.

pub mod code;
pub mod dependency;
pub mod prompts;
pub mod summarizer;

pub use code::{CodeBuild, CodePipeline};
pub use dependency::{DependencyBuild, DependencyPipeline};
pub use summarizer::{Summarizer, Summary};

use std::path::{Path, PathBuf};

use crate::constants::packages::PACKAGE_MANIFEST;
use crate::constants::workspace::{
    CODE_EMBEDDINGS_DIR, CONFIG_FILE, DATA_DIR, DEPENDENCY_EMBEDDINGS_DIR, DEPENDENCY_STATE_FILE,
};

/// Folder layout of one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `.ragweave/`
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn code_index_dir(&self) -> PathBuf {
        self.data_dir().join(CODE_EMBEDDINGS_DIR)
    }

    pub fn dependency_index_dir(&self) -> PathBuf {
        self.data_dir().join(DEPENDENCY_EMBEDDINGS_DIR)
    }

    pub fn dependency_state_path(&self) -> PathBuf {
        self.data_dir().join(DEPENDENCY_STATE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join(CONFIG_FILE)
    }

    pub fn package_manifest_path(&self) -> PathBuf {
        self.root.join(PACKAGE_MANIFEST)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model double shared by pipeline tests

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::ai::{Completion, CompletionRequest, LlmProvider, TokenUsage};
    use crate::types::Result;

    type Reply = Box<dyn Fn(usize, &str) -> Option<String> + Send + Sync>;

    /// Records every prompt and answers from a script keyed by call number
    pub(crate) struct ScriptedProvider {
        prompts: Mutex<Vec<String>>,
        reply: Reply,
        usage: Option<TokenUsage>,
    }

    impl ScriptedProvider {
        /// Answers call `n` with `summary #n`
        pub(crate) fn numbered() -> Arc<Self> {
            Self::replying(|n, _| Some(format!("summary #{}", n)))
        }

        pub(crate) fn replying(
            reply: impl Fn(usize, &str) -> Option<String> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Box::new(reply),
                usage: None,
            })
        }

        pub(crate) fn with_usage(self: Arc<Self>, usage: TokenUsage) -> Arc<Self> {
            let mut provider = Arc::into_inner(self).expect("provider not yet shared");
            provider.usage = Some(usage);
            Arc::new(provider)
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            let call = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(request.prompt.clone());
                prompts.len() - 1
            };

            Ok(Completion {
                content: (self.reply)(call, &request.prompt),
                usage: self.usage,
                model: request.model.clone(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }
}
