//! Retrieval Index Gateway
//!
//! The pipelines only ever talk to an index through [`IndexGateway`]:
//! open an existing persisted index, build a fresh one from documents, or
//! add documents to an opened one. Similarity search lives behind the
//! [`RetrieverDescriptor`] handed to the downstream query tool.

mod sqlite;
pub mod store;

pub use sqlite::{DOCSTORE_FILE, SqliteIndex};
pub use store::DocStore;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::types::{Document, Result};

/// Query-tool hand-off for an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrieverDescriptor {
    pub name: String,
    pub description: String,
    pub similarity_top_k: usize,
    pub persist_dir: String,
}

#[async_trait]
pub trait IndexGateway: Send + Sync + Sized {
    /// Open a previously persisted index. Fails when none exists; callers
    /// treat that as "build from scratch".
    async fn open(persist_dir: &Path) -> Result<Self>;

    /// Build and persist a fresh index, replacing any previous one
    async fn from_documents(documents: Vec<Document>, persist_dir: &Path) -> Result<Self>;

    /// Add one document; an existing document with the same id is replaced
    async fn insert(&self, document: Document) -> Result<()>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn documents(&self) -> Result<Vec<Document>>;

    fn retriever_descriptor(
        &self,
        name: &str,
        description: &str,
        similarity_top_k: usize,
    ) -> RetrieverDescriptor;
}
