//! Local SQLite-backed index
//!
//! Persists documents into `<persist_dir>/docstore.db`. Retrieval itself is
//! delegated to whatever consumes the [`RetrieverDescriptor`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{DocStore, IndexGateway, RetrieverDescriptor};
use crate::types::{Document, RagError, Result};

pub const DOCSTORE_FILE: &str = "docstore.db";

const META_INDEX_ID: &str = "index_id";
const META_CREATED_AT: &str = "created_at";

pub struct SqliteIndex {
    store: DocStore,
    persist_dir: PathBuf,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("persist_dir", &self.persist_dir)
            .finish()
    }
}

impl SqliteIndex {
    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Identifier stamped when the index was built
    pub fn index_id(&self) -> Result<Option<String>> {
        self.store.get_meta(META_INDEX_ID)
    }

    pub fn created_at(&self) -> Result<Option<String>> {
        self.store.get_meta(META_CREATED_AT)
    }

    fn docstore_path(persist_dir: &Path) -> PathBuf {
        persist_dir.join(DOCSTORE_FILE)
    }

    async fn remove_previous(path: &Path) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(suffix);
            match tokio::fs::remove_file(PathBuf::from(candidate)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IndexGateway for SqliteIndex {
    async fn open(persist_dir: &Path) -> Result<Self> {
        let path = Self::docstore_path(persist_dir);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RagError::Index(format!(
                "No index persisted at {}",
                persist_dir.display()
            )));
        }

        let store = DocStore::open(&path)?;
        if !store.is_initialized()? {
            return Err(RagError::Index(format!(
                "Index at {} was never built",
                persist_dir.display()
            )));
        }

        debug!("Opened index at {}", persist_dir.display());
        Ok(Self {
            store,
            persist_dir: persist_dir.to_path_buf(),
        })
    }

    async fn from_documents(documents: Vec<Document>, persist_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(persist_dir).await?;
        let path = Self::docstore_path(persist_dir);
        Self::remove_previous(&path).await?;

        let store = DocStore::open(&path)?;
        store.initialize()?;
        store.set_meta(META_INDEX_ID, &uuid::Uuid::new_v4().to_string())?;
        store.set_meta(META_CREATED_AT, &chrono::Utc::now().to_rfc3339())?;
        let count = store.upsert_documents(&documents)?;

        info!(
            "Built index with {} documents at {}",
            count,
            persist_dir.display()
        );
        Ok(Self {
            store,
            persist_dir: persist_dir.to_path_buf(),
        })
    }

    async fn insert(&self, document: Document) -> Result<()> {
        debug!("Inserting document {}", document.id);
        self.store.upsert_documents(std::slice::from_ref(&document))?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        self.store.count_documents()
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        self.store.load_documents()
    }

    fn retriever_descriptor(
        &self,
        name: &str,
        description: &str,
        similarity_top_k: usize,
    ) -> RetrieverDescriptor {
        RetrieverDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            similarity_top_k,
            persist_dir: self.persist_dir.display().to_string(),
        }
    }
}
