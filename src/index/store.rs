//! Document Store with Connection Pooling
//!
//! SQLite file holding one index's documents:
//! - Connection pooling via r2d2
//! - Panic-safe transactions with automatic rollback
//! - WAL mode

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::types::{Document, DocumentMetadata, RagError, Result, ResultExt};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    text        TEXT NOT NULL,
    metadata    TEXT NOT NULL,
    doc_type    TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(doc_type);

CREATE TABLE IF NOT EXISTS index_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Current schema version
const SCHEMA_VERSION: u32 = 1;

const MAX_POOL_SIZE: u32 = 4;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Pooled handle to one `docstore.db`
pub struct DocStore {
    pool: Pool<SqliteConnectionManager>,
}

impl DocStore {
    /// Open (creating if needed) the store file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(MAX_POOL_SIZE)
            .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .build(manager)
            .map_err(|e| RagError::Index(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| RagError::Index(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| RagError::Index(format!("Failed to acquire store connection: {}", e)))
    }

    /// Create tables and stamp the schema version.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize store schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    /// Whether the schema was ever created in this file
    pub fn is_initialized(&self) -> Result<bool> {
        let conn = self.conn()?;
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .with_context("Failed to read schema version")?;
        Ok(version >= SCHEMA_VERSION)
    }

    /// Run `f` inside a transaction. Errors and panics roll back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(RagError::Index(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Insert or replace documents atomically
    pub fn upsert_documents(&self, documents: &[Document]) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        self.transaction(|conn| {
            let mut stmt = conn
                .prepare(
                    "INSERT OR REPLACE INTO documents (id, text, metadata, doc_type, inserted_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .with_context("Failed to prepare document insert")?;

            for document in documents {
                let metadata = serde_json::to_string(&document.metadata)?;
                stmt.execute(params![
                    document.id,
                    document.text,
                    metadata,
                    document.metadata.doc_type,
                    now,
                ])
                .with_context_fn(|| format!("Failed to store document {}", document.id))?;
            }
            Ok(documents.len())
        })
    }

    pub fn count_documents(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .with_context("Failed to count documents")?;
        Ok(count as usize)
    }

    /// All documents ordered by id
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, text, metadata FROM documents ORDER BY id")
            .with_context("Failed to prepare document query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .with_context("Failed to query documents")?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, text, metadata) = row?;
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)?;
            documents.push(Document { id, text, metadata });
        }
        Ok(documents)
    }

    // =========================================================================
    // Index metadata
    // =========================================================================

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .with_context_fn(|| format!("Failed to store index meta {}", key))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context_fn(|| format!("Failed to read index meta {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DocStore {
        let store = DocStore::open_in_memory().expect("Failed to open in-memory store");
        store.initialize().expect("Failed to initialize schema");
        store
    }

    #[test]
    fn test_initialize_creates_tables() {
        let store = store();
        assert!(store.is_initialized().unwrap());

        let conn = store.conn().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(tables, vec!["documents", "index_meta"]);
    }

    #[test]
    fn test_fresh_store_is_not_initialized() {
        let store = DocStore::open_in_memory().unwrap();
        assert!(!store.is_initialized().unwrap());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = store();
        let first = Document::new("lodash", "old", DocumentMetadata::dependency("lodash"));
        let second = Document::new("lodash", "new", DocumentMetadata::dependency("lodash"));

        store.upsert_documents(&[first]).unwrap();
        store.upsert_documents(&[second.clone()]).unwrap();

        assert_eq!(store.count_documents().unwrap(), 1);
        assert_eq!(store.load_documents().unwrap(), vec![second]);
    }

    #[test]
    fn test_transaction_panic_rolls_back() {
        let store = store();

        let result: Result<()> = store.transaction(|conn| {
            conn.execute(
                "INSERT INTO index_meta (key, value) VALUES ('k', 'v')",
                [],
            )?;
            panic!("Intentional panic for testing");
        });

        assert!(result.unwrap_err().to_string().contains("panicked"));
        assert_eq!(store.get_meta("k").unwrap(), None);
    }

    #[test]
    fn test_meta_roundtrip() {
        let store = store();
        store.set_meta("created_at", "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(
            store.get_meta("created_at").unwrap().as_deref(),
            Some("2026-01-01T00:00:00Z")
        );
    }
}
