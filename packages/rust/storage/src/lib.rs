//! Embedded libSQL document store.
//!
//! The [`Storage`] struct wraps a local libSQL database holding JSON documents
//! grouped by collection. Documents are append-only: each write creates a new
//! row with a time-ordered id, and nothing is updated in place.
//!
//! **Access rules:**
//! - enrichment runs write through [`Storage::open`]
//! - the `history` command reads through [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use searchagent_shared::{Result, SearchAgentError};
use serde::Serialize;
use uuid::Uuid;

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: String,
    pub collection: String,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SearchAgentError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without applying migrations.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SearchAgentError::Storage(format!(
                "no document store at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        SearchAgentError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            // schema_migrations does not exist yet
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SearchAgentError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Append `body` as a new document in `collection`. Returns the new id.
    pub async fn append_document(
        &self,
        collection: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let body = serde_json::to_string(body)
            .map_err(|e| SearchAgentError::Storage(format!("failed to encode document: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO documents (id, collection, body, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), collection, body.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        tracing::debug!(collection, id = %id, "document appended");
        Ok(id)
    }

    /// All documents in `collection`, oldest first.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, collection, body, created_at FROM documents
                 WHERE collection = ?1 ORDER BY created_at, id",
                params![collection],
            )
            .await
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => results.push(row_to_document(&row)?),
                Ok(None) => break,
                Err(e) => return Err(SearchAgentError::Storage(e.to_string())),
            }
        }
        Ok(results)
    }

    /// Number of documents in `collection`.
    pub async fn count_documents(&self, collection: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
            )
            .await
            .map_err(|e| SearchAgentError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| SearchAgentError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(SearchAgentError::Storage(e.to_string())),
        }
    }
}

fn row_to_document(row: &libsql::Row) -> Result<StoredDocument> {
    let get_str = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| SearchAgentError::Storage(e.to_string()))
    };

    let body_raw = get_str(2)?;
    let body = serde_json::from_str(&body_raw)
        .map_err(|e| SearchAgentError::parse(format!("stored document is not JSON: {e}")))?;

    let created_raw = get_str(3)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SearchAgentError::parse(format!("invalid created_at '{created_raw}': {e}")))?;

    Ok(StoredDocument {
        id: get_str(0)?,
        collection: get_str(1)?,
        body,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("sa_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_creates_schema() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("sa_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn append_and_list_preserve_order() {
        let storage = test_storage().await;
        let first = json!({"Entity": "Acme", "Result": "http://a"});
        let second = json!({"Entity": "Globex", "Result": "No result found"});

        let id1 = storage
            .append_document("search_results", &first)
            .await
            .expect("append first");
        let id2 = storage
            .append_document("search_results", &second)
            .await
            .expect("append second");
        assert_ne!(id1, id2);

        let docs = storage
            .list_documents("search_results")
            .await
            .expect("list");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, id1);
        assert_eq!(docs[0].body, first);
        assert_eq!(docs[1].body, second);
        assert!(docs.iter().all(|d| d.collection == "search_results"));
    }

    #[tokio::test]
    async fn identical_bodies_are_separate_documents() {
        let storage = test_storage().await;
        let body = json!({"Entity": "Acme"});
        storage.append_document("c", &body).await.unwrap();
        storage.append_document("c", &body).await.unwrap();
        assert_eq!(storage.count_documents("c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let storage = test_storage().await;
        storage
            .append_document("search_results", &json!({"n": 1}))
            .await
            .unwrap();
        storage
            .append_document("other", &json!({"n": 2}))
            .await
            .unwrap();

        assert_eq!(storage.count_documents("search_results").await.unwrap(), 1);
        assert_eq!(storage.count_documents("missing").await.unwrap(), 0);
        assert!(storage.list_documents("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("sa_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.append_document("c", &json!({"a": 1})).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_documents("c").await.unwrap().len(), 1);

        let result = ro.append_document("c", &json!({"a": 2})).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_missing_file_is_an_error() {
        let tmp = std::env::temp_dir().join(format!("sa_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
