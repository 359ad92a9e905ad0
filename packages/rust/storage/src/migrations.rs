//! Schema migrations for the document store.
//!
//! Applied in order when a database is opened read-write.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, ascending by version.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "documents table keyed by collection",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One JSON document per row; collections are plain labels.
CREATE TABLE IF NOT EXISTS documents (
    id         TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_collection
    ON documents(collection, created_at);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
