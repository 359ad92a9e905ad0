//! Result sinks and the fan-out that feeds them.
//!
//! Two independent sinks receive the same finished [`ResultTable`]:
//! a document store (one appended document per row) and a spreadsheet
//! (one bulk overwrite of an A1 range). Neither sink retries, and a failure
//! in one never rolls back or skips the other.

use std::fmt;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use searchagent_google::SheetsClient;
use searchagent_shared::{Result, ResultTable};
use searchagent_storage::Storage;

/// What happened when a sink consumed a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written { rows: usize },
    /// Rows before the failing one stay persisted.
    PartialFailure { written: usize, reason: String },
    Failed { reason: String },
}

impl SinkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written { rows } => write!(f, "wrote {rows} rows"),
            Self::PartialFailure { written, reason } => {
                write!(f, "failed after {written} rows: {reason}")
            }
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

/// Append-only JSON document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn append(&self, collection: &str, body: &serde_json::Value) -> Result<String>;
}

#[async_trait]
impl DocumentStore for Storage {
    async fn append(&self, collection: &str, body: &serde_json::Value) -> Result<String> {
        self.append_document(collection, body).await
    }
}

/// Writes each result as its own document in one collection.
pub struct DocumentSink<'a> {
    store: &'a dyn DocumentStore,
    collection: String,
}

impl<'a> DocumentSink<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Append every row in table order, stopping at the first failure.
    #[instrument(skip_all, fields(collection = %self.collection, rows = table.len()))]
    pub async fn write_all(&self, table: &ResultTable) -> SinkOutcome {
        let mut written = 0usize;
        for result in table {
            let body = match serde_json::to_value(result) {
                Ok(body) => body,
                Err(e) => {
                    return self.partial(written, format!("failed to encode row: {e}"));
                }
            };
            if let Err(e) = self.store.append(&self.collection, &body).await {
                return self.partial(written, e.to_string());
            }
            written += 1;
        }

        info!(rows = written, "documents written");
        SinkOutcome::Written { rows: written }
    }

    fn partial(&self, written: usize, reason: String) -> SinkOutcome {
        warn!(written, reason = %reason, "document sink stopped early");
        SinkOutcome::PartialFailure { written, reason }
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// Where the spreadsheet sink writes. Both parts are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    spreadsheet_id: String,
    range: String,
}

impl SheetTarget {
    /// `None` when either the id or the range is blank.
    pub fn new(spreadsheet_id: &str, range: &str) -> Option<Self> {
        let (id, range) = (spreadsheet_id.trim(), range.trim());
        if id.is_empty() || range.is_empty() {
            return None;
        }
        Some(Self {
            spreadsheet_id: id.to_string(),
            range: range.to_string(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn range(&self) -> &str {
        &self.range
    }
}

/// Overwrites a sheet range with the table as a raw grid.
pub struct SpreadsheetSink<'a> {
    client: &'a SheetsClient,
}

impl<'a> SpreadsheetSink<'a> {
    pub fn new(client: &'a SheetsClient) -> Self {
        Self { client }
    }

    #[instrument(skip_all, fields(spreadsheet_id = %target.spreadsheet_id, range = %target.range))]
    pub async fn write_all(&self, table: &ResultTable, target: &SheetTarget) -> SinkOutcome {
        let grid = table.to_grid();
        match self
            .client
            .update_values(&target.spreadsheet_id, &target.range, &grid)
            .await
        {
            Ok(_) => SinkOutcome::Written { rows: grid.len() },
            Err(e) => {
                warn!(error = %e, "spreadsheet write failed");
                SinkOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Per-sink outcomes of one [`persist`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub document: SinkOutcome,
    /// `None` when no sheet target was given.
    pub spreadsheet: Option<SinkOutcome>,
}

impl SinkReport {
    pub fn all_succeeded(&self) -> bool {
        self.document.is_success()
            && self.spreadsheet.as_ref().is_none_or(SinkOutcome::is_success)
    }
}

/// A sink ready to write, or the reason it could not be set up.
pub type SinkSetup<'s, T> = std::result::Result<&'s T, String>;

/// Hand `table` to the document sink, then to the spreadsheet sink if one is
/// configured, regardless of how the first write went.
///
/// A sink whose setup failed is reported as [`SinkOutcome::Failed`] and
/// the other sink is still attempted.
pub async fn persist(
    table: &ResultTable,
    documents: SinkSetup<'_, DocumentSink<'_>>,
    spreadsheet: Option<(SinkSetup<'_, SpreadsheetSink<'_>>, &SheetTarget)>,
) -> SinkReport {
    let document = match documents {
        Ok(sink) => sink.write_all(table).await,
        Err(reason) => setup_failed("document", reason),
    };
    let spreadsheet = match spreadsheet {
        Some((Ok(sink), target)) => Some(sink.write_all(table, target).await),
        Some((Err(reason), _)) => Some(setup_failed("spreadsheet", reason)),
        None => None,
    };
    SinkReport {
        document,
        spreadsheet,
    }
}

fn setup_failed(sink: &str, reason: String) -> SinkOutcome {
    warn!(sink, reason = %reason, "sink unavailable, write skipped");
    SinkOutcome::Failed { reason }
}
