//! Core domain types for the enrichment pipeline and news feed.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Substituted for `Result` when the search provider returned no usable link.
pub const NO_RESULT: &str = "No result found";

/// Substituted for `Result` when the search request itself failed.
pub const LOOKUP_ERROR: &str = "Error fetching results.";

/// Substituted for `Summarized Result` when the generation response had no text.
pub const NO_SUMMARY: &str = "No summary available.";

/// Column order used by every tabular rendering of a [`ResultTable`].
pub const RESULT_COLUMNS: [&str; 4] = ["Entity", "Query", "Result", "Summarized Result"];

// ---------------------------------------------------------------------------
// EntityRow
// ---------------------------------------------------------------------------

/// One input record: the entity value plus the row's remaining columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Value of the caller-selected entity column.
    pub entity: String,
    /// Every other `(header, value)` pair, in header order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<(String, String)>,
}

impl EntityRow {
    /// Create a row with no pass-through columns.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// LookupResult
// ---------------------------------------------------------------------------

/// The enriched record produced for one [`EntityRow`].
///
/// Field names serialize exactly as the sinks expect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Query")]
    pub query: String,
    /// Resolved link, or [`NO_RESULT`] / [`LOOKUP_ERROR`].
    #[serde(rename = "Result")]
    pub result: String,
    /// Generated summary, [`NO_SUMMARY`], or an `Error: ...` string.
    #[serde(rename = "Summarized Result")]
    pub summary: String,
}

impl LookupResult {
    /// Cells in [`RESULT_COLUMNS`] order.
    pub fn cells(&self) -> [&str; 4] {
        [&self.entity, &self.query, &self.result, &self.summary]
    }
}

// ---------------------------------------------------------------------------
// ResultTable
// ---------------------------------------------------------------------------

/// Ordered results of one pipeline run. Row order equals input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<LookupResult>,
}

impl ResultTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append a result at the end of the table.
    pub fn push(&mut self, result: LookupResult) {
        self.rows.push(result);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LookupResult> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[LookupResult] {
        &self.rows
    }

    /// Rectangular string grid, one row per result, no header row.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.cells().iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

impl FromIterator<LookupResult> for ResultTable {
    fn from_iter<I: IntoIterator<Item = LookupResult>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a LookupResult;
    type IntoIter = std::slice::Iter<'a, LookupResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// NewsItem
// ---------------------------------------------------------------------------

/// A single related news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub url: String,
}
