//! Delimited input tables.
//!
//! The first record is the header. Rows shorter than the header are padded
//! with empty cells; cells past the last header column are dropped.

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use searchagent_shared::{EntityRow, Result, SearchAgentError};

pub const DEFAULT_DELIMITER: u8 = b',';

/// A parsed input table: header plus rectangular rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl InputTable {
    /// Read and parse the file at `path`.
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| SearchAgentError::io(path, e))?;
        Self::from_reader(file, delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv
            .headers()
            .map_err(|e| SearchAgentError::parse(format!("failed to read header row: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(SearchAgentError::validation("input table has no header row"));
        }
        if let Some(position) = headers.iter().position(String::is_empty) {
            return Err(SearchAgentError::validation(format!(
                "header cell {} is empty",
                position + 1
            )));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for (index, record) in csv.records().enumerate() {
            let record = record.map_err(|e| {
                SearchAgentError::parse(format!("failed to read row {}: {e}", index + 1))
            })?;
            if record.len() > width {
                warn!(
                    row = index + 1,
                    cells = record.len(),
                    width,
                    "row is wider than the header, extra cells dropped"
                );
            }
            let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        debug!(columns = width, rows = rows.len(), "input table parsed");
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows, for display before a run.
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Project `column` into entity rows, one per table row, in table order.
    ///
    /// The other columns ride along as `(header, value)` pairs.
    pub fn entity_rows(&self, column: &str) -> Result<Vec<EntityRow>> {
        let column = column.trim();
        let index = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| {
                SearchAgentError::validation(format!(
                    "column '{column}' not found (available: {})",
                    self.headers.join(", ")
                ))
            })?;

        Ok(self
            .rows
            .iter()
            .map(|row| EntityRow {
                entity: row[index].clone(),
                columns: self
                    .headers
                    .iter()
                    .zip(row)
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, (h, v))| (h.clone(), v.clone()))
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "../../../fixtures/csv/entities.csv";

    #[test]
    fn parses_fixture_with_quoted_cells() {
        let table = InputTable::from_path(Path::new(FIXTURE), DEFAULT_DELIMITER).expect("parse");
        assert_eq!(table.headers(), ["Company", "Country", "Employees"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.preview(10)[2][0], "Initech, Inc.");
    }

    #[test]
    fn entity_rows_keep_order_and_duplicates() {
        let table = InputTable::from_path(Path::new(FIXTURE), DEFAULT_DELIMITER).unwrap();
        let rows = table.entity_rows("Company").expect("project");

        let entities: Vec<&str> = rows.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(entities, ["Acme", "Globex", "Initech, Inc.", "Acme"]);
        assert_eq!(
            rows[3].columns,
            vec![
                ("Country".to_string(), "CA".to_string()),
                ("Employees".to_string(), "150".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_column_is_a_validation_error() {
        let table = InputTable::from_reader("Company\nAcme\n".as_bytes(), b',').unwrap();
        let err = table.entity_rows("Name").unwrap_err();
        assert!(matches!(err, SearchAgentError::Validation { .. }));
        assert!(err.to_string().contains("Company"));
    }

    #[test]
    fn ragged_rows_are_padded_and_truncated() {
        let input = "a;b;c\n1\n1;2;3;4\n";
        let table = InputTable::from_reader(input.as_bytes(), b';').unwrap();
        assert_eq!(table.preview(2), [
            vec!["1".to_string(), String::new(), String::new()],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        ]);
    }

    #[test]
    fn header_only_table_is_empty() {
        let table = InputTable::from_reader("Company,Country\n".as_bytes(), b',').unwrap();
        assert!(table.is_empty());
        assert!(table.entity_rows("Company").unwrap().is_empty());
        assert!(table.preview(5).is_empty());
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = InputTable::from_reader("".as_bytes(), b',').unwrap_err();
        assert!(err.to_string().contains("no header"));
    }

    #[test]
    fn blank_header_cell_is_rejected() {
        let err = InputTable::from_reader("Company, ,Employees\nAcme,US,10\n".as_bytes(), b',')
            .unwrap_err();
        assert!(matches!(err, SearchAgentError::Validation { .. }));
        assert!(err.to_string().contains("header cell 2"));
    }
}
