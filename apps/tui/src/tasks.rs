//! Operations the TUI runs on behalf of its screens.

use std::path::Path;

use color_eyre::eyre::Result;
use tracing::info;

use searchagent_core::{
    DEFAULT_DELIMITER, DocumentSink, EnrichmentPipeline, InputTable, SheetTarget, SilentProgress,
    SinkOutcome, SpreadsheetSink, persist,
};
use searchagent_google::{BearerToken, GenerativeClient, SheetsClient};
use searchagent_news::{NewsClient, NewsError};
use searchagent_search::SearchClient;
use searchagent_shared::{AppConfig, NewsItem, ResultTable};
use searchagent_storage::Storage;

use crate::screens::EnrichRequest;

const PREVIEW_ROWS: usize = 5;

/// Header and first rows of the input table.
pub(crate) fn preview(input: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let table = InputTable::from_path(input, DEFAULT_DELIMITER)?;
    Ok((table.headers().to_vec(), table.preview(PREVIEW_ROWS).to_vec()))
}

/// A finished run: the table plus one display line per sink. Sink failures
/// are reported in `sink_lines` and never drop `results`.
pub(crate) struct EnrichOutcome {
    pub results: ResultTable,
    pub sink_lines: Vec<(String, bool)>,
}

pub(crate) async fn enrich(
    config: &AppConfig,
    token: &BearerToken,
    request: &EnrichRequest,
) -> Result<EnrichOutcome> {
    let table = InputTable::from_path(&request.input, DEFAULT_DELIMITER)?;
    let rows = table.entity_rows(&request.column)?;

    let search = SearchClient::from_config(&config.search)?;
    let summarizer = GenerativeClient::from_config(&config.generation, token.clone())?;
    let results = EnrichmentPipeline::new(&search, &summarizer)
        .run(&rows, &request.query, &SilentProgress)
        .await;

    // Setup errors become that sink's outcome; the table is kept either way.
    let storage = Storage::open(&config.document_store.resolve_path()).await;
    let documents = storage
        .as_ref()
        .map(|storage| DocumentSink::new(storage, config.document_store.collection.as_str()))
        .map_err(|e| e.to_string());

    let target = SheetTarget::new(&request.sheet_id, &request.range);
    let sheets_client = target.as_ref().map(|_| {
        SheetsClient::from_config(&config.sheets, token.clone()).map_err(|e| e.to_string())
    });
    let sheets = sheets_client
        .as_ref()
        .map(|client| client.as_ref().map(SpreadsheetSink::new).map_err(|e| e.clone()));
    let spreadsheet = sheets
        .as_ref()
        .zip(target.as_ref())
        .map(|(sink, target)| (sink.as_ref().map_err(|e| e.clone()), target));

    let report = persist(&results, documents.as_ref().map_err(|e| e.clone()), spreadsheet).await;
    info!(
        rows = results.len(),
        persisted = report.all_succeeded(),
        "enrichment finished"
    );

    let mut sink_lines = vec![line("Documents", &report.document)];
    match &report.spreadsheet {
        Some(outcome) => sink_lines.push(line("Sheet", outcome)),
        None => sink_lines.push(("Sheet: skipped (no sheet ID and range)".to_string(), true)),
    }

    Ok(EnrichOutcome {
        results,
        sink_lines,
    })
}

fn line(label: &str, outcome: &SinkOutcome) -> (String, bool) {
    (format!("{label}: {outcome}"), outcome.is_success())
}

/// Fetch related news. The error side is the message to show.
pub(crate) async fn news(config: &AppConfig, query: &str) -> Result<Vec<NewsItem>, String> {
    let client = NewsClient::from_config(&config.news).map_err(|e| e.to_string())?;
    client.fetch(query).await.map_err(|e: NewsError| e.to_string())
}
