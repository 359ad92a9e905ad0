//! Per-row enrichment: look up the query, then summarize the link.
//!
//! Rows are processed strictly one after another in input order. Neither
//! step can fail from the loop's point of view: both return a string, which
//! is either real content or a sentinel, so every input row yields exactly
//! one [`LookupResult`].

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use searchagent_google::GenerativeClient;
use searchagent_search::SearchClient;
use searchagent_shared::{EntityRow, LOOKUP_ERROR, LookupResult, NO_RESULT, ResultTable};

/// Resolves a query to a single result string.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> String;
}

/// Condenses a lookup result into a short summary string.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> String;
}

#[async_trait]
impl EntityLookup for SearchClient {
    async fn lookup(&self, query: &str) -> String {
        SearchClient::lookup(self, query).await
    }
}

#[async_trait]
impl Summarizer for GenerativeClient {
    async fn summarize(&self, text: &str) -> String {
        GenerativeClient::summarize(self, text).await
    }
}

/// Progress callback for reporting per-row status.
pub trait PipelineProgress: Send + Sync {
    /// Called before the lookup for row `index` (zero-based).
    fn row_started(&self, index: usize, total: usize, entity: &str);
    /// Called once the row's result is in the table.
    fn row_finished(&self, index: usize, total: usize, result: &LookupResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {
    fn row_started(&self, _index: usize, _total: usize, _entity: &str) {}
    fn row_finished(&self, _index: usize, _total: usize, _result: &LookupResult) {}
}

/// Lookup followed by summarization, once per row.
pub struct EnrichmentPipeline<'a> {
    lookup: &'a dyn EntityLookup,
    summarizer: &'a dyn Summarizer,
}

impl<'a> EnrichmentPipeline<'a> {
    pub fn new(lookup: &'a dyn EntityLookup, summarizer: &'a dyn Summarizer) -> Self {
        Self { lookup, summarizer }
    }

    /// Enrich every row with the same `query`.
    ///
    /// Identical entities are not deduplicated; each row costs one lookup and
    /// one summarization call.
    #[instrument(skip_all, fields(rows = rows.len(), query = %query))]
    pub async fn run(
        &self,
        rows: &[EntityRow],
        query: &str,
        progress: &dyn PipelineProgress,
    ) -> ResultTable {
        let total = rows.len();
        info!(total, "starting enrichment run");

        let mut table = ResultTable::with_capacity(total);
        let mut degraded = 0usize;

        for (index, row) in rows.iter().enumerate() {
            progress.row_started(index, total, &row.entity);

            let result = self.lookup.lookup(query).await;
            if result == NO_RESULT || result == LOOKUP_ERROR {
                degraded += 1;
                warn!(index, entity = %row.entity, result = %result, "lookup produced no link");
            }
            let summary = self.summarizer.summarize(&result).await;

            let enriched = LookupResult {
                entity: row.entity.clone(),
                query: query.to_string(),
                result,
                summary,
            };
            progress.row_finished(index, total, &enriched);
            table.push(enriched);
        }

        info!(total, degraded, "enrichment run complete");
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchagent_shared::NO_SUMMARY;
    use std::sync::Mutex;

    /// Lookup that replays a fixed sequence of answers and records its calls.
    struct ScriptedLookup {
        answers: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().rev().map(|a| a.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EntityLookup for ScriptedLookup {
        async fn lookup(&self, query: &str) -> String {
            self.calls.lock().unwrap().push(query.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| NO_RESULT.to_string())
        }
    }

    /// Summarizer that knows one link and records every input.
    struct KnownLinkSummarizer {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Summarizer for KnownLinkSummarizer {
        async fn summarize(&self, text: &str) -> String {
            self.calls.lock().unwrap().push(text.to_string());
            if text == "http://a" {
                "Acme HQ is in X".to_string()
            } else {
                NO_SUMMARY.to_string()
            }
        }
    }

    fn summarizer() -> KnownLinkSummarizer {
        KnownLinkSummarizer {
            calls: Mutex::new(Vec::new()),
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgress for RecordingProgress {
        fn row_started(&self, index: usize, total: usize, entity: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {index}/{total} {entity}"));
        }
        fn row_finished(&self, index: usize, _total: usize, result: &LookupResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {index} {}", result.result));
        }
    }

    #[tokio::test]
    async fn acme_globex_scenario() {
        // The lookup reports a miss in its own words; the row keeps it verbatim.
        let lookup = ScriptedLookup::new(&["http://a", "no result found"]);
        let summarizer = summarizer();
        let pipeline = EnrichmentPipeline::new(&lookup, &summarizer);
        let rows = vec![EntityRow::new("Acme"), EntityRow::new("Globex")];

        let table = pipeline
            .run(&rows, "headquarters location", &SilentProgress)
            .await;

        assert_eq!(
            table.rows(),
            [
                LookupResult {
                    entity: "Acme".into(),
                    query: "headquarters location".into(),
                    result: "http://a".into(),
                    summary: "Acme HQ is in X".into(),
                },
                LookupResult {
                    entity: "Globex".into(),
                    query: "headquarters location".into(),
                    result: "no result found".into(),
                    summary: NO_SUMMARY.into(),
                },
            ]
        );
        assert_eq!(
            *summarizer.calls.lock().unwrap(),
            ["http://a", "no result found"]
        );
    }

    #[tokio::test]
    async fn every_row_yields_a_result_even_on_errors() {
        let lookup = ScriptedLookup::new(&[LOOKUP_ERROR, LOOKUP_ERROR, "http://a"]);
        let summarizer = summarizer();
        let pipeline = EnrichmentPipeline::new(&lookup, &summarizer);
        let rows: Vec<EntityRow> = ["a", "b", "c"].into_iter().map(EntityRow::new).collect();

        let table = pipeline.run(&rows, "ceo", &SilentProgress).await;

        assert_eq!(table.len(), rows.len());
        assert_eq!(table.rows()[0].result, LOOKUP_ERROR);
        assert_eq!(table.rows()[0].entity, "a");
        assert_eq!(table.rows()[0].query, "ceo");
        assert_eq!(table.rows()[2].summary, "Acme HQ is in X");
    }

    #[tokio::test]
    async fn duplicates_trigger_their_own_calls() {
        let lookup = ScriptedLookup::new(&["http://a", "http://a"]);
        let summarizer = summarizer();
        let pipeline = EnrichmentPipeline::new(&lookup, &summarizer);
        let rows = vec![EntityRow::new("Acme"), EntityRow::new("Acme")];

        let table = pipeline.run(&rows, "hq", &SilentProgress).await;

        assert_eq!(table.len(), 2);
        assert_eq!(*lookup.calls.lock().unwrap(), ["hq", "hq"]);
        assert_eq!(summarizer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let lookup = ScriptedLookup::new(&[]);
        let summarizer = summarizer();
        let table = EnrichmentPipeline::new(&lookup, &summarizer)
            .run(&[], "hq", &SilentProgress)
            .await;

        assert!(table.is_empty());
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_sees_rows_in_order() {
        let lookup = ScriptedLookup::new(&["http://a", NO_RESULT]);
        let summarizer = summarizer();
        let progress = RecordingProgress::default();
        let rows = vec![EntityRow::new("Acme"), EntityRow::new("Globex")];

        EnrichmentPipeline::new(&lookup, &summarizer)
            .run(&rows, "hq", &progress)
            .await;

        assert_eq!(
            *progress.events.lock().unwrap(),
            [
                "start 0/2 Acme",
                "done 0 http://a",
                "start 1/2 Globex",
                "done 1 No result found",
            ]
        );
    }
}
