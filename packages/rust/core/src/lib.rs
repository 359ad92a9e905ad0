//! Enrichment orchestration and session logic for SearchAgent.
//!
//! This crate ties the lookup and generation clients into the per-row
//! enrichment run, fans the finished table out to both sinks, and holds the
//! login gate that guards interactive use.

pub mod pipeline;
pub mod session;
pub mod sinks;
pub mod table;

pub use pipeline::{EnrichmentPipeline, EntityLookup, PipelineProgress, SilentProgress, Summarizer};
pub use session::{AuthError, SEEDED_IDENTITY, SEEDED_SECRET, SessionGate};
pub use sinks::{
    DocumentSink, DocumentStore, SheetTarget, SinkOutcome, SinkReport, SinkSetup, SpreadsheetSink,
    persist,
};
pub use table::{DEFAULT_DELIMITER, InputTable};
