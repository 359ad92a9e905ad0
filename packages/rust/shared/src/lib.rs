//! Shared types, error model, and configuration for SearchAgent.
//!
//! This crate is the foundation depended on by all other SearchAgent crates.
//! It provides:
//! - [`SearchAgentError`]: the unified error type
//! - Domain types ([`EntityRow`], [`LookupResult`], [`ResultTable`], [`NewsItem`])
//!   and the sentinel strings substituted for failed external output
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DocumentStoreConfig, GenerationConfig, NewsConfig, SearchConfig, SheetsConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, require_env,
};
pub use error::{Result, SearchAgentError};
pub use types::{
    EntityRow, LOOKUP_ERROR, LookupResult, NO_RESULT, NO_SUMMARY, NewsItem, RESULT_COLUMNS,
    ResultTable,
};
