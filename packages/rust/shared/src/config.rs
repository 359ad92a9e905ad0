//! Application configuration for SearchAgent.
//!
//! User config lives at `~/.searchagent/searchagent.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: each section names the environment
//! variable that holds the credential for that service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchAgentError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "searchagent.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".searchagent";

// ---------------------------------------------------------------------------
// Config structs (matching searchagent.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search provider used for per-entity lookups.
    #[serde(default)]
    pub search: SearchConfig,

    /// News provider used for the related-news feed.
    #[serde(default)]
    pub news: NewsConfig,

    /// Text-generation service and its Google credentials.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedded document store sink.
    #[serde(default)]
    pub document_store: DocumentStoreConfig,

    /// Spreadsheet sink.
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
        }
    }
}

impl SearchConfig {
    /// The API key from the configured env var, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        env_value(&self.api_key_env)
    }
}

fn default_search_key_env() -> String {
    "SERPAPI_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://serpapi.com/search".into()
}

/// `[news]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,

    /// Maximum number of articles requested.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Total attempts, including the first, before giving up on rate limits.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between rate-limited attempts.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// HTTP status the provider uses to signal rate limiting.
    #[serde(default = "default_rate_limit_status")]
    pub rate_limit_status: u16,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_news_key_env(),
            endpoint: default_news_endpoint(),
            page_size: default_page_size(),
            sort_by: default_sort_by(),
            language: default_language(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            rate_limit_status: default_rate_limit_status(),
        }
    }
}

impl NewsConfig {
    pub fn api_key(&self) -> Option<String> {
        env_value(&self.api_key_env)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

fn default_news_key_env() -> String {
    "NEWS_API_KEY".into()
}
fn default_news_endpoint() -> String {
    "https://newsapi.org/v2/everything".into()
}
fn default_page_size() -> u32 {
    15
}
fn default_sort_by() -> String {
    "relevance".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_secs() -> u64 {
    30
}
fn default_rate_limit_status() -> u16 {
    426
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Env var pointing at a service-account JSON key file.
    #[serde(default = "default_credentials_env")]
    pub credentials_env: String,

    /// Key file used when `credentials_env` is unset.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,

    /// Env var holding a pre-issued access token (skips the key exchange).
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            credentials_env: default_credentials_env(),
            credentials_path: default_credentials_path(),
            access_token_env: default_access_token_env(),
            endpoint: default_generation_endpoint(),
            model: default_model(),
        }
    }
}

impl GenerationConfig {
    /// Service-account key path: env override first, then the configured default.
    pub fn resolve_credentials_path(&self) -> PathBuf {
        match env_value(&self.credentials_env) {
            Some(path) => PathBuf::from(path),
            None => expand_home(&self.credentials_path),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        env_value(&self.access_token_env)
    }
}

fn default_credentials_env() -> String {
    "GOOGLE_APPLICATION_CREDENTIALS".into()
}
fn default_credentials_path() -> String {
    "~/.searchagent/google-service-account.json".into()
}
fn default_access_token_env() -> String {
    "GOOGLE_ACCESS_TOKEN".into()
}
fn default_generation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}

/// `[document_store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Env var overriding the database path.
    #[serde(default = "default_db_path_env")]
    pub path_env: String,

    #[serde(default = "default_db_path")]
    pub path: String,

    /// Collection every enriched row is appended to.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            path_env: default_db_path_env(),
            path: default_db_path(),
            collection: default_collection(),
        }
    }
}

impl DocumentStoreConfig {
    pub fn resolve_path(&self) -> PathBuf {
        match env_value(&self.path_env) {
            Some(path) => PathBuf::from(path),
            None => expand_home(&self.path),
        }
    }
}

fn default_db_path_env() -> String {
    "SEARCHAGENT_DB_PATH".into()
}
fn default_db_path() -> String {
    "~/.searchagent/documents.db".into()
}
fn default_collection() -> String {
    "search_results".into()
}

/// `[sheets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_endpoint")]
    pub endpoint: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sheets_endpoint(),
        }
    }
}

fn default_sheets_endpoint() -> String {
    "https://sheets.googleapis.com/v4".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.searchagent/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SearchAgentError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.searchagent/searchagent.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SearchAgentError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SearchAgentError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SearchAgentError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SearchAgentError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SearchAgentError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a credential from `var_name`, failing with a config error naming the service.
pub fn require_env(var_name: &str, service: &str) -> Result<String> {
    env_value(var_name).ok_or_else(|| {
        SearchAgentError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))
    })
}

/// Value of an environment variable, treating empty as unset.
fn env_value(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
