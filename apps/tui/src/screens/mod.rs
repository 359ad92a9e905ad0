//! TUI screen definitions.
//!
//! Screens own their form state and rendering. Anything that needs the
//! network, the session gate, or the document store is handed back to the
//! app as an [`Action`].

mod enrich;
mod login;
mod news;

use std::fmt;
use std::path::PathBuf;

pub(crate) use enrich::EnrichScreen;
pub(crate) use login::LoginScreen;
pub(crate) use news::NewsScreen;

/// Tabs shown once logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Enrich,
    News,
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enrich => write!(f, "Enrich"),
            Self::News => write!(f, "News"),
        }
    }
}

/// Work requested by a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Login { identity: String, secret: String },
    Signup { identity: String, secret: String },
    Preview { input: PathBuf },
    Enrich(EnrichRequest),
    FetchNews { query: String },
}

impl Action {
    /// Status bar text while the action runs.
    pub(crate) fn busy_message(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Logging in...",
            Self::Signup { .. } => "Creating account...",
            Self::Preview { .. } => "Reading input table...",
            Self::Enrich(_) => "Enriching rows... (this blocks until every row is done)",
            Self::FetchNews { .. } => "Fetching news... (rate limits are retried)",
        }
    }
}

/// Form contents of the Enrich screen at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnrichRequest {
    pub input: PathBuf,
    pub column: String,
    pub query: String,
    pub sheet_id: String,
    pub range: String,
}
