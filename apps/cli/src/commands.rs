//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use searchagent_core::{
    DocumentSink, EnrichmentPipeline, InputTable, PipelineProgress, SessionGate, SheetTarget,
    SinkOutcome, SpreadsheetSink, persist,
};
use searchagent_google::{CredentialHolder, GenerativeClient, SheetsClient};
use searchagent_news::{NewsClient, NewsError};
use searchagent_search::SearchClient;
use searchagent_shared::{
    AppConfig, LookupResult, RESULT_COLUMNS, init_config, load_config,
};
use searchagent_storage::Storage;

/// Rows shown from the input table before a run starts.
const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SearchAgent: enrich entity tables with web search and generated summaries.
#[derive(Parser)]
#[command(
    name = "searchagent",
    version,
    about = "Enrich a table of entities with search results and summaries, and browse related news.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Look up and summarize every row of a delimited table.
    Enrich {
        /// Input table (first row is the header).
        #[arg(short, long)]
        input: PathBuf,

        /// Header of the column holding the entities.
        #[arg(short, long)]
        column: String,

        /// Search query sent for every row.
        #[arg(short, long)]
        query: String,

        /// Field delimiter of the input table.
        #[arg(long, default_value_t = ',')]
        delimiter: char,

        /// Spreadsheet to overwrite with the results (requires --range).
        #[arg(long)]
        sheet_id: Option<String>,

        /// A1 range to overwrite, e.g. "Sheet1!A1:D10".
        #[arg(long)]
        range: Option<String>,

        /// Login identity for this run.
        #[arg(long, env = "SEARCHAGENT_EMAIL")]
        email: String,

        /// Secret for --email.
        #[arg(long, env = "SEARCHAGENT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Fetch news articles related to a query.
    News {
        /// Search terms.
        query: String,

        /// Total attempts when the provider rate limits (overrides config).
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Seconds to wait between rate-limited attempts (overrides config).
        #[arg(long)]
        backoff_secs: Option<u64>,
    },

    /// List results stored by previous enrichment runs.
    History {
        /// Only show the most recent N documents.
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print raw JSON documents.
        #[arg(long)]
        json: bool,
    },

    /// Launch the interactive TUI.
    Tui,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "searchagent=info",
        1 => "searchagent=debug",
        _ => "searchagent=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            input,
            column,
            query,
            delimiter,
            sheet_id,
            range,
            email,
            password,
        } => {
            let args = EnrichArgs {
                input: &input,
                column: &column,
                query: &query,
                delimiter,
                sheet_id: sheet_id.as_deref(),
                range: range.as_deref(),
            };
            cmd_enrich(args, &email, &password).await
        }
        Command::News {
            query,
            max_attempts,
            backoff_secs,
        } => cmd_news(&query, max_attempts, backoff_secs).await,
        Command::History { limit, json } => cmd_history(limit, json).await,
        Command::Tui => cmd_tui(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// enrich
// ---------------------------------------------------------------------------

struct EnrichArgs<'a> {
    input: &'a Path,
    column: &'a str,
    query: &'a str,
    delimiter: char,
    sheet_id: Option<&'a str>,
    range: Option<&'a str>,
}

async fn cmd_enrich(args: EnrichArgs<'_>, email: &str, password: &str) -> Result<()> {
    let mut gate = SessionGate::seeded();
    gate.login(email, password)
        .map_err(|e| eyre!("login failed: {e}"))?;
    let identity = gate.require_authenticated()?.to_string();

    let config = load_config()?;

    if !args.delimiter.is_ascii() {
        return Err(eyre!("delimiter must be a single ASCII character"));
    }
    let table = InputTable::from_path(args.input, args.delimiter as u8)?;
    println!();
    println!("  Input preview ({} rows total)", table.len());
    print_grid(table.headers(), table.preview(PREVIEW_ROWS));
    println!();

    let rows = table.entity_rows(args.column)?;

    // Resolve every credential before the first row is processed.
    let search = SearchClient::from_config(&config.search)?;
    let mut credentials = CredentialHolder::from_config(&config.generation)?;
    let token = credentials.refresh().await?;
    let summarizer = GenerativeClient::from_config(&config.generation, token.clone())?;

    let target = sheet_target(args.sheet_id, args.range);

    info!(
        identity = %identity,
        rows = rows.len(),
        query = args.query,
        sheet = target.is_some(),
        "starting enrichment"
    );

    let progress = CliProgress::new();
    let results = EnrichmentPipeline::new(&search, &summarizer)
        .run(&rows, args.query, &progress)
        .await;
    progress.finish();

    let cells: Vec<Vec<String>> = results.to_grid();
    let headers: Vec<String> = RESULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    print_grid(&headers, &cells);
    println!();

    // Setup errors become that sink's outcome; the other sink still runs.
    let collection = config.document_store.collection.as_str();
    let storage = Storage::open(&config.document_store.resolve_path()).await;
    let documents = storage
        .as_ref()
        .map(|storage| DocumentSink::new(storage, collection))
        .map_err(|e| e.to_string());
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

    print_outcome(
        &format!("Documents ({collection})"),
        &report.document,
    );
    match (&report.spreadsheet, &target) {
        (Some(outcome), Some(target)) => print_outcome(
            &format!("Sheet {} {}", target.spreadsheet_id(), target.range()),
            outcome,
        ),
        _ => println!("  Sheet: skipped (no --sheet-id/--range)"),
    }
    println!();

    if !report.all_succeeded() {
        return Err(eyre!("results were not fully persisted"));
    }
    Ok(())
}

/// Build the sheet target, warning when only half of it was given.
fn sheet_target(sheet_id: Option<&str>, range: Option<&str>) -> Option<SheetTarget> {
    let target = SheetTarget::new(sheet_id.unwrap_or_default(), range.unwrap_or_default());
    if target.is_none() && (sheet_id.is_some() || range.is_some()) {
        warn!("both --sheet-id and --range are required for the spreadsheet sink; skipping it");
    }
    target
}

fn print_outcome(label: &str, outcome: &SinkOutcome) {
    let mark = if outcome.is_success() { "ok" } else { "FAILED" };
    println!("  {label}: {mark}, {outcome}");
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn row_started(&self, index: usize, total: usize, entity: &str) {
        self.spinner
            .set_message(format!("Enriching [{}/{total}] {entity}", index + 1));
    }

    fn row_finished(&self, index: usize, total: usize, result: &LookupResult) {
        self.spinner.set_message(format!(
            "Enriched [{}/{total}] {}",
            index + 1,
            result.entity
        ));
    }
}

// ---------------------------------------------------------------------------
// news
// ---------------------------------------------------------------------------

async fn cmd_news(query: &str, max_attempts: Option<u32>, backoff_secs: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let mut news_config = config.news.clone();
    if let Some(n) = max_attempts {
        news_config.max_attempts = n;
    }
    if let Some(secs) = backoff_secs {
        news_config.backoff_secs = secs;
    }

    let client = NewsClient::from_config(&news_config)?;
    info!(query, "fetching news");

    match client.fetch(query).await {
        Ok(items) => {
            println!();
            for (i, item) in items.iter().enumerate() {
                println!("  {}. {}", i + 1, item.title);
                if !item.description.is_empty() {
                    println!("     {}", item.description);
                }
                println!("     {}", item.url);
                println!();
            }
            Ok(())
        }
        Err(NewsError::NoResults) => {
            println!("{}", NewsError::NoResults);
            Ok(())
        }
        Err(e) => Err(eyre!(e)),
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

async fn cmd_history(limit: Option<usize>, json: bool) -> Result<()> {
    let config = load_config()?;
    let path = config.document_store.resolve_path();
    let storage = Storage::open_readonly(&path).await?;
    let docs = storage
        .list_documents(&config.document_store.collection)
        .await?;

    let skip = limit.map_or(0, |n| docs.len().saturating_sub(n));
    let docs = &docs[skip..];

    if json {
        println!("{}", serde_json::to_string_pretty(docs)?);
        return Ok(());
    }

    if docs.is_empty() {
        println!("No stored results in '{}'.", config.document_store.collection);
        return Ok(());
    }

    let headers: Vec<String> = std::iter::once("Stored At")
        .chain(RESULT_COLUMNS)
        .map(str::to_string)
        .collect();
    let rows: Vec<Vec<String>> = docs
        .iter()
        .map(|doc| {
            let mut row = vec![doc.created_at.format("%Y-%m-%d %H:%M:%S").to_string()];
            row.extend(RESULT_COLUMNS.iter().map(|column| {
                doc.body
                    .get(column)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            }));
            row
        })
        .collect();
    print_grid(&headers, &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// tui / config
// ---------------------------------------------------------------------------

/// Run the `searchagent-tui` binary installed next to this one, or from PATH.
fn cmd_tui() -> Result<()> {
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("searchagent-tui")))
        .filter(|path| path.exists());
    let program = sibling.unwrap_or_else(|| PathBuf::from("searchagent-tui"));

    info!(program = %program.display(), "launching TUI");
    let status = std::process::Command::new(&program)
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .map_err(|e| eyre!("failed to launch {}: {e}", program.display()))?;

    if !status.success() {
        return Err(eyre!(
            "TUI exited with status: {}",
            status.code().unwrap_or(-1)
        ));
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Longest cell rendered before truncation.
const MAX_CELL_WIDTH: usize = 48;

fn print_grid(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell_width(cell));
        }
    }

    let render = |cells: &[String]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", truncate(cell), width = *width))
            .collect();
        println!("  {}", line.join(" | ").trim_end());
    };

    render(headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("  {}", rule.join("-+-"));
    for row in rows {
        render(row);
    }
}

fn cell_width(cell: &str) -> usize {
    cell.chars().count().min(MAX_CELL_WIDTH)
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell.to_string();
    }
    let mut out: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}
