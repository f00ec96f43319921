//! CLI for dessert-menu: browse TheMealDB desserts in the terminal.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dessert_model::{CatalogEntry, DetailRecord, filter_entries};
use reqwest::Url;
use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub mod state;
mod tui;

pub use state::{Catalog, Detail, LinkAction, LoadPhase, external_link, open_external_link};

/// TheMealDB v1 public API.
pub const DEFAULT_API_BASE: &str = "https://themealdb.com/api/json/v1/1";

/// The catalog always lists this category.
pub const CATEGORY: &str = "Dessert";

/// Environment variable holding a `tracing_subscriber::EnvFilter` directive.
pub const LOG_ENV: &str = "DESSERT_MENU_LOG";

const USER_AGENT: &str = concat!("dessert-menu/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "dessert-menu")]
#[command(version, about = "Browse dessert recipes from TheMealDB", long_about = None)]
pub struct Cli {
    /// Base URL of the recipe API
    #[arg(
        long,
        global = true,
        env = "DESSERT_MENU_API_BASE",
        default_value = DEFAULT_API_BASE
    )]
    pub api_base: String,

    /// Read recipes from a directory of JSON files instead of the API
    #[arg(long, global = true, env = "DESSERT_MENU_SOURCE")]
    pub meal_source: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the dessert catalog
    List {
        /// Only show desserts whose name contains this text
        #[arg(long, short = 'f')]
        filter: Option<String>,

        /// Print the list instead of opening the TUI
        #[arg(long)]
        non_interactive: bool,
    },

    /// Show a single recipe
    Show {
        /// TheMealDB meal id (e.g. 52893)
        id: String,

        /// Print the recipe instead of opening the TUI
        #[arg(long)]
        non_interactive: bool,
    },
}

/// Main entry point for the CLI.
pub fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

/// Run an already-parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::List {
        filter: None,
        non_interactive: false,
    });
    let non_interactive = match &command {
        Commands::List {
            non_interactive, ..
        }
        | Commands::Show {
            non_interactive, ..
        } => *non_interactive,
    };
    let interactive = !non_interactive && std::io::stdout().is_terminal();

    init_logging(cli.verbose, cli.log_file.as_deref(), interactive)?;

    let source = match cli.meal_source {
        Some(dir) => MealSource::Local(dir),
        None => MealSource::Remote(MealDbClient::new(&cli.api_base)?),
    };
    debug!(?source, interactive, "starting");

    match command {
        Commands::List { filter, .. } => {
            if interactive {
                tui::run_catalog(source, filter)
            } else {
                print_catalog(&source, filter.as_deref())
            }
        }
        Commands::Show { id, .. } => {
            if interactive {
                tui::run_detail(source, &id)
            } else {
                print_detail(&source, &id)
            }
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber.
///
/// `DESSERT_MENU_LOG` wins over `-v`. In the TUI, logs go to `--log-file`
/// or nowhere, since stderr shares the terminal with the UI.
fn init_logging(verbose: u8, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None if interactive => (BoxMakeWriter::new(std::io::sink), false),
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

// ============================================================================
// Fetching
// ============================================================================

/// Errors from fetching catalog or recipe data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid API base URL '{base}': {reason}")]
    BaseUrl { base: String, reason: String },

    #[error("invalid meal id '{id}'")]
    InvalidId { id: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Decode(#[from] dessert_model::Error),

    #[error("no recipe found for id '{id}'")]
    EmptyResult { id: String },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP client for TheMealDB.
#[derive(Debug, Clone)]
pub struct MealDbClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl MealDbClient {
    /// Create a client for the API rooted at `base`, e.g. [`DEFAULT_API_BASE`].
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let base = base.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| FetchError::BaseUrl {
            base: base.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| FetchError::Network {
                url: base.clone(),
                source,
            })?;
        Ok(Self { http, base })
    }

    /// `{base}/filter.php?c={category}`
    pub fn catalog_url(&self, category: &str) -> Result<Url, FetchError> {
        self.endpoint("filter.php", "c", category)
    }

    /// `{base}/lookup.php?i={id}`
    pub fn lookup_url(&self, id: &str) -> Result<Url, FetchError> {
        self.endpoint("lookup.php", "i", id)
    }

    fn endpoint(&self, path: &str, key: &str, value: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{}/{}", self.base, path), &[(key, value)]).map_err(|e| {
            FetchError::BaseUrl {
                base: self.base.clone(),
                reason: e.to_string(),
            }
        })
    }

    fn get_text(&self, url: Url) -> Result<String, FetchError> {
        let shown = url.to_string();
        debug!(url = %shown, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|source| FetchError::Network {
                url: shown.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: shown, status });
        }

        response
            .text()
            .map_err(|source| FetchError::Network { url: shown, source })
    }
}

/// Where catalog and recipe payloads come from.
#[derive(Debug, Clone)]
pub enum MealSource {
    /// The live API.
    Remote(MealDbClient),
    /// A directory laid out as `filter/<category>.json` and `lookup/<id>.json`.
    Local(PathBuf),
}

impl MealSource {
    fn catalog_json(&self, category: &str) -> Result<String, FetchError> {
        match self {
            MealSource::Remote(client) => client.get_text(client.catalog_url(category)?),
            MealSource::Local(dir) => read_local(dir, "filter", category),
        }
    }

    fn lookup_json(&self, id: &str) -> Result<String, FetchError> {
        match self {
            MealSource::Remote(client) => client.get_text(client.lookup_url(id)?),
            MealSource::Local(dir) => read_local(dir, "lookup", id),
        }
    }
}

fn read_local(dir: &Path, kind: &str, key: &str) -> Result<String, FetchError> {
    // Keys become file names, so keep them to a single plain path component.
    if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FetchError::InvalidId {
            id: key.to_string(),
        });
    }
    let path = dir.join(kind).join(format!("{key}.json"));
    debug!(path = %path.display(), "reading local payload");
    std::fs::read_to_string(&path).map_err(|source| FetchError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Fetch the catalog for `category`, preserving upstream order.
pub fn fetch_catalog(source: &MealSource, category: &str) -> Result<Vec<CatalogEntry>, FetchError> {
    let json = source.catalog_json(category)?;
    let entries = dessert_model::parse_catalog(&json)?;
    info!(category, count = entries.len(), "fetched catalog");
    Ok(entries)
}

/// Fetch the recipe with the given id.
pub fn fetch_detail(source: &MealSource, id: &str) -> Result<DetailRecord, FetchError> {
    if id.is_empty() {
        return Err(FetchError::InvalidId { id: String::new() });
    }
    let json = source.lookup_json(id)?;
    let record = dessert_model::parse_detail(&json)?
        .ok_or_else(|| FetchError::EmptyResult { id: id.to_string() })?;
    info!(id, name = %record.name, "fetched recipe");
    Ok(record)
}

// ============================================================================
// Non-interactive output
// ============================================================================

fn print_catalog(source: &MealSource, filter: Option<&str>) -> Result<()> {
    let entries = fetch_catalog(source, CATEGORY).context("Failed to load dessert catalog")?;
    print!("{}", format_catalog(&filter_entries(&entries, filter.unwrap_or(""))));
    Ok(())
}

fn print_detail(source: &MealSource, id: &str) -> Result<()> {
    let record =
        fetch_detail(source, id).with_context(|| format!("Failed to load recipe '{id}'"))?;
    print!("{}", format_detail(&record));
    Ok(())
}

/// One `"{id}  {name}"` line per entry.
pub fn format_catalog(entries: &[&CatalogEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}  {}\n", entry.id, entry.name))
        .collect()
}

/// Plain-text rendering of a recipe.
pub fn format_detail(record: &DetailRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", record.name);
    if let Some(origin) = record.origin() {
        let _ = writeln!(out, "Origin: {origin}");
    }
    if let Some(category) = record.category() {
        let _ = writeln!(out, "Category: {category}");
    }
    let tags = record.tags();
    if !tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", tags.join(", "));
    }
    for action in state::link_actions(record) {
        let _ = writeln!(out, "{}: {}", action.label, action.url);
    }

    let _ = writeln!(out, "\nIngredients:");
    let lines = record.ingredient_lines();
    if lines.is_empty() {
        let _ = writeln!(out, "  (none listed)");
    }
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }

    if let Some(instructions) = record.instructions() {
        let _ = writeln!(out, "\nInstructions:");
        for paragraph in instructions.lines() {
            let _ = writeln!(out, "{}", paragraph.trim_end());
        }
    }
    out
}
