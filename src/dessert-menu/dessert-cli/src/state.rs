//! Screen-owned catalog and recipe state.
//!
//! Each screen owns one of these. Loading is triggered once per screen by
//! the event loop through [`LoadPhase`]; failures are logged and leave the
//! previous state in place.

use crate::{CATEGORY, FetchError, MealSource, fetch_catalog, fetch_detail};
use dessert_model::{CatalogEntry, DetailRecord, IngredientLine, filter_entries};
use reqwest::Url;
use tracing::{debug, info, warn};

/// Where a screen's single fetch stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Not fetched yet; the next loop iteration will fetch.
    Pending,
    Loaded,
    /// The last fetch failed. Only an explicit reload fetches again.
    Failed,
}

// ============================================================================
// Catalog
// ============================================================================

/// The dessert list plus the live search term.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    query: String,
    phase: LoadPhase,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            query: String::new(),
            phase: LoadPhase::Pending,
        }
    }

    /// A catalog that already holds `entries` and will not fetch.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            query: String::new(),
            phase: LoadPhase::Loaded,
        }
    }

    /// Fetch the dessert list and replace the stored entries.
    ///
    /// On failure the stored entries are kept and the error is logged.
    pub fn load(&mut self, source: &MealSource) -> Result<(), FetchError> {
        match fetch_catalog(source, CATEGORY) {
            Ok(entries) => {
                self.entries = entries;
                self.phase = LoadPhase::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to load dessert catalog");
                self.phase = LoadPhase::Failed;
                Err(e)
            }
        }
    }

    /// Load if no fetch has happened yet. Returns whether a fetch ran.
    pub fn ensure_loaded(&mut self, source: &MealSource) -> bool {
        if self.phase != LoadPhase::Pending {
            return false;
        }
        let _ = self.load(source);
        true
    }

    /// Arm the load-once guard again.
    pub fn request_reload(&mut self) {
        debug!("catalog reload requested");
        self.phase = LoadPhase::Pending;
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose name contains `query`, ignoring case.
    pub fn filter(&self, query: &str) -> Vec<&CatalogEntry> {
        filter_entries(&self.entries, query)
    }

    /// Entries matching the active query.
    pub fn visible(&self) -> Vec<&CatalogEntry> {
        self.filter(&self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn push_query_char(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }
}

// ============================================================================
// Detail
// ============================================================================

/// A single recipe, keyed by the id handed over from the catalog.
#[derive(Debug)]
pub struct Detail {
    id: String,
    record: Option<DetailRecord>,
    phase: LoadPhase,
}

impl Detail {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: None,
            phase: LoadPhase::Pending,
        }
    }

    /// A detail that already holds `record` and will not fetch.
    pub fn from_record(record: DetailRecord) -> Self {
        Self {
            id: record.id.clone(),
            record: Some(record),
            phase: LoadPhase::Loaded,
        }
    }

    /// Fetch the recipe for `id` and store it.
    ///
    /// On failure the stored record is cleared and the error is logged.
    pub fn load(&mut self, source: &MealSource, id: &str) -> Result<(), FetchError> {
        self.id = id.to_string();
        match fetch_detail(source, id) {
            Ok(record) => {
                self.record = Some(record);
                self.phase = LoadPhase::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "failed to load recipe");
                self.record = None;
                self.phase = LoadPhase::Failed;
                Err(e)
            }
        }
    }

    /// Load if no fetch has happened yet. Returns whether a fetch ran.
    pub fn ensure_loaded(&mut self, source: &MealSource) -> bool {
        if self.phase != LoadPhase::Pending {
            return false;
        }
        let id = self.id.clone();
        let _ = self.load(source, &id);
        true
    }

    pub fn request_reload(&mut self) {
        debug!(id = %self.id, "recipe reload requested");
        self.phase = LoadPhase::Pending;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn record(&self) -> Option<&DetailRecord> {
        self.record.as_ref()
    }

    /// Ingredient rows of the stored record; empty while absent.
    pub fn ingredient_lines(&self) -> Vec<IngredientLine> {
        self.record
            .as_ref()
            .map(DetailRecord::ingredient_lines)
            .unwrap_or_default()
    }

    /// Openable links of the stored record; empty while absent.
    pub fn actions(&self) -> Vec<LinkAction> {
        self.record.as_ref().map(link_actions).unwrap_or_default()
    }
}

// ============================================================================
// External links
// ============================================================================

/// A link on the detail screen that opens in the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAction {
    pub label: &'static str,
    pub url: Url,
}

/// The record's links that parse, in display order.
pub fn link_actions(record: &DetailRecord) -> Vec<LinkAction> {
    [
        ("Watch video", record.video_link()),
        ("More info", record.source_link()),
        ("View photo", Some(record.thumbnail_url.as_str())),
    ]
    .into_iter()
    .filter_map(|(label, raw)| {
        Some(LinkAction {
            label,
            url: external_link(raw?)?,
        })
    })
    .collect()
}

/// Parse `raw` as an absolute http(s) URL.
pub fn external_link(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Hand `raw` to the platform browser. Returns `Ok(false)` without doing
/// anything when it is not a valid link.
pub fn open_external_link(raw: &str) -> std::io::Result<bool> {
    let Some(url) = external_link(raw) else {
        debug!(raw, "ignoring invalid link");
        return Ok(false);
    };
    info!(url = %url, "opening link");
    open::that(url.as_str())?;
    Ok(true)
}
