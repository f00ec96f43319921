//! dessert-menu: browse TheMealDB desserts from the terminal.
//!
//! The `dessert-menu` binary opens a list of desserts with a live search box
//! and a detail view per recipe. Pass `--non-interactive` (or pipe the
//! output) to print instead.
//!
//! ```text
//! dessert-menu list --filter tart --non-interactive
//! dessert-menu show 53049
//! ```
//!
//! The pieces are usable as a library too:
//!
//! ```rust,ignore
//! use dessert_menu::{CATEGORY, MealSource, MealDbClient, fetch_catalog, filter_entries};
//!
//! let source = MealSource::Remote(MealDbClient::new(dessert_menu::DEFAULT_API_BASE)?);
//! let desserts = fetch_catalog(&source, CATEGORY)?;
//! for entry in filter_entries(&desserts, "tart") {
//!     println!("{}", entry.name);
//! }
//! ```

pub use dessert_cli::{
    CATEGORY, Catalog, DEFAULT_API_BASE, Detail, FetchError, LinkAction, LoadPhase,
    MealDbClient, MealSource, fetch_catalog, fetch_detail,
};
pub use dessert_model::{
    CatalogEntry, DetailRecord, IngredientLine, IngredientSlot, filter_entries, parse_catalog,
    parse_detail,
};
