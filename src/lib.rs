//! # Magpie
//!
//! A browser-driven scraper that collects every review from a map listing
//! page and keeps them locally.
//!
//! ## Architecture
//!
//! Magpie follows a pipeline architecture:
//!
//! ```text
//! Scraper → Classifier → Store → Report
//! ```
//!
//! - [`scraper`]: headless Chrome session that walks a listing page and
//!   extracts review cards until the feed is exhausted
//! - [`classifier`]: attaches a Fake/Genuine label to each review
//! - [`store`]: SQLite persistence layer, deduplicated by review id
//! - [`report`]: per-job JSON artifacts for downstream consumers
//!
//! ## Quick Start
//!
//! ```bash
//! # Scrape a listing and follow progress
//! magpie scrape "https://www.google.com/maps/place/..."
//!
//! # See what has been collected
//! magpie list
//! magpie list --reviews "Cafe Luna"
//!
//! # Export stored reviews
//! magpie export "Cafe Luna" --out luna.json
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, scraper, classifier, job manager.
pub mod app;

/// Review labeling stand-ins.
///
/// - [`KeywordClassifier`](classifier::KeywordClassifier): suspicious-phrase matcher
/// - [`RandomClassifier`](classifier::RandomClassifier): coin flip
pub mod classifier;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `scrape <url>` - Scrape a listing page, following progress until done
/// - `list [--reviews <company>]` - List companies or one company's reviews
/// - `export <company>` - Export stored reviews as JSON
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/magpie/config.toml`; command-line flags are
/// merged afterwards through [`ConfigOverrides`](config::ConfigOverrides).
pub mod config;

/// Core domain models.
///
/// - [`Review`](domain::Review): one captured review, keyed by the listing's own id
/// - [`Company`](domain::Company): a listing the store has seen
/// - [`Progress`](domain::Progress): shared progress sink polled by followers
pub mod domain;

/// Image downloads for avatars and review photos.
pub mod images;

/// Background job coordination.
///
/// - [`JobManager`](jobs::JobManager): submits, runs, and tracks scrape jobs
/// - [`JobSnapshot`](jobs::JobSnapshot): point-in-time view for pollers
pub mod jobs;

/// Text normalization for raw card fields.
///
/// Language detection with a bounded cache, counts out of noisy strings,
/// relative dates to RFC 3339 timestamps.
pub mod normalize;

/// Per-job JSON report artifacts.
pub mod report;

/// Browser-driven review extraction.
///
/// Uses headless Chrome via chromiumoxide to walk a map listing page:
/// find the listing name, open the reviews panel, scroll until the feed
/// is exhausted, and parse every review card seen along the way.
///
/// - [`ReviewScraper`](scraper::ReviewScraper): retrying scraper entry point
/// - [`ScraperConfig`](scraper::ScraperConfig): selectors and tuning knobs
/// - [`Scraper`](scraper::Scraper): async trait for scraping implementations
pub mod scraper;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
