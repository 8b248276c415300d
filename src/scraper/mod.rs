//! Browser-driven review extraction.
//!
//! The scraper drives a real Chrome over the DevTools protocol to walk a
//! map-listing page the way a person would: open the listing, find its
//! name, clear any consent overlay, click through to the reviews feed,
//! optionally re-sort it, then scroll the reviews pane until it stops
//! yielding new cards.
//!
//! # Architecture
//!
//! ```text
//! ReviewScraper (retries)
//!   └─ Session (one attempt, one browser)
//!        ├─ locator  (absorbing DOM lookups)
//!        ├─ card     (one card → Review)
//!        └─ ledger   (dedupe + idle-pass accounting)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use magpie::domain::Progress;
//! use magpie::scraper::{ReviewScraper, Scraper, ScraperConfig};
//!
//! let scraper = ReviewScraper::new(ScraperConfig::default());
//! let progress = Progress::new();
//! let outcome = scraper.scrape("https://maps.example/place/...", &progress).await;
//! println!("{}: {} reviews", outcome.company_name, outcome.reviews.len());
//! ```
//!
//! `scrape` never fails. A listing that resisted every attempt comes back
//! as an empty outcome, and the caller decides whether that is a problem.

mod card;
mod config;
mod ledger;
mod locator;
mod retry;
mod session;

pub use config::{ScraperConfig, SortOrder};
pub use retry::ReviewScraper;

use async_trait::async_trait;

use crate::domain::{Progress, Review};

/// Everything one finished scrape produced.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// Display name of the listing, or a sentinel when identification
    /// failed on every attempt.
    pub company_name: String,
    /// Unique reviews in first-seen order.
    pub reviews: Vec<Review>,
}

/// Trait for review-scraping implementations.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Extract all reachable reviews for one listing URL, reporting
    /// progress through `progress`. Implementations absorb their own
    /// failures; an empty outcome is the worst case.
    async fn scrape(&self, url: &str, progress: &Progress) -> ScrapeOutcome;
}
