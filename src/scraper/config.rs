use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Requested ordering of the reviews feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// The page's own default ordering; applying it is a no-op.
    Relevance,
    Newest,
    Highest,
    Lowest,
}

impl SortOrder {
    /// Substring looked for in sort-menu entries when applying this order.
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevant",
            SortOrder::Newest => "newest",
            SortOrder::Highest => "highest",
            SortOrder::Lowest => "lowest",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, SortOrder::Relevance)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Relevance
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortOrder::Relevance => "relevance",
            SortOrder::Newest => "newest",
            SortOrder::Highest => "highest",
            SortOrder::Lowest => "lowest",
        };
        write!(f, "{name}")
    }
}

/// Configuration for the review scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Requested review ordering (default: relevance)
    pub sort_by: SortOrder,

    /// Attempts before giving up on a listing (default: 3)
    pub max_attempts: u32,

    /// Pause between failed attempts in seconds (default: 5)
    pub retry_backoff_secs: u64,

    /// Bounded wait for page structure (document body, reviews pane)
    /// in seconds (default: 20)
    pub wait_timeout_secs: u64,

    /// Settle time after navigation for script-driven rendering in
    /// milliseconds (default: 2000)
    pub settle_ms: u64,

    /// Pause after each pane scroll so lazy content can load, in
    /// milliseconds (default: 1500)
    pub scroll_pause_ms: u64,

    /// Consecutive extraction passes with no new reviews before the loop
    /// stops (default: 5)
    pub max_idle_passes: u32,

    /// Review count at which scroll progress reaches its ceiling (default: 150)
    pub progress_target: usize,

    /// User agent override; the browser default is used when unset
    pub user_agent: Option<String>,

    /// Selectors tried in order for the listing name
    pub company_name_selectors: Vec<String>,

    /// Suffix a page title must carry before it can stand in for the
    /// listing name; the part before it is the name
    pub title_suffix: String,

    /// Candidate selectors for a cookie or consent accept control
    pub cookie_selectors: Vec<String>,

    /// Keywords identifying the reviews entry control by label or text
    pub review_keywords: Vec<String>,

    /// Literal fallback selectors for the reviews entry
    pub review_entry_fallbacks: Vec<String>,

    /// Sort menu button
    pub sort_button_selector: String,

    /// Entries of the opened sort menu
    pub sort_menu_selector: String,

    /// The scrollable reviews pane
    pub panel_selector: String,

    /// One review card inside the pane
    pub card_selector: String,

    /// Card attribute carrying the stable review id
    pub id_attribute: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sort_by: SortOrder::Relevance,
            max_attempts: 3,
            retry_backoff_secs: 5,
            wait_timeout_secs: 20,
            settle_ms: 2000,
            scroll_pause_ms: 1500,
            max_idle_passes: 5,
            progress_target: 150,
            user_agent: None,
            company_name_selectors: vec![
                "h1.fontHeadlineLarge".to_string(),
                "h1[aria-label]".to_string(),
                "div.fontTitleLarge.m6QErb".to_string(),
            ],
            title_suffix: " - Google Maps".to_string(),
            cookie_selectors: vec![
                "button[aria-label*=\"Accept\" i]".to_string(),
                "button[jsname=\"hZCF7e\"]".to_string(),
            ],
            review_keywords: vec![
                "reviews".to_string(),
                "review".to_string(),
                "ratings".to_string(),
                "rating".to_string(),
            ],
            review_entry_fallbacks: vec![
                "button[jsaction*=\"pane.rating.moreReviews\"]".to_string(),
            ],
            sort_button_selector: "button[aria-label*=\"Sort reviews\" i]".to_string(),
            sort_menu_selector: "div[role=\"menu\"] [role=\"menuitem\"], li[role=\"menuitem\"]"
                .to_string(),
            panel_selector: "div[role=\"main\"] div.m6QErb.DxyBCb.kA9KIf.dS8AEf".to_string(),
            card_selector: "div[data-review-id]".to_string(),
            id_attribute: "data-review-id".to_string(),
        }
    }
}

impl ScraperConfig {
    /// Get the structure wait bound as a Duration
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Get the post-navigation settle time as a Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Get the per-scroll pause as a Duration
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    /// Get the between-attempts backoff as a Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// Candidate selectors for the reviews entry, in probe order: one
    /// label-contains selector per keyword, then the literal fallbacks.
    pub fn review_entry_selectors(&self) -> Vec<String> {
        self.review_keywords
            .iter()
            .map(|word| format!("button[aria-label*=\"{word}\" i]"))
            .chain(self.review_entry_fallbacks.iter().cloned())
            .collect()
    }
}
