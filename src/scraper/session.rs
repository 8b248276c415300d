//! One extraction attempt over one dedicated browser.
//!
//! A session walks a fixed sequence of states: launch the browser, load the
//! listing page, identify the listing, clear any consent overlay, open the
//! reviews feed, optionally re-sort it, find the scrollable pane, then
//! scroll and extract until the pane stops yielding new cards. Failures
//! that end the attempt are returned as values; the retry layer decides
//! what happens next.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::review::UNKNOWN_COMPANY;
use crate::domain::{Progress, Review, ScrapePhase};
use crate::normalize::LangCache;
use crate::scraper::card;
use crate::scraper::config::ScraperConfig;
use crate::scraper::ledger::Ledger;
use crate::scraper::locator;

/// How often bounded waits re-probe the page.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Per-selector wait for the listing name.
const NAME_WAIT: Duration = Duration::from_secs(2);
/// Wait for a consent control before assuming there is none.
const COOKIE_WAIT: Duration = Duration::from_secs(3);
/// Per-selector wait for reviews-entry candidates.
const ENTRY_WAIT: Duration = Duration::from_secs(5);
/// Wait for the sort menu button.
const SORT_WAIT: Duration = Duration::from_secs(10);
/// Settle after clicking the reviews entry.
const CLICK_SETTLE: Duration = Duration::from_millis(1500);
/// Settle after opening a menu or dismissing an overlay.
const MENU_SETTLE: Duration = Duration::from_secs(1);
/// Best-effort bound on the navigation event; the body probe is the real gate.
const NAV_EVENT_WAIT: Duration = Duration::from_secs(10);

/// Ways a single attempt can die. These never cross the supervisor
/// boundary.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no reviews entry found on the page")]
    ReviewsEntryNotFound,

    #[error("reviews pane never appeared")]
    PanelNotFound,
}

pub(crate) struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
    config: ScraperConfig,
    company_name: Option<String>,
}

impl Session {
    /// Start a fresh browser with a blank page.
    pub async fn launch(config: &ScraperConfig) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(1400, 900);

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            SessionError::Launch(format!(
                "{e}. Is Chrome or Chromium installed and in PATH?"
            ))
        })?;

        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(SessionError::Launch(format!("failed to open a page: {e}")));
            }
        };

        if let Some(ref ua) = config.user_agent {
            if let Err(e) = page.set_user_agent(ua).await {
                debug!("Could not set user agent: {}", e);
            }
        }

        Ok(Self {
            browser,
            handler_task,
            page,
            config: config.clone(),
            company_name: None,
        })
    }

    /// Drive the attempt end to end.
    pub async fn run(
        &mut self,
        url: &str,
        progress: &Progress,
    ) -> Result<Vec<Review>, SessionError> {
        progress.advance(15);
        self.navigate(url, progress).await?;

        let company = self.identify_listing(progress).await;
        self.company_name = Some(company.clone());

        self.dismiss_interstitial().await;
        self.locate_reviews_entry(progress).await?;
        self.apply_sort().await;

        let panel = self.locate_reviews_panel().await?;
        Ok(self.scroll_and_extract(&panel, &company, progress).await)
    }

    /// Name of the listing if this session got far enough to read it.
    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    /// Close the page and browser and stop the event handler. Runs on
    /// every exit path, success or failure.
    pub async fn teardown(mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Page close failed: {}", e);
        }
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        self.handler_task.abort();
    }

    async fn navigate(&self, url: &str, progress: &Progress) -> Result<(), SessionError> {
        progress.set_phase(ScrapePhase::Navigating);
        info!("Navigating to {}", url);

        self.page.goto(url).await.map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        // The load event can hang on heavy listing pages.
        let _ = tokio::time::timeout(NAV_EVENT_WAIT, self.page.wait_for_navigation()).await;
        tokio::time::sleep(self.config.settle()).await;

        if self
            .wait_for_element("body", self.config.wait_timeout())
            .await
            .is_none()
        {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "document body never appeared".to_string(),
            });
        }
        Ok(())
    }

    /// Find the listing's display name. This never fails the attempt: it
    /// falls back to the page title and finally to a sentinel.
    async fn identify_listing(&self, progress: &Progress) -> String {
        progress.update(
            ScrapePhase::IdentifyingListing,
            25,
            "Searching for company name...",
        );

        for selector in &self.config.company_name_selectors {
            let Some(element) = self.wait_for_element(selector, NAME_WAIT).await else {
                continue;
            };
            if let Ok(Some(text)) = element.inner_text().await {
                let name = text.trim();
                if !name.is_empty() {
                    info!("Found company: {}", name);
                    progress.update(
                        ScrapePhase::IdentifyingListing,
                        40,
                        format!("Found company: {name}"),
                    );
                    return name.to_string();
                }
            }
        }

        let fallback = match self.page.get_title().await {
            Ok(Some(title)) => company_from_title(&title, &self.config.title_suffix)
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            _ => UNKNOWN_COMPANY.to_string(),
        };

        warn!("No name selector matched; using page title: {}", fallback);
        progress.update(
            ScrapePhase::IdentifyingListing,
            40,
            format!("Found company: {fallback}"),
        );
        fallback
    }

    /// Click through a cookie or consent overlay if one is up. Best
    /// effort: most pages show none.
    async fn dismiss_interstitial(&self) {
        let deadline = Instant::now() + COOKIE_WAIT;
        loop {
            for selector in &self.config.cookie_selectors {
                let Some(button) = locator::find_all(&self.page, selector).await.into_iter().next()
                else {
                    continue;
                };
                match button.click().await {
                    Ok(_) => {
                        info!("Dismissed consent dialog");
                        tokio::time::sleep(MENU_SETTLE).await;
                    }
                    Err(e) => debug!("Consent dialog click failed: {}", e),
                }
                return;
            }
            if Instant::now() >= deadline {
                debug!("No consent dialog detected");
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Find and click the control that opens the reviews feed.
    async fn locate_reviews_entry(&self, progress: &Progress) -> Result<(), SessionError> {
        progress.update(
            ScrapePhase::LocatingReviews,
            45,
            "Looking for the reviews tab...",
        );

        for selector in self.config.review_entry_selectors() {
            if self.wait_for_element(&selector, ENTRY_WAIT).await.is_none() {
                continue;
            }
            for candidate in locator::find_all(&self.page, &selector).await {
                if !self.mentions_reviews(&candidate).await {
                    continue;
                }
                match candidate.click().await {
                    Ok(_) => {
                        info!("Opened reviews via selector: {}", selector);
                        progress.update(
                            ScrapePhase::LocatingReviews,
                            60,
                            "Navigated to reviews section",
                        );
                        tokio::time::sleep(CLICK_SETTLE).await;
                        return Ok(());
                    }
                    Err(e) => {
                        debug!("Reviews entry click failed, trying next candidate: {}", e)
                    }
                }
            }
        }
        Err(SessionError::ReviewsEntryNotFound)
    }

    /// Whether a control's visible text mentions reviews. Staleness
    /// disqualifies the element, nothing more.
    async fn mentions_reviews(&self, element: &Element) -> bool {
        let Ok(Some(text)) = element.inner_text().await else {
            return false;
        };
        let lowered = text.to_lowercase();
        self.config
            .review_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword))
    }

    /// Re-sort the reviews feed when a non-default order was requested.
    /// Best effort end to end: every failure is logged and swallowed.
    async fn apply_sort(&self) {
        let order = self.config.sort_by;
        if order.is_default() {
            debug!("Keeping the page's default review ordering");
            return;
        }

        let Some(button) = self
            .wait_for_element(&self.config.sort_button_selector, SORT_WAIT)
            .await
        else {
            warn!("Could not set sort order to '{}': sort button not found", order);
            return;
        };
        if let Err(e) = button.click().await {
            warn!("Could not set sort order to '{}': {}", order, e);
            return;
        }
        tokio::time::sleep(MENU_SETTLE).await;

        let keyword = order.keyword();
        for item in locator::find_all(&self.page, &self.config.sort_menu_selector).await {
            let Ok(Some(text)) = item.inner_text().await else {
                continue;
            };
            if !text.to_lowercase().contains(keyword) {
                continue;
            }
            match item.click().await {
                Ok(_) => {
                    info!("Sorted reviews by {}", order);
                    tokio::time::sleep(MENU_SETTLE).await;
                }
                Err(e) => warn!("Could not set sort order to '{}': {}", order, e),
            }
            return;
        }
        warn!(
            "Could not set sort order to '{}': no matching menu entry",
            order
        );
    }

    async fn locate_reviews_panel(&self) -> Result<Element, SessionError> {
        self.wait_for_element(&self.config.panel_selector, self.config.wait_timeout())
            .await
            .ok_or(SessionError::PanelNotFound)
    }

    /// Accumulate reviews until the pane stops yielding new cards for
    /// `max_idle_passes` passes in a row. That heuristic is the only bound
    /// on the loop.
    async fn scroll_and_extract(
        &self,
        panel: &Element,
        company: &str,
        progress: &Progress,
    ) -> Vec<Review> {
        progress.set_phase(ScrapePhase::Extracting);
        let mut ledger = Ledger::new();
        let mut langs = LangCache::default();

        while !ledger.exhausted(self.config.max_idle_passes) {
            ledger.begin_pass();
            for card_el in locator::find_all(panel, &self.config.card_selector).await {
                let id = match card_el.attribute(&self.config.id_attribute).await {
                    Ok(Some(value)) if !value.trim().is_empty() => value,
                    // Unreadable or blank id: skip now, the card may be
                    // re-read on a later pass. Nothing was inserted.
                    _ => continue,
                };
                if !ledger.is_new(&id) {
                    continue;
                }

                let review = card::parse(&card_el, &id, company, &mut langs).await;
                ledger.insert(review);
                progress.update(
                    ScrapePhase::Extracting,
                    scroll_progress(ledger.len(), self.config.progress_target),
                    format!("Scraping reviews ({} found)...", ledger.len()),
                );
            }
            let new_records = ledger.end_pass();
            debug!(
                "Extraction pass: {} new, {} total, {} idle",
                new_records,
                ledger.len(),
                ledger.idle_passes()
            );

            self.scroll_panel_to_bottom(panel).await;
            tokio::time::sleep(self.config.scroll_pause()).await;
        }

        info!("Scroll loop finished with {} unique reviews", ledger.len());
        ledger.into_reviews()
    }

    /// Push the pane to its current bottom so more cards lazy-load.
    async fn scroll_panel_to_bottom(&self, panel: &Element) {
        if let Err(e) = panel
            .call_js_fn("function() { this.scrollTop = this.scrollHeight; }", false)
            .await
        {
            debug!("Pane scroll failed: {}", e);
        }
    }

    /// Poll for the first match of `selector` until `timeout` runs out.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Option<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = locator::find_all(&self.page, selector).await.into_iter().next()
            {
                return Some(element);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Percentage shown during the scroll loop: climbs from 60 toward 90 as
/// the count approaches `target`, then holds there.
fn scroll_progress(found: usize, target: usize) -> u8 {
    let ratio = (found as f64 / target.max(1) as f64).min(1.0);
    60 + (ratio * 30.0).floor() as u8
}

/// Listing name from a page title, only when the title carries the maps
/// suffix: the portion before its first occurrence, trimmed. Titles
/// without the suffix yield nothing.
fn company_from_title(title: &str, suffix: &str) -> Option<String> {
    let (name, _) = title.split_once(suffix)?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_progress_formula() {
        assert_eq!(scroll_progress(0, 150), 60);
        assert_eq!(scroll_progress(75, 150), 75);
        assert_eq!(scroll_progress(150, 150), 90);
        // Holds at the ceiling past the target.
        assert_eq!(scroll_progress(400, 150), 90);
    }

    #[test]
    fn test_scroll_progress_rounds_down() {
        // 7/150 of 30 is 1.4, which floors to 1.
        assert_eq!(scroll_progress(7, 150), 61);
    }

    #[test]
    fn test_scroll_progress_with_degenerate_target() {
        assert_eq!(scroll_progress(0, 0), 60);
        assert_eq!(scroll_progress(10, 0), 90);
    }

    const SUFFIX: &str = " - Google Maps";

    #[test]
    fn test_company_from_title_takes_part_before_suffix() {
        assert_eq!(
            company_from_title("Cafe Luna - Google Maps", SUFFIX),
            Some("Cafe Luna".to_string())
        );
    }

    #[test]
    fn test_company_from_title_splits_at_first_occurrence() {
        assert_eq!(
            company_from_title("Maps Cafe - Google Maps - Google Maps", SUFFIX),
            Some("Maps Cafe".to_string())
        );
    }

    #[test]
    fn test_company_from_title_ignores_unrelated_titles() {
        // A consent wall or error page title must not become the name.
        assert_eq!(company_from_title("Before you continue", SUFFIX), None);
    }

    #[test]
    fn test_company_from_title_empty_title() {
        assert_eq!(company_from_title("", SUFFIX), None);
    }

    #[test]
    fn test_company_from_title_suffix_alone() {
        assert_eq!(company_from_title(" - Google Maps", SUFFIX), None);
    }
}
