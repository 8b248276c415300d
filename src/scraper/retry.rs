//! Bounded-retry supervision around extraction sessions.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::review::UNKNOWN_COMPANY;
use crate::domain::Progress;
use crate::scraper::config::ScraperConfig;
use crate::scraper::session::{Session, SessionError};
use crate::scraper::{ScrapeOutcome, Scraper};

/// Run `attempt` up to `attempts` times with a fixed pause between
/// failures. Returns the first success, `None` once every attempt failed.
pub(crate) async fn with_retries<T, E, F, Fut>(
    attempts: u32,
    backoff: Duration,
    mut attempt: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for n in 1..=attempts {
        match attempt(n).await {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", n, attempts, e);
                if n < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    None
}

/// The public scraper: retries fresh extraction sessions until one
/// succeeds or the attempts are used up.
///
/// Nothing carries over between attempts except the last listing name a
/// session managed to read, which makes an all-attempts-failed outcome
/// more useful than the bare sentinel.
pub struct ReviewScraper {
    config: ScraperConfig,
}

impl ReviewScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScraperConfig::default())
    }

    async fn run_attempt(
        &self,
        attempt: u32,
        url: &str,
        progress: &Progress,
        last_company: &Mutex<Option<String>>,
    ) -> Result<ScrapeOutcome, SessionError> {
        info!(
            "Scraping attempt {}/{} for {}",
            attempt, self.config.max_attempts, url
        );
        if attempt > 1 {
            progress.reset(0);
        }

        let mut session = Session::launch(&self.config).await?;
        let result = session.run(url, progress).await;

        if let Some(name) = session.company_name() {
            *last_company.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
        }

        match result {
            Ok(reviews) => {
                let company_name = session
                    .company_name()
                    .unwrap_or(UNKNOWN_COMPANY)
                    .to_string();
                session.teardown().await;
                info!(
                    "Scraping successful: {} unique reviews for {}",
                    reviews.len(),
                    company_name
                );
                Ok(ScrapeOutcome {
                    company_name,
                    reviews,
                })
            }
            Err(e) => {
                session.teardown().await;
                Err(e)
            }
        }
    }
}

fn exhausted_outcome(company_name: Option<String>) -> ScrapeOutcome {
    ScrapeOutcome {
        company_name: company_name.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        reviews: Vec::new(),
    }
}

#[async_trait]
impl Scraper for ReviewScraper {
    async fn scrape(&self, url: &str, progress: &Progress) -> ScrapeOutcome {
        let last_company: Mutex<Option<String>> = Mutex::new(None);

        let outcome = with_retries(
            self.config.max_attempts,
            self.config.retry_backoff(),
            |attempt| self.run_attempt(attempt, url, progress, &last_company),
        )
        .await;

        match outcome {
            Some(outcome) => outcome,
            None => {
                warn!(
                    "All {} attempts failed for {}; returning an empty result",
                    self.config.max_attempts, url
                );
                let company = last_company
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner);
                exhausted_outcome(company)
            }
        }
    }
}
