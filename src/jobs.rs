//! Background job coordination.
//!
//! Each submitted URL becomes a job with its own id, status, and progress
//! sink. The jobs map is only locked for field reads and writes; the scrape
//! itself runs on a spawned task that holds nothing but its own entry's
//! progress handle, so pollers are never blocked behind a running browser.
//! A semaphore bounds how many browsers run at once; jobs past the limit
//! stay queued until a slot frees up.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::app::{MagpieError, Result};
use crate::classifier::Classifier;
use crate::domain::{Progress, Review, ScrapePhase};
use crate::images::ImageFetcher;
use crate::report::ReportWriter;
use crate::scraper::Scraper;
use crate::store::Store;

pub const DEFAULT_CONCURRENT_JOBS: usize = 2;

/// Lifecycle of one submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Analyzing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// Mutable state for one job. The progress sink is shared with the worker
/// task; every other field is written back through the jobs map.
struct Job {
    url: String,
    status: JobStatus,
    progress: Arc<Progress>,
    company_name: Option<String>,
    review_count: usize,
    new_reviews: usize,
    report_path: Option<PathBuf>,
    submitted_at: DateTime<Utc>,
}

/// Point-in-time view of a job for pollers.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub percentage: u8,
    pub message: String,
    pub phase: ScrapePhase,
    pub company_name: Option<String>,
    pub review_count: usize,
    pub new_reviews: usize,
    pub report_path: Option<PathBuf>,
    pub submitted_at: DateTime<Utc>,
}

pub struct JobManager<S> {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    scraper: Arc<dyn Scraper>,
    classifier: Arc<dyn Classifier>,
    store: Arc<S>,
    reports: Arc<ReportWriter>,
    images: Option<Arc<ImageFetcher>>,
    slots: Arc<Semaphore>,
}

impl<S: Store + Send + Sync + 'static> JobManager<S> {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        classifier: Arc<dyn Classifier>,
        store: Arc<S>,
        reports: ReportWriter,
        images: Option<ImageFetcher>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            scraper,
            classifier,
            store,
            reports: Arc::new(reports),
            images: images.map(Arc::new),
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Validate the URL, register the job, and spawn its worker. Returns
    /// the job id immediately; callers follow along via [`snapshot`].
    ///
    /// [`snapshot`]: JobManager::snapshot
    pub async fn submit(&self, url: &str) -> Result<Uuid> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(MagpieError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let id = Uuid::new_v4();
        let progress = Arc::new(Progress::new());
        progress.update(ScrapePhase::Queued, 0, "Job is queued");

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(
                id,
                Job {
                    url: parsed.to_string(),
                    status: JobStatus::Pending,
                    progress: progress.clone(),
                    company_name: None,
                    review_count: 0,
                    new_reviews: 0,
                    report_path: None,
                    submitted_at: Utc::now(),
                },
            );
        }

        self.spawn_worker(id, parsed.to_string(), progress);
        info!("Submitted job {} for {}", id, url);
        Ok(id)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(&id)
            .ok_or_else(|| MagpieError::JobNotFound(id.to_string()))?;
        Ok(snapshot_of(id, job))
    }

    pub async fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<JobSnapshot> = jobs.iter().map(|(id, job)| snapshot_of(*id, job)).collect();
        all.sort_by_key(|snap| snap.submitted_at);
        all
    }

    fn spawn_worker(&self, id: Uuid, url: String, progress: Arc<Progress>) {
        let jobs = self.jobs.clone();
        let scraper = self.scraper.clone();
        let classifier = self.classifier.clone();
        let store = self.store.clone();
        let reports = self.reports.clone();
        let images = self.images.clone();
        let slots = self.slots.clone();

        tokio::spawn(async move {
            let _permit = slots.acquire().await.expect("Semaphore closed");

            with_job(&jobs, id, |job| job.status = JobStatus::Running).await;
            progress.update(ScrapePhase::Initializing, 5, "Initializing scraper...");

            let outcome = scraper.scrape(&url, &progress).await;

            with_job(&jobs, id, |job| job.status = JobStatus::Analyzing).await;
            progress.update(ScrapePhase::Analyzing, 95, "Analyzing reviews...");

            let mut reviews = outcome.reviews;
            for review in &mut reviews {
                review.prediction = Some(classifier.label(review));
            }

            let persisted = persist(
                store.as_ref(),
                &reports,
                id,
                &outcome.company_name,
                &url,
                &reviews,
            );

            match persisted {
                Ok((new_reviews, report_path)) => {
                    if let Some(images) = images {
                        let saved = images.fetch_all(&reviews).await;
                        if saved > 0 {
                            info!("Job {} saved {} images", id, saved);
                        }
                    }

                    with_job(&jobs, id, |job| {
                        job.status = JobStatus::Complete;
                        job.company_name = Some(outcome.company_name.clone());
                        job.review_count = reviews.len();
                        job.new_reviews = new_reviews;
                        job.report_path = Some(report_path.clone());
                    })
                    .await;
                    progress.update(ScrapePhase::Complete, 100, "Done!");
                    info!(
                        "Job {} complete: {} reviews for {:?} ({} new)",
                        id,
                        reviews.len(),
                        outcome.company_name,
                        new_reviews
                    );
                }
                Err(e) => {
                    error!("Job {} failed: {}", id, e);
                    with_job(&jobs, id, |job| {
                        job.status = JobStatus::Error;
                        job.company_name = Some(outcome.company_name.clone());
                        job.review_count = reviews.len();
                    })
                    .await;
                    progress.fail(format!("Job failed: {}", e));
                }
            }
        });
    }
}

/// Store the batch and write the report. An empty batch still records the
/// company and produces a report; only store or filesystem errors fail the
/// job at this point.
fn persist<S: Store>(
    store: &S,
    reports: &ReportWriter,
    id: Uuid,
    company_name: &str,
    url: &str,
    reviews: &[Review],
) -> Result<(usize, PathBuf)> {
    let company_id = store.upsert_company(company_name, url)?;
    let new_reviews = store.add_reviews(company_id, reviews)?;
    let report_path = reports.write(id, company_name, reviews)?;
    Ok((new_reviews, report_path))
}

async fn with_job<F: FnOnce(&mut Job)>(jobs: &RwLock<HashMap<Uuid, Job>>, id: Uuid, f: F) {
    let mut jobs = jobs.write().await;
    if let Some(job) = jobs.get_mut(&id) {
        f(job);
    }
}

fn snapshot_of(id: Uuid, job: &Job) -> JobSnapshot {
    let progress = job.progress.snapshot();
    JobSnapshot {
        id,
        url: job.url.clone(),
        status: job.status,
        percentage: progress.percentage,
        message: progress.message,
        phase: progress.phase,
        company_name: job.company_name.clone(),
        review_count: job.review_count,
        new_reviews: job.new_reviews,
        report_path: job.report_path.clone(),
        submitted_at: job.submitted_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::classifier::KeywordClassifier;
    use crate::scraper::ScrapeOutcome;
    use crate::store::SqliteStore;

    struct StubScraper {
        company: String,
        reviews: Vec<Review>,
    }

    #[async_trait]
    impl Scraper for StubScraper {
        async fn scrape(&self, _url: &str, progress: &Progress) -> ScrapeOutcome {
            progress.update(ScrapePhase::Extracting, 90, "Collecting reviews...");
            ScrapeOutcome {
                company_name: self.company.clone(),
                reviews: self.reviews.clone(),
            }
        }
    }

    fn sample_reviews() -> Vec<Review> {
        let mut genuine = Review::new("r-1", "Cafe Luna");
        genuine.text = "Quiet on weekdays, good espresso.".into();
        let mut suspicious = Review::new("r-2", "Cafe Luna");
        suspicious.text = "Out of this world! Best place ever!".into();
        vec![genuine, suspicious]
    }

    fn manager_with(
        stub: StubScraper,
        store: Arc<SqliteStore>,
        reports_dir: &std::path::Path,
    ) -> JobManager<SqliteStore> {
        JobManager::new(
            Arc::new(stub),
            Arc::new(KeywordClassifier::default()),
            store,
            ReportWriter::new(reports_dir),
            None,
            2,
        )
    }

    async fn wait_terminal(manager: &JobManager<SqliteStore>, id: Uuid) -> JobSnapshot {
        for _ in 0..500 {
            let snap = manager.snapshot(id).await.unwrap();
            if snap.status.is_terminal() {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal status");
    }

    #[tokio::test]
    async fn test_submit_rejects_non_http_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let manager = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: vec![],
            },
            store,
            dir.path(),
        );

        assert!(manager.submit("ftp://example.com/listing").await.is_err());
        assert!(manager.submit("not a url at all").await.is_err());
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_stores_labels_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let manager = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: sample_reviews(),
            },
            store.clone(),
            dir.path(),
        );

        let id = manager
            .submit("https://maps.example.com/place/cafe-luna")
            .await
            .unwrap();
        let snap = wait_terminal(&manager, id).await;

        assert_eq!(snap.status, JobStatus::Complete);
        assert_eq!(snap.percentage, 100);
        assert_eq!(snap.message, "Done!");
        assert_eq!(snap.company_name.as_deref(), Some("Cafe Luna"));
        assert_eq!(snap.review_count, 2);
        assert_eq!(snap.new_reviews, 2);
        assert!(snap.report_path.as_ref().unwrap().exists());

        let company = store.get_company_by_name("Cafe Luna").unwrap().unwrap();
        let stored = store.get_reviews_by_company(company.id).unwrap();
        assert_eq!(stored.len(), 2);

        let by_id = |id: &str| stored.iter().find(|r| r.id == id).unwrap().clone();
        assert_eq!(by_id("r-1").prediction.as_deref(), Some("Genuine"));
        assert_eq!(by_id("r-2").prediction.as_deref(), Some("Fake"));
    }

    #[tokio::test]
    async fn test_empty_outcome_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let manager = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: vec![],
            },
            store.clone(),
            dir.path(),
        );

        let id = manager
            .submit("https://maps.example.com/place/cafe-luna")
            .await
            .unwrap();
        let snap = wait_terminal(&manager, id).await;

        assert_eq!(snap.status, JobStatus::Complete);
        assert_eq!(snap.review_count, 0);
        assert_eq!(snap.new_reviews, 0);
        assert!(snap.report_path.as_ref().unwrap().exists());
        assert!(store.get_company_by_name("Cafe Luna").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_run_counts_only_new_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let first = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: sample_reviews(),
            },
            store.clone(),
            dir.path(),
        );
        let id = first
            .submit("https://maps.example.com/place/cafe-luna")
            .await
            .unwrap();
        wait_terminal(&first, id).await;

        let second = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: sample_reviews(),
            },
            store.clone(),
            dir.path(),
        );
        let id = second
            .submit("https://maps.example.com/place/cafe-luna")
            .await
            .unwrap();
        let snap = wait_terminal(&second, id).await;

        assert_eq!(snap.status, JobStatus::Complete);
        assert_eq!(snap.review_count, 2);
        assert_eq!(snap.new_reviews, 0);

        let company = store.get_company_by_name("Cafe Luna").unwrap().unwrap();
        assert_eq!(store.review_count(company.id).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_unknown_job() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let manager = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: vec![],
            },
            store,
            dir.path(),
        );

        let missing = manager.snapshot(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(MagpieError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_by_submission() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let manager = manager_with(
            StubScraper {
                company: "Cafe Luna".into(),
                reviews: vec![],
            },
            store,
            dir.path(),
        );

        let first = manager
            .submit("https://maps.example.com/place/one")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = manager
            .submit("https://maps.example.com/place/two")
            .await
            .unwrap();

        let listed = manager.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first);
        assert_eq!(listed[1].id, second);

        wait_terminal(&manager, first).await;
        wait_terminal(&manager, second).await;
    }
}
