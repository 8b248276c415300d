//! Report export.
//!
//! Every completed job drops a JSON artifact with the full review batch so
//! downstream consumers can pick results up from disk without touching the
//! database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::app::Result;
use crate::domain::Review;

/// On-disk payload for one completed job.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub company_name: &'a str,
    pub generated_at: DateTime<Utc>,
    pub review_count: usize,
    pub reviews: &'a [Review],
}

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the job's reviews as pretty JSON and return the file path.
    pub fn write(&self, job_id: Uuid, company_name: &str, reviews: &[Review]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(report_filename(company_name, job_id));
        let report = Report {
            company_name,
            generated_at: Utc::now(),
            review_count: reviews.len(),
            reviews,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json)?;

        info!("Wrote {} reviews to {}", reviews.len(), path.display());
        Ok(path)
    }
}

fn report_filename(company_name: &str, job_id: Uuid) -> String {
    let job = job_id.simple().to_string();
    format!("{}_{}.json", sanitize(company_name), &job[..8])
}

/// Collapse anything the filesystem might dislike into underscores.
fn sanitize(name: &str) -> String {
    static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars =
        UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^\w.-]+").expect("valid filename pattern"));

    let cleaned = unsafe_chars.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "report".to_string()
    } else {
        cleaned.to_string()
    }
}
