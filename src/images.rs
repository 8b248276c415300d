//! Review image downloads.
//!
//! Avatars and review photos are optional extras. Each file downloads on a
//! bounded worker pool, files already on disk are skipped, and per-file
//! failures are logged without failing the job that requested them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::app::Result;
use crate::domain::Review;

pub const DEFAULT_WORKERS: usize = 4;

pub struct ImageFetcher {
    client: Client,
    dir: PathBuf,
    semaphore: Arc<Semaphore>,
}

/// One download to attempt: source URL plus destination under the image root.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Download {
    url: String,
    dest: PathBuf,
}

impl ImageFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_workers(dir, DEFAULT_WORKERS)
    }

    pub fn with_workers(dir: impl Into<PathBuf>, workers: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("magpie/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            dir: dir.into(),
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Download every avatar and review photo in the batch. Returns the
    /// number of files actually written.
    pub async fn fetch_all(&self, reviews: &[Review]) -> usize {
        let downloads = plan_downloads(&self.dir, reviews);
        if downloads.is_empty() {
            return 0;
        }

        let mut handles = Vec::new();
        for download in downloads {
            let client = self.client.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                match fetch_single(&client, &download).await {
                    Ok(written) => written,
                    Err(e) => {
                        warn!("Skipping image {}: {}", download.url, e);
                        false
                    }
                }
            });

            handles.push(handle);
        }

        let mut written = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        written
    }
}

async fn fetch_single(client: &Client, download: &Download) -> Result<bool> {
    if download.dest.exists() {
        debug!("Image {} already on disk", download.dest.display());
        return Ok(false);
    }

    let response = client.get(&download.url).send().await?;
    response.error_for_status_ref()?;
    let body = response.bytes().await?;

    if let Some(parent) = download.dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&download.dest, &body).await?;

    debug!("Saved {} to {}", download.url, download.dest.display());
    Ok(true)
}

fn plan_downloads(dir: &Path, reviews: &[Review]) -> Vec<Download> {
    let mut downloads = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for review in reviews {
        if !review.avatar.is_empty() {
            if let Some(name) = filename_for(&review.avatar, &review.id, 0) {
                let dest = dir.join("avatars").join(name);
                if seen.insert(dest.clone()) {
                    downloads.push(Download {
                        url: review.avatar.clone(),
                        dest,
                    });
                }
            }
        }

        for (i, photo) in review.photos.iter().enumerate() {
            if let Some(name) = filename_for(photo, &review.id, i) {
                let dest = dir.join("reviews").join(name);
                if seen.insert(dest.clone()) {
                    downloads.push(Download {
                        url: photo.clone(),
                        dest,
                    });
                }
            }
        }
    }

    downloads
}

/// Filename for a remote image: the last URL path segment, or a name derived
/// from the review id when the URL does not provide a usable one. Returns
/// `None` for URLs that do not parse at all.
fn filename_for(raw_url: &str, review_id: &str, index: usize) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
        .trim_matches(|c: char| c == '.' || c.is_whitespace());

    if segment.is_empty() {
        Some(format!("{}_{}", review_id, index))
    } else {
        Some(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_with_images(id: &str, avatar: &str, photos: &[&str]) -> Review {
        let mut review = Review::new(id, "Cafe Luna");
        review.avatar = avatar.into();
        review.photos = photos.iter().map(|p| p.to_string()).collect();
        review
    }

    #[test]
    fn test_filename_from_path_segment() {
        let name = filename_for("https://img.example.com/photos/abc123", "r-1", 0);
        assert_eq!(name.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_filename_falls_back_to_review_id() {
        // Trailing slash leaves an empty final segment.
        let name = filename_for("https://img.example.com/photos/", "r-1", 2);
        assert_eq!(name.as_deref(), Some("r-1_2"));

        // Dot-only segments must not become a path component.
        let name = filename_for("https://img.example.com/..", "r-1", 0);
        assert_eq!(name.as_deref(), Some("r-1_0"));
    }

    #[test]
    fn test_filename_rejects_unparseable_url() {
        assert!(filename_for("not a url", "r-1", 0).is_none());
    }

    #[test]
    fn test_plan_splits_avatars_and_photos() {
        let review = review_with_images(
            "r-1",
            "https://img.example.com/faces/dana",
            &[
                "https://img.example.com/photos/p1",
                "https://img.example.com/photos/p2",
            ],
        );

        let downloads = plan_downloads(Path::new("/tmp/images"), &[review]);
        assert_eq!(downloads.len(), 3);
        assert_eq!(downloads[0].dest, Path::new("/tmp/images/avatars/dana"));
        assert_eq!(downloads[1].dest, Path::new("/tmp/images/reviews/p1"));
        assert_eq!(downloads[2].dest, Path::new("/tmp/images/reviews/p2"));
    }

    #[test]
    fn test_plan_skips_empty_avatar_and_dedupes() {
        let first = review_with_images("r-1", "", &["https://img.example.com/photos/shared"]);
        let second = review_with_images("r-2", "", &["https://img.example.com/photos/shared"]);

        let downloads = plan_downloads(Path::new("/tmp/images"), &[first, second]);
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].dest, Path::new("/tmp/images/reviews/shared"));
    }

    #[test]
    fn test_existing_file_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("avatars").join("dana");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"cached").unwrap();

        let client = Client::new();
        let download = Download {
            url: "https://img.example.com/faces/dana".into(),
            dest: dest.clone(),
        };

        // Skips before any network call, so no server is needed.
        let written = tokio_test::block_on(fetch_single(&client, &download)).unwrap();
        assert!(!written);
        assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    }

    #[test]
    fn test_fetch_all_with_no_images_is_a_no_op() {
        let fetcher = ImageFetcher::new("/tmp/images");
        let review = review_with_images("r-1", "", &[]);
        let written = tokio_test::block_on(fetcher.fetch_all(&[review]));
        assert_eq!(written, 0);
    }
}
