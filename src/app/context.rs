use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{MagpieError, Result};
use crate::classifier;
use crate::config::Config;
use crate::images::ImageFetcher;
use crate::jobs::JobManager;
use crate::report::ReportWriter;
use crate::scraper::ReviewScraper;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub jobs: JobManager<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.storage.db_path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::assemble(config, store))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::assemble(config, store))
    }

    fn assemble(config: Config, store: Arc<SqliteStore>) -> Self {
        let scraper = Arc::new(ReviewScraper::new(config.scraper.clone()));
        let classifier = classifier::build(config.classifier.mode, &config.classifier.phrases);
        let reports = ReportWriter::new(config.storage.reports_dir.clone());
        let images = config.images.enabled.then(|| {
            ImageFetcher::with_workers(config.images.dir.clone(), config.images.max_concurrent)
        });

        let jobs = JobManager::new(
            scraper,
            classifier,
            store.clone(),
            reports,
            images,
            config.jobs.max_concurrent,
        );

        Self {
            config,
            store,
            jobs,
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| MagpieError::Config("Could not find data directory".into()))?;
        let magpie_dir = data_dir.join("magpie");
        std::fs::create_dir_all(&magpie_dir)?;
        Ok(magpie_dir.join("magpie.db"))
    }
}
