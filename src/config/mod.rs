//! Configuration management.
//!
//! Configuration is read from `~/.config/magpie/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Command-line flags are applied afterwards through
//! [`ConfigOverrides`]: each override is an explicit field, so a flag can
//! only ever replace the one setting it names.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classifier::{ClassifierMode, KeywordClassifier};
use crate::images;
use crate::jobs;
use crate::scraper::{ScraperConfig, SortOrder};

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub images: ImageConfig,
    pub classifier: ClassifierConfig,
    pub jobs: JobsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            storage: StorageConfig::default(),
            images: ImageConfig::default(),
            classifier: ClassifierConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

/// Where the database and exported reports live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. Defaults to `magpie.db` under the platform data dir.
    pub db_path: Option<PathBuf>,
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            reports_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub max_concurrent: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("images"),
            max_concurrent: images::DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    pub phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::default(),
            phrases: KeywordClassifier::default_phrases(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub max_concurrent: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: jobs::DEFAULT_CONCURRENT_JOBS,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            // Create default config with comments
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/magpie/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("magpie").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Magpie Configuration

[scraper]
# Run browser in headless mode (no visible window)
headless = true

# Review ordering requested from the listing page:
# "relevance", "newest", "highest", "lowest"
sort_by = "relevance"

# How many times to relaunch a failed scrape before giving up
max_attempts = 3

# Seconds to wait between attempts
retry_backoff_secs = 5

# Seconds to wait for the reviews panel to appear
wait_timeout_secs = 20

# Consecutive scroll passes with no new reviews before stopping
max_idle_passes = 5

# Review count treated as 100% of the extraction progress band
progress_target = 150

[storage]
# Where exported JSON reports are written
reports_dir = "reports"

# Database file. Uncomment to override the platform default.
# db_path = "magpie.db"

[images]
# Download review photos and author avatars after each job
enabled = false

# Where downloaded images are written
dir = "images"

# Concurrent image downloads
max_concurrent = 4

[classifier]
# "keyword" flags suspicious marketing phrases, "random" is a coin flip
mode = "keyword"

# Phrases the keyword mode treats as suspicious (case-insensitive)
# phrases = ["out of this world", "free drink"]

[jobs]
# Concurrent scrape jobs (each one is a browser)
max_concurrent = 2
"##
        .to_string()
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub sort_by: Option<SortOrder>,
    pub download_images: Option<bool>,
    pub db_path: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(headless) = self.headless {
            config.scraper.headless = headless;
        }
        if let Some(sort_by) = self.sort_by {
            config.scraper.sort_by = sort_by;
        }
        if let Some(download_images) = self.download_images {
            config.images.enabled = download_images;
        }
        if let Some(db_path) = self.db_path {
            config.storage.db_path = Some(db_path);
        }
        if let Some(reports_dir) = self.reports_dir {
            config.storage.reports_dir = reports_dir;
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
