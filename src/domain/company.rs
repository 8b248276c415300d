use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing the store has seen at least once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub first_scraped_at: DateTime<Utc>,
    pub last_scraped_at: DateTime<Utc>,
}
