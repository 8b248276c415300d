use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Company name recorded when listing identification failed.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// One captured review.
///
/// The `id` is the stable identifier the listing page assigns to the review
/// card. It is read straight from the DOM, never synthesized, and serves as
/// the dedupe key everywhere: within a scroll loop, in the store, across
/// repeat runs. All other fields degrade to neutral defaults when the card
/// did not carry them or the read failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub company_name: String,
    pub author: String,
    pub rating: u32,
    pub text: String,
    pub language: String,
    pub published_at: String,
    pub likes: u32,
    pub photos: Vec<String>,
    pub author_profile: String,
    pub avatar: String,
    pub owner_reply: String,
    /// Classifier label, absent until post-processing runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl Review {
    pub fn new(id: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_name: company_name.into(),
            author: String::new(),
            rating: 0,
            text: String::new(),
            language: "en".to_string(),
            published_at: String::new(),
            likes: 0,
            photos: Vec::new(),
            author_profile: String::new(),
            avatar: String::new(),
            owner_reply: String::new(),
            prediction: None,
            scraped_at: Utc::now(),
        }
    }

    pub fn display_author(&self) -> &str {
        if self.author.is_empty() {
            "(Anonymous)"
        } else {
            &self.author
        }
    }

    /// First `max_chars` characters of the review text for list views.
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let cut: String = self.text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
