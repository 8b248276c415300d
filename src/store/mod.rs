pub mod sqlite;

use crate::app::Result;
use crate::domain::{Company, Review};

pub use sqlite::SqliteStore;

pub trait Store {
    // Company operations
    fn upsert_company(&self, name: &str, url: &str) -> Result<i64>;
    fn get_company_by_name(&self, name: &str) -> Result<Option<Company>>;
    fn get_all_companies(&self) -> Result<Vec<Company>>;

    // Review operations
    fn add_reviews(&self, company_id: i64, reviews: &[Review]) -> Result<usize>;
    fn get_reviews_by_company(&self, company_id: i64) -> Result<Vec<Review>>;
    fn review_exists(&self, id: &str) -> Result<bool>;
    fn review_count(&self, company_id: i64) -> Result<i64>;
}
