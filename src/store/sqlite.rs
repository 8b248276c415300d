use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{MagpieError, Result};
use crate::domain::{Company, Review};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| MagpieError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            MagpieError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
        Ok(Review {
            id: row.get(0)?,
            company_name: row.get(1)?,
            author: row.get(2)?,
            rating: row.get(3)?,
            text: row.get(4)?,
            language: row.get(5)?,
            published_at: row.get(6)?,
            likes: row.get(7)?,
            photos: row
                .get::<_, String>(8)
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            author_profile: row.get(9)?,
            avatar: row.get(10)?,
            owner_reply: row.get(11)?,
            prediction: row.get(12)?,
            scraped_at: row
                .get::<_, String>(13)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }
}

impl Store for SqliteStore {
    fn upsert_company(&self, name: &str, url: &str) -> Result<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO companies (name, url, first_scraped_at, last_scraped_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET url = ?2, last_scraped_at = ?3",
            params![name, url, now],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM companies WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, name, url, first_scraped_at, last_scraped_at
                 FROM companies WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Company {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        first_scraped_at: row
                            .get::<_, String>(3)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                        last_scraped_at: row
                            .get::<_, String>(4)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_companies(&self) -> Result<Vec<Company>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, url, first_scraped_at, last_scraped_at
             FROM companies ORDER BY name",
        )?;

        let companies = stmt
            .query_map([], |row| {
                Ok(Company {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                    first_scraped_at: row
                        .get::<_, String>(3)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                    last_scraped_at: row
                        .get::<_, String>(4)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(companies)
    }

    fn add_reviews(&self, company_id: i64, reviews: &[Review]) -> Result<usize> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        let mut count = 0;

        for review in reviews {
            let photos = serde_json::to_string(&review.photos)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO reviews
                 (id, company_id, author, rating, text, language, published_at, likes,
                  photos, author_profile, avatar, owner_reply, prediction, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    review.id,
                    company_id,
                    review.author,
                    review.rating,
                    review.text,
                    review.language,
                    review.published_at,
                    review.likes,
                    photos,
                    review.author_profile,
                    review.avatar,
                    review.owner_reply,
                    review.prediction,
                    review.scraped_at.to_rfc3339()
                ],
            )?;
            count += inserted;
        }

        tx.commit()?;
        Ok(count)
    }

    fn get_reviews_by_company(&self, company_id: i64) -> Result<Vec<Review>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT r.id, c.name, r.author, r.rating, r.text, r.language, r.published_at,
                    r.likes, r.photos, r.author_profile, r.avatar, r.owner_reply,
                    r.prediction, r.scraped_at
             FROM reviews r JOIN companies c ON c.id = r.company_id
             WHERE r.company_id = ?1
             ORDER BY r.published_at DESC, r.scraped_at DESC",
        )?;

        let reviews = stmt
            .query_map(params![company_id], Self::review_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    fn review_exists(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn review_count(&self, company_id: i64) -> Result<i64> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE company_id = ?1",
            params![company_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}
