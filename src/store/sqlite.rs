// src/store/sqlite.rs
//! SQLite-backed posting store.
//!
//! One `postings` table with a unique index on `(source_name, external_id)`.
//! Writes are `INSERT ... ON CONFLICT DO NOTHING`, so re-ingestion is a no-op.
//! rusqlite is synchronous; every call runs on the blocking pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::PostingStore;
use crate::error::StoreError;
use crate::ingest::types::{NewPosting, Posting};

pub const IN_MEMORY: &str = ":memory:";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

const COLUMNS: &str = "id, external_id, title, company, normalized_location, category, eligibility, \
     description, apply_url, resolution_method, source_name, source_listing_url, status, \
     job_type, salary_text, logo_url, published_at, first_seen_at";

impl SqliteStore {
    /// Open (or create) the database at `path`; `":memory:"` gives a private in-memory DB.
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory().context("opening in-memory sqlite")?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            Connection::open(path).with_context(|| format!("opening sqlite at {path}"))?
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema().context("initializing postings schema")?;
        info!(target: "store", path, "posting store ready");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                normalized_location TEXT NOT NULL,
                category TEXT NOT NULL,
                eligibility TEXT NOT NULL,
                description TEXT NOT NULL,
                apply_url TEXT NOT NULL,
                resolution_method TEXT NOT NULL,
                source_name TEXT NOT NULL,
                source_listing_url TEXT NOT NULL,
                status TEXT NOT NULL,
                job_type TEXT NOT NULL,
                salary_text TEXT NOT NULL,
                logo_url TEXT NOT NULL,
                published_at TEXT,
                first_seen_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_postings_key
                ON postings(source_name, external_id);
            CREATE INDEX IF NOT EXISTS idx_postings_status ON postings(status);",
        )?;
        Ok(())
    }
}

fn corrupt(id: i64, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        id,
        reason: reason.to_string(),
    }
}

fn parse_ts(id: i64, s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| corrupt(id, e))
}

/// Raw text columns, decoded into typed fields afterwards so enum/timestamp
/// failures surface as `StoreError::Corrupt` rather than a rusqlite error.
struct RawRow {
    id: i64,
    cols: [String; 15],
    published_at: Option<String>,
    first_seen_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        cols: [
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
            row.get(11)?,
            row.get(12)?,
            row.get(13)?,
            row.get(14)?,
            row.get(15)?,
        ],
        published_at: row.get(16)?,
        first_seen_at: row.get(17)?,
    })
}

impl RawRow {
    fn decode(self) -> Result<Posting, StoreError> {
        let id = self.id;
        let [external_id, title, company, normalized_location, category, eligibility, description, apply_url, resolution_method, source_name, source_listing_url, status, job_type, salary_text, logo_url] =
            self.cols;
        Ok(Posting {
            id,
            external_id,
            title,
            company,
            normalized_location,
            category: category.parse().map_err(|e| corrupt(id, e))?,
            eligibility: eligibility.parse().map_err(|e| corrupt(id, e))?,
            description,
            apply_url,
            resolution_method: resolution_method.parse().map_err(|e| corrupt(id, e))?,
            source_name,
            source_listing_url,
            status: status.parse().map_err(|e| corrupt(id, e))?,
            job_type,
            salary_text,
            logo_url,
            published_at: self
                .published_at
                .as_deref()
                .map(|s| parse_ts(id, s))
                .transpose()?,
            first_seen_at: parse_ts(id, &self.first_seen_at)?,
        })
    }
}

impl SqliteStore {
    fn select_by_key(
        conn: &Connection,
        source_name: &str,
        external_id: &str,
    ) -> Result<Option<Posting>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM postings WHERE source_name = ?1 AND external_id = ?2"
        );
        let raw = conn
            .query_row(&sql, params![source_name, external_id], read_row)
            .optional()?;
        raw.map(RawRow::decode).transpose()
    }
}

impl SqliteStore {
    /// Run `f` against the connection on Tokio's blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await
        .unwrap_or_else(|e| Err(StoreError::Task(e.to_string())))
    }
}

#[async_trait]
impl PostingStore for SqliteStore {
    async fn upsert(&self, p: NewPosting) -> Result<Posting, StoreError> {
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO postings (
                    external_id, title, company, normalized_location, category, eligibility,
                    description, apply_url, resolution_method, source_name, source_listing_url,
                    status, job_type, salary_text, logo_url, published_at, first_seen_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                ON CONFLICT(source_name, external_id) DO NOTHING",
                params![
                    p.external_id,
                    p.title,
                    p.company,
                    p.normalized_location,
                    p.category.as_str(),
                    p.eligibility.as_str(),
                    p.description,
                    p.apply_url,
                    p.resolution_method.as_str(),
                    p.source_name,
                    p.source_listing_url,
                    p.status.as_str(),
                    p.job_type,
                    p.salary_text,
                    p.logo_url,
                    p.published_at.map(|d| d.to_rfc3339()),
                    p.first_seen_at.to_rfc3339(),
                ],
            )?;
            Self::select_by_key(conn, &p.source_name, &p.external_id)?
                .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })
        .await
    }

    async fn exists_by_key(
        &self,
        source_name: &str,
        external_id: &str,
    ) -> Result<bool, StoreError> {
        let (source_name, external_id) = (source_name.to_string(), external_id.to_string());
        self.blocking(move |conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM postings WHERE source_name = ?1 AND external_id = ?2",
                    params![source_name, external_id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Posting>, StoreError> {
        self.blocking(move |conn| {
            let sql = format!("SELECT {COLUMNS} FROM postings WHERE id = ?1");
            let raw = conn.query_row(&sql, params![id], read_row).optional()?;
            raw.map(RawRow::decode).transpose()
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Posting>, StoreError> {
        self.blocking(|conn| {
            let sql = format!("SELECT {COLUMNS} FROM postings ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], read_row)?;
            let mut out = Vec::new();
            for raw in rows {
                out.push(raw?.decode()?);
            }
            Ok(out)
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM postings", [], |r| r.get(0))?;
            Ok(n.max(0) as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Category, Eligibility, PostingStatus, ResolutionMethod};

    fn posting(source: &str, id: &str) -> NewPosting {
        NewPosting {
            external_id: id.into(),
            title: "Rust Engineer".into(),
            company: "Acme".into(),
            normalized_location: "Worldwide".into(),
            category: Category::Development,
            eligibility: Eligibility::Eligible,
            description: "No description".into(),
            apply_url: "https://boards.greenhouse.io/acme/jobs/1".into(),
            resolution_method: ResolutionMethod::KnownAtsDomain,
            source_name: source.into(),
            source_listing_url: "https://board.example/jobs/1".into(),
            status: PostingStatus::Pending,
            job_type: "Full-Time".into(),
            salary_text: "Not Listed".into(),
            logo_url: "https://logos.hunter.io/acme.com".into(),
            published_at: None,
            first_seen_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_is_insert_only_per_key() {
        let s = SqliteStore::open(IN_MEMORY).unwrap();
        let a = s.upsert(posting("Board", "42")).await.unwrap();
        let mut again = posting("Board", "42");
        again.title = "Changed".into();
        let b = s.upsert(again).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.title, "Rust Engineer");
        assert_eq!(s.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_id_under_two_sources_is_two_rows() {
        let s = SqliteStore::open(IN_MEMORY).unwrap();
        s.upsert(posting("A", "42")).await.unwrap();
        s.upsert(posting("B", "42")).await.unwrap();
        assert_eq!(s.count().await.unwrap(), 2);
        assert!(s.exists_by_key("A", "42").await.unwrap());
        assert!(!s.exists_by_key("C", "42").await.unwrap());
    }

    #[tokio::test]
    async fn round_trips_through_get_by_id() {
        let s = SqliteStore::open(IN_MEMORY).unwrap();
        let stored = s.upsert(posting("Board", "7")).await.unwrap();
        let got = s.get_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(got.category, Category::Development);
        assert_eq!(got.resolution_method, ResolutionMethod::KnownAtsDomain);
        assert!(s.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_writers_share_one_connection() {
        let s = Arc::new(SqliteStore::open(IN_MEMORY).unwrap());
        let mut tasks = Vec::new();
        for i in 0..8 {
            let s = s.clone();
            tasks.push(tokio::spawn(async move {
                s.upsert(posting("Board", &i.to_string())).await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(s.count().await.unwrap(), 8);
        assert_eq!(s.list_all().await.unwrap().len(), 8);
    }
}
