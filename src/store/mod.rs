// src/store/mod.rs
//! Persistence boundary for postings.
//!
//! Identity is the `(source_name, external_id)` pair. `upsert` is insert-only:
//! a second write for a known key returns the stored row untouched.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::ingest::types::{NewPosting, Posting};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Insert `posting` unless its key exists; return the stored row either way.
    async fn upsert(&self, posting: NewPosting) -> Result<Posting, StoreError>;

    async fn exists_by_key(&self, source_name: &str, external_id: &str)
        -> Result<bool, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Posting>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Posting>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
