// src/store/memory.rs
use async_trait::async_trait;
use std::sync::Mutex;

use super::PostingStore;
use crate::error::StoreError;
use crate::ingest::types::{NewPosting, Posting};

/// Process-local store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Vec<Posting>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn upsert(&self, posting: NewPosting) -> Result<Posting, StoreError> {
        let mut v = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(existing) = v
            .iter()
            .find(|p| p.source_name == posting.source_name && p.external_id == posting.external_id)
        {
            return Ok(existing.clone());
        }
        let id = v.len() as i64 + 1;
        let stored = posting.with_id(id);
        v.push(stored.clone());
        Ok(stored)
    }

    async fn exists_by_key(
        &self,
        source_name: &str,
        external_id: &str,
    ) -> Result<bool, StoreError> {
        let v = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(v
            .iter()
            .any(|p| p.source_name == source_name && p.external_id == external_id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Posting>, StoreError> {
        let v = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(v.iter().find(|p| p.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Posting>, StoreError> {
        let v = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(v.clone())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let v = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(v.len())
    }
}
