// src/ingest/dedup.rs
//! Existence check ahead of link resolution.
//!
//! Keys are `(source_name, external_id)`. The store is the source of truth;
//! the in-run set also catches a key repeated inside one feed whose first
//! occurrence failed to persist, so the resolver is never hit twice for it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::PostingStore;

pub struct Deduplicator {
    store: Arc<dyn PostingStore>,
    seen: HashSet<(String, String)>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn PostingStore>) -> Self {
        Self {
            store,
            seen: HashSet::new(),
        }
    }

    /// True when the key is already stored or was already handled this run.
    pub async fn exists(&self, external_id: &str, source_name: &str) -> Result<bool, StoreError> {
        if self
            .seen
            .contains(&(source_name.to_string(), external_id.to_string()))
        {
            return Ok(true);
        }
        self.store.exists_by_key(source_name, external_id).await
    }

    /// Record a key as handled for the rest of the run.
    pub fn mark(&mut self, external_id: &str, source_name: &str) {
        self.seen
            .insert((source_name.to_string(), external_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn keys_are_scoped_by_source() {
        let mut d = Deduplicator::new(Arc::new(MemoryStore::new()));
        assert!(!d.exists("42", "A").await.unwrap());
        d.mark("42", "A");
        assert!(d.exists("42", "A").await.unwrap());
        assert!(!d.exists("42", "B").await.unwrap());
    }
}
