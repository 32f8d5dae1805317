// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, ApiState};
pub use crate::config::AppConfig;
pub use crate::ingest::{Pipeline, RunSummary};
pub use crate::store::{MemoryStore, PostingStore, SqliteStore};
