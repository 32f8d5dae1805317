// src/api.rs
//! Read-only HTTP surface over the posting store.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::ingest::types::PostingStatus;
use crate::store::PostingStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn PostingStore>,
    pub metrics: Option<PrometheusHandle>,
}

impl ApiState {
    pub fn new(store: Arc<dyn PostingStore>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: ApiState) -> Router {
    let mut r = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job));
    if state.metrics.is_some() {
        r = r.route("/metrics", get(render_metrics));
    }
    r.layer(CorsLayer::very_permissive()).with_state(state)
}

fn store_failure(e: impl std::fmt::Display) -> Response {
    tracing::warn!(target: "api", error = %e, "store read failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Store unavailable" })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Job not found" })),
    )
        .into_response()
}

/// Published postings only, newest first.
async fn list_jobs(State(state): State<ApiState>) -> Response {
    match state.store.list_all().await {
        Ok(all) => {
            let mut out: Vec<_> = all
                .into_iter()
                .filter(|p| p.status == PostingStatus::Published)
                .collect();
            out.sort_by(|a, b| b.id.cmp(&a.id));
            Json(out).into_response()
        }
        Err(e) => store_failure(e),
    }
}

async fn get_job(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return not_found();
    };
    match state.store.get_by_id(id).await {
        Ok(Some(p)) => Json(p).into_response(),
        Ok(None) => not_found(),
        Err(e) => store_failure(e),
    }
}

async fn render_metrics(State(state): State<ApiState>) -> Response {
    match state.metrics {
        Some(h) => h.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::{self, Body};
    use axum::http::Request;
    use tower::ServiceExt as _;

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let app = router(ApiState::new(Arc::new(MemoryStore::new())));
        let req = Request::builder()
            .uri("/jobs/abc")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let bytes = body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], "Job not found");
    }
}
