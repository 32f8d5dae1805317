//! remote-job-bay binary entrypoint.
//!
//! `remote-job-bay [run]` performs one ingestion pass and prints the run summary.
//! `remote-job-bay serve` exposes the read API over the same store.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use remote_job_bay::config::AppConfig;
use remote_job_bay::ingest::fetch::HttpClient;
use remote_job_bay::ingest::Pipeline;
use remote_job_bay::metrics::Metrics;
use remote_job_bay::store::{PostingStore, SqliteStore};
use remote_job_bay::{api, ApiState};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("remote_job_bay=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    let store: Arc<dyn PostingStore> =
        Arc::new(SqliteStore::open(&cfg.store.path).context("opening posting store")?);

    let cmd = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    match cmd.as_str() {
        "run" => run(&cfg, store).await,
        "serve" => serve(&cfg, store).await,
        other => bail!("unknown command '{other}' (expected 'run' or 'serve')"),
    }
}

async fn run(cfg: &AppConfig, store: Arc<dyn PostingStore>) -> Result<()> {
    let client = HttpClient::new(&cfg.pipeline.user_agent, cfg.pipeline.http_timeout())
        .context("building http client")?;
    let pipeline = Pipeline::new(
        cfg.pipeline.clone(),
        Arc::new(client),
        store,
        cfg.classifier(),
    );

    let sources = cfg.enabled_sources();
    info!(target: "ingest", sources = sources.len(), "starting ingest run");
    let summary = pipeline.run_once(&sources).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn serve(cfg: &AppConfig, store: Arc<dyn PostingStore>) -> Result<()> {
    let metrics = Metrics::install()?;
    let app = api::router(ApiState::new(store).with_metrics(metrics.handle));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(target: "api", addr, "read API listening");
    axum::serve(listener, app).await.context("serving read API")?;
    Ok(())
}
