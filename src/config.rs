// src/config.rs
//! Process configuration: pipeline knobs, store location, job sources and
//! optional classifier tables. Loaded once at start from TOML (or JSON).
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{CategoryRule, CategoryTable, Classifier, EligibilityTerms};
use crate::ingest::fetch::DEFAULT_USER_AGENT;
use crate::ingest::types::{PostingStatus, SourceConfig};

pub const ENV_CONFIG_PATH: &str = "JOBBAY_CONFIG_PATH";
pub const ENV_DB_PATH: &str = "JOBBAY_DB_PATH";
pub const ENV_BIND_ADDR: &str = "JOBBAY_BIND_ADDR";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "JOBBAY_HTTP_TIMEOUT_SECS";

pub const DEFAULT_CONFIG_PATH: &str = "config/sources.toml";
pub const DEFAULT_DB_PATH: &str = "data/postings.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Which postings survive classification.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityFilter {
    /// Keep explicit worldwide matches only; `unknown` is dropped.
    #[default]
    EligibleOnly,
    /// Drop `restricted`, keep `eligible` and `unknown`.
    ExcludeRestricted,
    Off,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub politeness_min_ms: u64,
    pub politeness_max_ms: u64,
    pub eligibility_filter: EligibilityFilter,
    /// Cleaned descriptions shorter than this are filtered; 0 disables.
    pub min_description_len: usize,
    pub default_status: PostingStatus,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            politeness_min_ms: 1000,
            politeness_max_ms: 4000,
            eligibility_filter: EligibilityFilter::EligibleOnly,
            min_description_len: 0,
            default_status: PostingStatus::Pending,
        }
    }
}

impl PipelineSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite file, or ":memory:".
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Ordered; replaces the built-in category table when present.
    #[serde(default)]
    pub categories: Option<Vec<CategoryRule>>,
    #[serde(default)]
    pub eligibility: Option<EligibilityTerms>,
    /// Not read from the file; `JOBBAY_BIND_ADDR` or the default.
    #[serde(skip)]
    pub bind_addr: Option<String>,
}

impl AppConfig {
    /// Load from an explicit path. `.json` is parsed as JSON, anything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $JOBBAY_CONFIG_PATH
    /// 2) config/sources.toml
    /// 3) built-in defaults with no sources
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        tracing::warn!(target: "config", "no config file found; running with no sources");
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(p) = std::env::var(ENV_DB_PATH) {
            if !p.trim().is_empty() {
                self.store.path = p.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_HTTP_TIMEOUT_SECS) {
            self.pipeline.http_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_HTTP_TIMEOUT_SECS} must be whole seconds"))?;
        }
        if let Ok(a) = std::env::var(ENV_BIND_ADDR) {
            if !a.trim().is_empty() {
                self.bind_addr = Some(a.trim().to_string());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if p.politeness_min_ms > p.politeness_max_ms {
            bail!(
                "politeness_min_ms ({}) exceeds politeness_max_ms ({})",
                p.politeness_min_ms,
                p.politeness_max_ms
            );
        }
        let mut names = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                bail!("source with empty name");
            }
            if s.fetch_url.trim().is_empty() {
                bail!("source {} has an empty fetch_url", s.name);
            }
            if !names.insert(s.name.as_str()) {
                bail!("duplicate source name {}", s.name);
            }
        }
        Ok(())
    }

    pub fn enabled_sources(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }

    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Classifier built from the config tables, falling back to the built-in seeds.
    pub fn classifier(&self) -> Classifier {
        let mut c = Classifier::default();
        if let Some(rules) = &self.categories {
            c.categories = CategoryTable::new(rules.clone());
        }
        if let Some(terms) = &self.eligibility {
            c.eligibility = terms.clone();
        }
        c
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    Ok(toml::from_str(s)?)
}
