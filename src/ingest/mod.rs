// src/ingest/mod.rs
pub mod dedup;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod resolve;
pub mod text;
pub mod types;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classify::{job_type, Classifier};
use crate::config::{EligibilityFilter, PipelineSettings};
use crate::ingest::dedup::Deduplicator;
use crate::ingest::extract::FieldExtractor;
use crate::ingest::fetch::{PageClient, SourceFetcher};
use crate::ingest::resolve::LinkResolver;
use crate::ingest::text::{
    clean_description, logo_url, normalize_location, salary_text, strip_markup,
    DESCRIPTION_MAX_CHARS, UNKNOWN_COMPANY,
};
use crate::ingest::types::{
    Eligibility, NewPosting, PostingDraft, RawEntry, ResolvedLink, SourceConfig,
};
use crate::store::PostingStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Raw entries seen across all sources.");
        describe_counter!("ingest_added_total", "New postings persisted.");
        describe_counter!(
            "ingest_duplicates_total",
            "Entries skipped because their key was already stored."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Entries dropped by the eligibility or description-length filter."
        );
        describe_counter!(
            "ingest_entry_errors_total",
            "Entries that failed extraction or persistence."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources skipped because fetching failed."
        );
        describe_counter!(
            "ingest_resolve_total",
            "Apply-link resolutions by method."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

/// Run-level counters. Always produced, however many entries or sources failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources_total: usize,
    pub sources_failed: usize,
    /// Raw entries seen.
    pub seen: usize,
    pub added: usize,
    pub duplicates: usize,
    /// Dropped by classification filters.
    pub filtered: usize,
    /// `extract_errors + store_errors`.
    pub errored: usize,
    pub extract_errors: usize,
    pub store_errors: usize,
}

/// Drives one pass over all configured sources.
///
/// Sources and entries are handled strictly one at a time so the politeness
/// delay in front of each link resolution actually throttles outbound traffic.
pub struct Pipeline {
    settings: PipelineSettings,
    client: Arc<dyn PageClient>,
    store: Arc<dyn PostingStore>,
    classifier: Classifier,
}

/// What happened to one entry.
enum Outcome {
    Added,
    Duplicate,
    Filtered,
    ExtractFailed,
    StoreFailed,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        client: Arc<dyn PageClient>,
        store: Arc<dyn PostingStore>,
        classifier: Classifier,
    ) -> Self {
        Self {
            settings,
            client,
            store,
            classifier,
        }
    }

    pub async fn run_once(&self, sources: &[SourceConfig]) -> RunSummary {
        ensure_metrics_described();

        let fetcher = SourceFetcher::new(self.client.clone());
        let resolver = LinkResolver::new(self.client.clone(), sources);
        let mut dedup = Deduplicator::new(self.store.clone());
        let mut summary = RunSummary {
            sources_total: sources.len(),
            ..Default::default()
        };
        let mut resolved_any = false;

        for source in sources {
            // 1) Fetch; a failing source is skipped for this run
            let content = match fetcher.fetch(source).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(target: "ingest", source = %source.name, error = %e, "source fetch failed; skipping");
                    counter!("ingest_source_errors_total").increment(1);
                    summary.sources_failed += 1;
                    continue;
                }
            };

            // 2) Split into entries with this source's extractor
            let extractor = FieldExtractor::for_source(source);
            let entries = match extractor.entries(source, content) {
                Ok(v) => v,
                Err(e) => {
                    warn!(target: "ingest", source = %source.name, error = %e, "source content unreadable; skipping");
                    counter!("ingest_source_errors_total").increment(1);
                    summary.sources_failed += 1;
                    continue;
                }
            };
            info!(target: "ingest", source = %source.name, entries = entries.len(), "source fetched");

            // 3) Entries, one by one
            for entry in &entries {
                summary.seen += 1;
                counter!("ingest_entries_total").increment(1);
                let outcome = self
                    .process_entry(
                        source,
                        &extractor,
                        entry,
                        &resolver,
                        &mut dedup,
                        &mut resolved_any,
                    )
                    .await;
                match outcome {
                    Outcome::Added => summary.added += 1,
                    Outcome::Duplicate => summary.duplicates += 1,
                    Outcome::Filtered => summary.filtered += 1,
                    Outcome::ExtractFailed => {
                        summary.extract_errors += 1;
                        summary.errored += 1;
                    }
                    Outcome::StoreFailed => {
                        summary.store_errors += 1;
                        summary.errored += 1;
                    }
                }
            }
        }

        counter!("ingest_added_total").increment(summary.added as u64);
        counter!("ingest_duplicates_total").increment(summary.duplicates as u64);
        counter!("ingest_filtered_total").increment(summary.filtered as u64);
        counter!("ingest_entry_errors_total").increment(summary.errored as u64);
        gauge!("ingest_pipeline_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        info!(
            target: "ingest",
            sources = summary.sources_total,
            sources_failed = summary.sources_failed,
            seen = summary.seen,
            added = summary.added,
            duplicates = summary.duplicates,
            filtered = summary.filtered,
            errored = summary.errored,
            "ingest run finished"
        );
        summary
    }

    async fn process_entry(
        &self,
        source: &SourceConfig,
        extractor: &FieldExtractor,
        entry: &RawEntry,
        resolver: &LinkResolver,
        dedup: &mut Deduplicator,
        resolved_any: &mut bool,
    ) -> Outcome {
        // a) Extract
        let draft = match extractor.extract(source, entry) {
            Ok(d) => d,
            Err(e) => {
                warn!(target: "ingest", source = %source.name, error = %e, "malformed entry skipped");
                return Outcome::ExtractFailed;
            }
        };

        // b) Classify + filter
        let description = clean_description(&draft.raw_description, DESCRIPTION_MAX_CHARS);
        let eligibility = self.classifier.eligibility.eligibility(
            &draft.title,
            draft.raw_location_text.as_deref().unwrap_or_default(),
        );
        if !self.passes_filters(eligibility, &description) {
            debug!(target: "ingest", source = %source.name, external_id = %draft.external_id, eligibility = eligibility.as_str(), "entry filtered");
            return Outcome::Filtered;
        }

        // c) Cheap existence check before any resolution traffic
        match dedup.exists(&draft.external_id, &source.name).await {
            Ok(true) => return Outcome::Duplicate,
            Ok(false) => {}
            Err(e) => {
                warn!(target: "ingest", source = %source.name, external_id = %draft.external_id, error = %e, "existence check failed");
                return Outcome::StoreFailed;
            }
        }
        dedup.mark(&draft.external_id, &source.name);

        // d) Resolve, politely; board-page entries cost no request
        let link = if draft.has_own_page {
            if *resolved_any {
                self.politeness_pause().await;
            }
            *resolved_any = true;
            resolver.resolve(&draft.listing_url, &source.name).await
        } else {
            resolver.board_page_only(&draft.listing_url, &source.name)
        };

        // e) Assemble + persist
        let posting = self.assemble(source, draft, eligibility, description, link);
        let external_id = posting.external_id.clone();
        match self.store.upsert(posting).await {
            Ok(stored) => {
                debug!(target: "ingest", source = %source.name, external_id = %external_id, id = stored.id, "posting stored");
                Outcome::Added
            }
            Err(e) => {
                warn!(target: "ingest", source = %source.name, external_id = %external_id, error = %e, "store write failed");
                Outcome::StoreFailed
            }
        }
    }

    fn passes_filters(&self, eligibility: Eligibility, description: &str) -> bool {
        let eligible = match self.settings.eligibility_filter {
            EligibilityFilter::EligibleOnly => eligibility == Eligibility::Eligible,
            EligibilityFilter::ExcludeRestricted => eligibility != Eligibility::Restricted,
            EligibilityFilter::Off => true,
        };
        if !eligible {
            return false;
        }
        let min = self.settings.min_description_len;
        min == 0 || description.chars().count() >= min
    }

    async fn politeness_pause(&self) {
        let (lo, hi) = (
            self.settings.politeness_min_ms,
            self.settings.politeness_max_ms.max(self.settings.politeness_min_ms),
        );
        if hi == 0 {
            return;
        }
        let ms = rand::rng().random_range(lo..=hi);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn assemble(
        &self,
        source: &SourceConfig,
        draft: PostingDraft,
        eligibility: Eligibility,
        description: String,
        link: ResolvedLink,
    ) -> NewPosting {
        let company = draft
            .company
            .clone()
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
        // Salary and job-type hints may sit past the stored description cut
        let raw_text = strip_markup(&draft.raw_description);
        NewPosting {
            category: self.classifier.categories.categorize(&draft.title),
            job_type: job_type(&draft.title, &raw_text).to_string(),
            salary_text: salary_text(&raw_text),
            logo_url: logo_url(&company, &source.site_domain),
            normalized_location: normalize_location(draft.raw_location_text.as_deref()),
            eligibility,
            description,
            apply_url: link.final_url,
            resolution_method: link.method,
            source_listing_url: draft.listing_url,
            status: self.settings.default_status,
            published_at: draft.published_at,
            first_seen_at: Utc::now(),
            external_id: draft.external_id,
            title: draft.title,
            company,
            source_name: draft.source_name,
        }
    }
}
