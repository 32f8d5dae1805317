// src/ingest/resolve.rs
//! Apply-link resolution.
//!
//! Priority on the fetched listing page:
//! 1. an outbound link to a known applicant-tracking system,
//! 2. an "apply"-style anchor pointing off-site, followed through one HEAD redirect chain,
//! 3. the listing page's own post-redirect URL.
//!
//! Resolution never fails: transport trouble degrades to a weaker answer.

use metrics::counter;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ingest::fetch::PageClient;
use crate::ingest::types::{ResolutionMethod, ResolvedLink, SourceConfig};

/// Hosted application-intake platforms; a link to any of these (or a subdomain) wins.
pub const KNOWN_ATS_DOMAINS: &[&str] = &[
    "greenhouse.io",
    "lever.co",
    "workable.com",
    "bamboohr.com",
    "ashbyhq.com",
    "smartrecruiters.com",
    "jobvite.com",
    "recruitee.com",
    "breezy.hr",
    "teamtailor.com",
    "myworkdayjobs.com",
    "applytojob.com",
];

pub const ACTION_WORDS: &[&str] = &["apply", "go to", "external", "application"];

#[derive(Debug, Clone)]
struct Anchor {
    href: String,
    url: Option<Url>,
    text: String,
}

pub struct LinkResolver {
    client: Arc<dyn PageClient>,
    /// source name → the board's own domain
    site_domains: HashMap<String, String>,
}

impl LinkResolver {
    pub fn new(client: Arc<dyn PageClient>, sources: &[SourceConfig]) -> Self {
        let site_domains = sources
            .iter()
            .map(|s| (s.name.clone(), s.site_domain.clone()))
            .collect();
        Self {
            client,
            site_domains,
        }
    }

    pub async fn resolve(&self, listing_url: &str, source_name: &str) -> ResolvedLink {
        let resolved = self.resolve_inner(listing_url, source_name).await;
        record(listing_url, source_name, &resolved);
        resolved
    }

    /// For entries that have no listing page of their own. Nothing is fetched:
    /// the board page would only yield links that belong to other postings.
    pub fn board_page_only(&self, page_url: &str, source_name: &str) -> ResolvedLink {
        let resolved = fallback(page_url);
        record(page_url, source_name, &resolved);
        resolved
    }

    async fn resolve_inner(&self, listing_url: &str, source_name: &str) -> ResolvedLink {
        let page = match self.client.get_page(listing_url).await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "resolve", source = source_name, error = %e, "listing page unavailable");
                return fallback(listing_url);
            }
        };

        let anchors = collect_anchors(&page.body, &page.final_url);

        // 1) Known ATS domain
        if let Some(a) = anchors
            .iter()
            .find(|a| a.url.as_ref().is_some_and(is_known_ats))
        {
            return ResolvedLink {
                final_url: if is_absolute(&a.href) {
                    a.href.clone()
                } else {
                    a.url.as_ref().map(Url::to_string).unwrap_or_default()
                },
                method: ResolutionMethod::KnownAtsDomain,
                degraded: false,
            };
        }

        // 2) Apply-style anchor pointing off-site
        let page_host = Url::parse(&page.final_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        let own_domain = self
            .site_domains
            .get(source_name)
            .cloned()
            .or_else(|| page_host.clone());

        let candidate = anchors.iter().find(|a| {
            if !is_absolute(&a.href) || !has_action_word(&a.text) {
                return false;
            }
            let Some(host) = a.url.as_ref().and_then(|u| u.host_str()) else {
                return false;
            };
            let self_link = own_domain.as_deref().is_some_and(|d| same_site(host, d))
                || page_host.as_deref().is_some_and(|d| same_site(host, d));
            !self_link
        });

        if let Some(a) = candidate {
            return match self.client.follow_redirects(&a.href).await {
                Ok(final_url) if !final_url.is_empty() => ResolvedLink {
                    final_url,
                    method: ResolutionMethod::ApplyButtonMatch,
                    degraded: false,
                },
                Ok(_) => ResolvedLink {
                    final_url: a.href.clone(),
                    method: ResolutionMethod::ApplyButtonMatch,
                    degraded: true,
                },
                Err(e) => {
                    warn!(target: "resolve", source = source_name, href = %a.href, error = %e, "apply link hop failed; keeping href");
                    ResolvedLink {
                        final_url: a.href.clone(),
                        method: ResolutionMethod::ApplyButtonMatch,
                        degraded: true,
                    }
                }
            };
        }

        // 3) The page itself
        if page.final_url.is_empty() {
            return fallback(listing_url);
        }
        ResolvedLink {
            final_url: page.final_url,
            method: ResolutionMethod::UnresolvedFallback,
            degraded: true,
        }
    }
}

fn record(listing_url: &str, source_name: &str, resolved: &ResolvedLink) {
    counter!("ingest_resolve_total", "method" => resolved.method.as_str()).increment(1);
    debug!(
        target: "resolve",
        source = source_name,
        listing_url,
        final_url = %resolved.final_url,
        method = resolved.method.as_str(),
        degraded = resolved.degraded,
        "apply link resolved"
    );
}

fn fallback(listing_url: &str) -> ResolvedLink {
    ResolvedLink {
        final_url: listing_url.to_string(),
        method: ResolutionMethod::UnresolvedFallback,
        degraded: true,
    }
}

fn collect_anchors(body: &str, base: &str) -> Vec<Anchor> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = Url::parse(base).ok();
    let doc = Html::parse_document(body);
    doc.select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim().to_string();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            let url = match &base {
                Some(b) => b.join(&href).ok(),
                None => Url::parse(&href).ok(),
            };
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            Some(Anchor { href, url, text })
        })
        .collect()
}

fn is_absolute(href: &str) -> bool {
    let h = href.to_ascii_lowercase();
    h.starts_with("http://") || h.starts_with("https://")
}

fn is_known_ats(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| KNOWN_ATS_DOMAINS.iter().any(|d| same_site(host, d)))
}

fn has_action_word(text: &str) -> bool {
    ACTION_WORDS.iter().any(|w| text.contains(w))
}

/// `host` is `domain` or one of its subdomains; a leading `www.` is ignored on both.
fn same_site(host: &str, domain: &str) -> bool {
    let host = host.trim_start_matches("www.").to_ascii_lowercase();
    let domain = domain.trim_start_matches("www.").to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
