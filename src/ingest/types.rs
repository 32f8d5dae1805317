// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ingest::extract::listing::CardSelectors;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    HtmlListing,
}

/// One configured job source. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub fetch_url: String,
    pub kind: SourceKind,
    /// The board's own domain (e.g. "weworkremotely.com"); links back to it
    /// are never treated as external apply links.
    pub site_domain: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Card selectors for `html_listing` sources without a built-in profile.
    #[serde(default)]
    pub selectors: Option<CardSelectors>,
}

fn default_enabled() -> bool {
    true
}

/// One entry of an RSS or Atom feed, fields as found in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// An HTML page after the redirect chain was followed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub body: String,
    pub final_url: String,
}

/// Fetched source content. A feed item that could not be read keeps its slot
/// as `Err(reason)`.
#[derive(Debug, Clone)]
pub enum RawContent {
    Feed(Vec<Result<FeedEntry, String>>),
    Page(FetchedPage),
}

/// One job card lifted out of a listing page by a site profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingCard {
    pub title: Option<String>,
    pub company: Option<String>,
    pub href: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Final URL of the listing page, used to absolutize `href`.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub enum RawEntry {
    Feed(FeedEntry),
    Card(ListingCard),
    Unreadable(String),
}

/// Intermediate record built by the extractor for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingDraft {
    pub external_id: String,
    pub title: String,
    pub company: Option<String>,
    pub raw_location_text: Option<String>,
    pub raw_description: String,
    pub listing_url: String,
    /// False when `listing_url` is the board page the entry was found on
    /// rather than a page for this posting alone.
    pub has_own_page: bool,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Development,
    Design,
    Marketing,
    Sales,
    Support,
    Product,
    Data,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    Restricted,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    #[default]
    Pending,
    Published,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    KnownAtsDomain,
    ApplyButtonMatch,
    UnresolvedFallback,
}

/// Outcome of apply-link resolution. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub final_url: String,
    pub method: ResolutionMethod,
    /// Set when the extra redirect hop for an apply button failed and the
    /// un-followed href was kept.
    pub degraded: bool,
}

/// A completed posting, not yet assigned a store id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPosting {
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub normalized_location: String,
    pub category: Category,
    pub eligibility: Eligibility,
    pub description: String,
    pub apply_url: String,
    pub resolution_method: ResolutionMethod,
    pub source_name: String,
    pub source_listing_url: String,
    pub status: PostingStatus,
    pub job_type: String,
    pub salary_text: String,
    pub logo_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
}

/// A persisted, deduplicated posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Posting {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub normalized_location: String,
    pub category: Category,
    pub eligibility: Eligibility,
    pub description: String,
    pub apply_url: String,
    pub resolution_method: ResolutionMethod,
    pub source_name: String,
    pub source_listing_url: String,
    pub status: PostingStatus,
    pub job_type: String,
    pub salary_text: String,
    pub logo_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
}

impl NewPosting {
    pub fn with_id(self, id: i64) -> Posting {
        Posting {
            id,
            external_id: self.external_id,
            title: self.title,
            company: self.company,
            normalized_location: self.normalized_location,
            category: self.category,
            eligibility: self.eligibility,
            description: self.description,
            apply_url: self.apply_url,
            resolution_method: self.resolution_method,
            source_name: self.source_name,
            source_listing_url: self.source_listing_url,
            status: self.status,
            job_type: self.job_type,
            salary_text: self.salary_text,
            logo_url: self.logo_url,
            published_at: self.published_at,
            first_seen_at: self.first_seen_at,
        }
    }
}

// --- string forms used by the SQLite store ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Development => "Development",
            Category::Design => "Design",
            Category::Marketing => "Marketing",
            Category::Sales => "Sales",
            Category::Support => "Support",
            Category::Product => "Product",
            Category::Data => "Data",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Development" => Category::Development,
            "Design" => Category::Design,
            "Marketing" => Category::Marketing,
            "Sales" => Category::Sales,
            "Support" => Category::Support,
            "Product" => Category::Product,
            "Data" => Category::Data,
            "Other" => Category::Other,
            other => return Err(UnknownVariant(other.to_string())),
        })
    }
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::Restricted => "restricted",
            Eligibility::Unknown => "unknown",
        }
    }
}

impl FromStr for Eligibility {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eligible" => Eligibility::Eligible,
            "restricted" => Eligibility::Restricted,
            "unknown" => Eligibility::Unknown,
            other => return Err(UnknownVariant(other.to_string())),
        })
    }
}

impl PostingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Pending => "pending",
            PostingStatus::Published => "published",
        }
    }
}

impl FromStr for PostingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => PostingStatus::Pending,
            "published" => PostingStatus::Published,
            other => return Err(UnknownVariant(other.to_string())),
        })
    }
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::KnownAtsDomain => "known_ats_domain",
            ResolutionMethod::ApplyButtonMatch => "apply_button_match",
            ResolutionMethod::UnresolvedFallback => "unresolved_fallback",
        }
    }
}

impl FromStr for ResolutionMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "known_ats_domain" => ResolutionMethod::KnownAtsDomain,
            "apply_button_match" => ResolutionMethod::ApplyButtonMatch,
            "unresolved_fallback" => ResolutionMethod::UnresolvedFallback,
            other => return Err(UnknownVariant(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_string_forms_parse_back() {
        for c in [Category::Design, Category::Other, Category::Data] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert_eq!(
            "apply_button_match".parse::<ResolutionMethod>().unwrap(),
            ResolutionMethod::ApplyButtonMatch
        );
        assert!("Gardening".parse::<Category>().is_err());
    }

    #[test]
    fn source_config_defaults_to_enabled() {
        let s: SourceConfig = toml::from_str(
            r#"
name = "Remotive"
fetch_url = "https://remotive.com/remote-jobs/feed"
kind = "feed"
site_domain = "remotive.com"
"#,
        )
        .unwrap();
        assert!(s.enabled);
        assert_eq!(s.kind, SourceKind::Feed);
        assert!(s.selectors.is_none());
    }
}
