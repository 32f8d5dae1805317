// src/ingest/extract/mod.rs
//! Per-source field extraction.
//!
//! A `FieldExtractor` is picked once per source from its kind and name. Feed
//! sources share one variant; HTML boards carry a `CardSelectors` profile,
//! either built in for known boards or supplied in config.

pub mod feed;
pub mod listing;

use crate::error::ExtractError;
use crate::ingest::types::{PostingDraft, RawContent, RawEntry, SourceConfig, SourceKind};
use listing::CardSelectors;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldExtractor {
    Feed,
    Listing(CardSelectors),
}

impl FieldExtractor {
    pub fn for_source(source: &SourceConfig) -> Self {
        match source.kind {
            SourceKind::Feed => FieldExtractor::Feed,
            SourceKind::HtmlListing => FieldExtractor::Listing(
                source
                    .selectors
                    .clone()
                    .or_else(|| CardSelectors::builtin(&source.name))
                    .unwrap_or_else(CardSelectors::generic),
            ),
        }
    }

    /// Split fetched content into individual raw entries.
    pub fn entries(
        &self,
        source: &SourceConfig,
        content: RawContent,
    ) -> Result<Vec<RawEntry>, ExtractError> {
        match (self, content) {
            (FieldExtractor::Feed, RawContent::Feed(items)) => {
                Ok(items
                    .into_iter()
                    .map(|item| match item {
                        Ok(e) => RawEntry::Feed(e),
                        Err(reason) => RawEntry::Unreadable(reason),
                    })
                    .collect())
            }
            (FieldExtractor::Listing(sel), RawContent::Page(page)) => Ok(sel
                .cards(&page)?
                .into_iter()
                .map(RawEntry::Card)
                .collect()),
            (_, RawContent::Feed(_)) => Err(ExtractError::ContentMismatch {
                source_name: source.name.clone(),
                found: "feed",
            }),
            (_, RawContent::Page(_)) => Err(ExtractError::ContentMismatch {
                source_name: source.name.clone(),
                found: "html",
            }),
        }
    }

    /// Turn one raw entry into a draft. Malformed entries are an error, never a panic.
    pub fn extract(
        &self,
        source: &SourceConfig,
        entry: &RawEntry,
    ) -> Result<PostingDraft, ExtractError> {
        match entry {
            RawEntry::Feed(e) => feed::extract_entry(&source.name, e),
            RawEntry::Card(c) => listing::extract_card(&source.name, c),
            RawEntry::Unreadable(reason) => Err(ExtractError::Malformed(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FetchedPage;

    fn src(name: &str, kind: SourceKind) -> SourceConfig {
        SourceConfig {
            name: name.into(),
            fetch_url: "https://x.example/".into(),
            kind,
            site_domain: "x.example".into(),
            enabled: true,
            selectors: None,
        }
    }

    #[test]
    fn picks_builtin_profile_by_name() {
        let ex = FieldExtractor::for_source(&src("RemoteOK", SourceKind::HtmlListing));
        assert_eq!(
            ex,
            FieldExtractor::Listing(CardSelectors::builtin("remoteok").unwrap())
        );
        assert_eq!(
            FieldExtractor::for_source(&src("Remotive", SourceKind::Feed)),
            FieldExtractor::Feed
        );
    }

    #[test]
    fn feed_extractor_rejects_html() {
        let s = src("Remotive", SourceKind::Feed);
        let ex = FieldExtractor::for_source(&s);
        let err = ex
            .entries(
                &s,
                RawContent::Page(FetchedPage {
                    body: "<html/>".into(),
                    final_url: "https://x.example/".into(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, ExtractError::ContentMismatch { found: "html", .. }));
    }
}
