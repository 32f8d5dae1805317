// src/ingest/extract/feed.rs
use crate::error::ExtractError;
use crate::ingest::text::{location_hint, resolve_company, strip_markup};
use crate::ingest::types::{FeedEntry, PostingDraft};

/// Feed entry → draft.
///
/// The external id is the entry id when present, else the link. An entry with
/// neither a title nor a usable link is malformed.
pub fn extract_entry(source_name: &str, e: &FeedEntry) -> Result<PostingDraft, ExtractError> {
    let title = e
        .title
        .as_deref()
        .map(strip_markup)
        .filter(|t| !t.is_empty())
        .ok_or(ExtractError::MissingField("title"))?;

    // Some feeds only carry a permalink guid.
    let listing_url = e
        .link
        .clone()
        .or_else(|| e.id.clone().filter(|id| is_http_url(id)))
        .ok_or(ExtractError::MissingField("link"))?;

    let external_id = e.id.clone().unwrap_or_else(|| listing_url.clone());

    Ok(PostingDraft {
        external_id,
        company: Some(resolve_company(e.author.as_deref(), &title)),
        raw_location_text: location_hint(&title),
        raw_description: e.summary.clone().unwrap_or_default(),
        title,
        listing_url,
        has_own_page: true,
        source_name: source_name.to_string(),
        published_at: e.published_at,
    })
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::text::UNKNOWN_COMPANY;

    fn entry() -> FeedEntry {
        FeedEntry {
            title: Some("Acme: Senior Rust Engineer (Europe only)".into()),
            link: Some("https://board.example/jobs/1".into()),
            id: None,
            author: None,
            summary: Some("<p>Hi</p>".into()),
            published_at: None,
        }
    }

    #[test]
    fn id_falls_back_to_link() {
        let d = extract_entry("Board", &entry()).unwrap();
        assert_eq!(d.external_id, "https://board.example/jobs/1");
        assert_eq!(d.company.as_deref(), Some("Acme"));
        assert_eq!(d.raw_location_text.as_deref(), Some("Europe only"));
        assert_eq!(d.source_name, "Board");
    }

    #[test]
    fn explicit_id_is_kept() {
        let mut e = entry();
        e.id = Some("42".into());
        e.author = Some("Globex".into());
        let d = extract_entry("Board", &e).unwrap();
        assert_eq!(d.external_id, "42");
        assert_eq!(d.company.as_deref(), Some("Globex"));
    }

    #[test]
    fn permalink_guid_stands_in_for_link() {
        let mut e = entry();
        e.link = None;
        e.id = Some("https://board.example/jobs/9".into());
        let d = extract_entry("Board", &e).unwrap();
        assert_eq!(d.listing_url, "https://board.example/jobs/9");
    }

    #[test]
    fn missing_title_or_link_is_malformed() {
        let mut e = entry();
        e.title = Some("   ".into());
        assert_eq!(
            extract_entry("Board", &e).unwrap_err(),
            ExtractError::MissingField("title")
        );

        let mut e = entry();
        e.link = None;
        e.id = Some("opaque-7".into());
        assert_eq!(
            extract_entry("Board", &e).unwrap_err(),
            ExtractError::MissingField("link")
        );
    }

    #[test]
    fn no_company_anywhere_uses_sentinel() {
        let mut e = entry();
        e.title = Some("Tester".into());
        let d = extract_entry("Board", &e).unwrap();
        assert_eq!(d.company.as_deref(), Some(UNKNOWN_COMPANY));
    }
}
