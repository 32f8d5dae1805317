// src/ingest/extract/listing.rs
//! HTML job-board listing pages.
//!
//! Cards are lifted out of the page while the DOM is alive (the parsed
//! document is not `Send`), then validated into drafts one by one.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ExtractError;
use crate::ingest::text::{location_hint, resolve_company, strip_markup};
use crate::ingest::types::{FetchedPage, ListingCard, PostingDraft};

/// CSS selectors describing one board's job cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSelectors {
    /// Matches each job card.
    pub card: String,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    /// Anchor inside the card; its `href` is the listing link. Defaults to `a[href]`.
    #[serde(default)]
    pub link: Option<String>,
    /// Attribute on the card element itself holding the link (e.g. `data-href`).
    #[serde(default)]
    pub card_link_attr: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Element with a `datetime` attribute or ISO date text.
    #[serde(default)]
    pub date: Option<String>,
}

fn s(v: &str) -> Option<String> {
    Some(v.to_string())
}

impl CardSelectors {
    /// Profiles for boards we know, keyed by source name (case and punctuation ignored).
    pub fn builtin(source_name: &str) -> Option<Self> {
        let key: String = source_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "weworkremotely" => Some(Self {
                card: "section.jobs li:not(.view-all)".into(),
                title: "span.title".into(),
                company: s("span.company"),
                link: s("a[href]"),
                card_link_attr: None,
                location: s("span.region"),
                description: None,
                date: s("time"),
            }),
            "remoteok" => Some(Self {
                card: "tr.job".into(),
                title: "h2[itemprop=title]".into(),
                company: s("h3[itemprop=name]"),
                link: None,
                card_link_attr: s("data-href"),
                location: s(".location"),
                description: s(".description"),
                date: s("time[datetime]"),
            }),
            "inclusivelyremote" => Some(Self {
                card: ".job-listings .job-block".into(),
                title: "h3 a".into(),
                company: s(".company-name, .company"),
                link: s("h3 a"),
                card_link_attr: None,
                location: s(".job-location, .location"),
                description: None,
                date: s("time[datetime]"),
            }),
            _ => None,
        }
    }

    /// Best-effort profile for boards without one.
    pub fn generic() -> Self {
        Self {
            card: "article, li.job, .job".into(),
            title: "h2, h3, .title".into(),
            company: s(".company"),
            link: s("a[href]"),
            card_link_attr: None,
            location: s(".location"),
            description: None,
            date: s("time"),
        }
    }

    pub fn cards(&self, page: &FetchedPage) -> Result<Vec<ListingCard>, ExtractError> {
        let card_sel = parse_selector(&self.card)?;
        let title_sel = parse_selector(&self.title)?;
        let company_sel = parse_opt(self.company.as_deref())?;
        let link_sel = parse_selector(self.link.as_deref().unwrap_or("a[href]"))?;
        let location_sel = parse_opt(self.location.as_deref())?;
        let description_sel = parse_opt(self.description.as_deref())?;
        let date_sel = parse_opt(self.date.as_deref())?;

        let doc = Html::parse_document(&page.body);
        let mut out = Vec::new();
        for card in doc.select(&card_sel) {
            let href = match self.card_link_attr.as_deref() {
                Some(attr) => card.value().attr(attr).map(str::to_string),
                None => card
                    .select(&link_sel)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string),
            };
            out.push(ListingCard {
                title: text_of(card, Some(&title_sel)),
                company: text_of(card, company_sel.as_ref()),
                href: href.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()),
                location: text_of(card, location_sel.as_ref()),
                description: html_of(card, description_sel.as_ref()),
                published_at: date_sel
                    .as_ref()
                    .and_then(|sel| card.select(sel).next())
                    .and_then(date_of),
                base_url: page.final_url.clone(),
            });
        }
        Ok(out)
    }
}

fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

fn parse_opt(css: Option<&str>) -> Result<Option<Selector>, ExtractError> {
    css.map(parse_selector).transpose()
}

fn text_of(card: ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    let el = card.select(sel?).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn html_of(card: ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    card.select(sel?).next().map(|el| el.inner_html())
}

fn date_of(el: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let raw = el
        .value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| el.text().collect::<String>());
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Card → draft. The title is required; the link is made absolute against the
/// page URL. Cards without a link get an id hashed from title and company and
/// point at the board page itself.
pub fn extract_card(source_name: &str, card: &ListingCard) -> Result<PostingDraft, ExtractError> {
    let title = card
        .title
        .as_deref()
        .map(strip_markup)
        .filter(|t| !t.is_empty())
        .ok_or(ExtractError::MissingField("title"))?;
    let company = resolve_company(card.company.as_deref(), &title);

    let (external_id, listing_url, has_own_page) = match card.href.as_deref() {
        Some(href) => {
            let abs = Url::parse(&card.base_url)
                .and_then(|base| base.join(href))
                .map_err(|_| ExtractError::MissingField("link"))?
                .to_string();
            (abs.clone(), abs, true)
        }
        None => (
            synthetic_id(&title, &company),
            card.base_url.clone(),
            false,
        ),
    };

    Ok(PostingDraft {
        external_id,
        raw_location_text: card.location.clone().or_else(|| location_hint(&title)),
        raw_description: card.description.clone().unwrap_or_default(),
        title,
        company: Some(company),
        listing_url,
        has_own_page,
        source_name: source_name.to_string(),
        published_at: card.published_at,
    })
}

fn synthetic_id(title: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(company.to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::from("card-");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTEOK: &str = r#"<html><body><table id="jobsboard">
      <tr class="job" data-href="/remote-jobs/101-rust-engineer">
        <td class="company"><h2 itemprop="title">Rust Engineer</h2><h3 itemprop="name">Acme</h3>
          <div class="location">Worldwide</div></td>
        <td class="time"><time datetime="2025-10-01T08:00:00+00:00"></time></td>
      </tr>
      <tr class="job" data-href="/remote-jobs/102">
        <td class="company"><h3 itemprop="name">NoTitle Inc</h3></td>
      </tr>
    </table></body></html>"#;

    fn page(body: &str, url: &str) -> FetchedPage {
        FetchedPage {
            body: body.to_string(),
            final_url: url.to_string(),
        }
    }

    #[test]
    fn remoteok_cards_read_data_href() {
        let sel = CardSelectors::builtin("RemoteOK").unwrap();
        let cards = sel
            .cards(&page(REMOTEOK, "https://remoteok.com/remote-dev-jobs"))
            .unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].href.as_deref(), Some("/remote-jobs/101-rust-engineer"));
        assert_eq!(cards[0].location.as_deref(), Some("Worldwide"));
        assert!(cards[0].published_at.is_some());

        let d = extract_card("RemoteOK", &cards[0]).unwrap();
        assert_eq!(d.listing_url, "https://remoteok.com/remote-jobs/101-rust-engineer");
        assert_eq!(d.external_id, d.listing_url);
        assert!(d.has_own_page);
        assert_eq!(d.company.as_deref(), Some("Acme"));

        assert_eq!(
            extract_card("RemoteOK", &cards[1]).unwrap_err(),
            ExtractError::MissingField("title")
        );
    }

    #[test]
    fn linkless_card_gets_stable_synthetic_id() {
        let card = ListingCard {
            title: Some("Support Lead".into()),
            company: Some("Initech".into()),
            base_url: "https://board.example/jobs".into(),
            ..Default::default()
        };
        let a = extract_card("Board", &card).unwrap();
        let b = extract_card("Board", &card).unwrap();
        assert_eq!(a.external_id, b.external_id);
        assert!(a.external_id.starts_with("card-"));
        assert_eq!(a.listing_url, "https://board.example/jobs");
        assert!(!a.has_own_page);
    }

    #[test]
    fn bad_selector_is_reported() {
        let mut sel = CardSelectors::generic();
        sel.card = "li[".into();
        let err = sel.cards(&page("<html></html>", "https://x.example/")).unwrap_err();
        assert!(matches!(err, ExtractError::Selector { .. }));
    }
}
