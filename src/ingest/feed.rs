// src/ingest/feed.rs
//! RSS 2.0 and Atom parsing into `FeedEntry` values.
//!
//! The document is walked with a pull reader and every `<item>`/`<entry>` is
//! deserialized on its own, so one broken item never fails the whole feed.
//! Every item field is optional here; deciding whether an entry is usable is
//! the extractor's job.

use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::{de::from_str, events::Event, Reader};
use serde::Deserialize;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime,
};

use crate::ingest::types::FeedEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rss,
    Atom,
}

impl Dialect {
    fn item_tag(self) -> &'static [u8] {
        match self {
            Dialect::Rss => b"item",
            Dialect::Atom => b"entry",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Text>,
    author: Option<String>,
    #[serde(rename = "dc:creator", alias = "creator")]
    creator: Option<String>,
    description: Option<String>,
    #[serde(rename = "content:encoded", alias = "encoded")]
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Element whose attributes we ignore and whose text we keep.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    id: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    author: Option<AtomAuthor>,
    summary: Option<Text>,
    content: Option<Text>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a syndication document item by item.
///
/// Input that is not XML, or whose root is not `rss`, `RDF` or `feed`, fails
/// as a whole. An item that does not deserialize takes an `Err` slot and the
/// items after it are still read.
pub fn parse_feed(xml: &str) -> Result<Vec<Result<FeedEntry, String>>, String> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);

    // 1) Root element decides the dialect.
    let dialect = loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                break match e.local_name().as_ref() {
                    b"rss" | b"RDF" => Dialect::Rss,
                    b"feed" => Dialect::Atom,
                    other => {
                        return Err(format!(
                            "not an rss or atom document: root <{}>",
                            String::from_utf8_lossy(other)
                        ))
                    }
                };
            }
            Ok(Event::Eof) => return Err("not an rss or atom document: no root element".into()),
            Ok(_) => {}
            Err(e) => return Err(format!("not xml: {e}")),
        }
    };

    // 2) Each item on its own.
    let tag = dialect.item_tag();
    let mut out = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag => {
                match reader.read_text(e.name()) {
                    Ok(inner) => out.push(parse_item(dialect, &inner)),
                    Err(err) => {
                        // Unbalanced markup inside an item; nothing after it can be trusted.
                        out.push(Err(format!("unterminated item: {err}")));
                        break;
                    }
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == tag => {
                out.push(parse_item(dialect, ""));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("broken feed markup: {e}")),
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

fn parse_item(dialect: Dialect, inner: &str) -> Result<FeedEntry, String> {
    match dialect {
        Dialect::Rss => from_str::<Item>(&format!("<item>{inner}</item>"))
            .map(rss_entry)
            .map_err(|e| format!("bad rss item: {e}")),
        Dialect::Atom => from_str::<AtomEntry>(&format!("<entry>{inner}</entry>"))
            .map(atom_entry)
            .map_err(|e| format!("bad atom entry: {e}")),
    }
}

fn rss_entry(it: Item) -> FeedEntry {
    FeedEntry {
        title: non_empty(it.title),
        link: non_empty(it.link),
        id: non_empty(it.guid.map(|g| g.value)),
        author: non_empty(it.creator).or_else(|| non_empty(it.author)),
        summary: non_empty(it.description).or_else(|| non_empty(it.content)),
        published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
    }
}

fn atom_entry(e: AtomEntry) -> FeedEntry {
    // Prefer rel="alternate" (or no rel) over self/edit links.
    let link = e
        .link
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| e.link.first())
        .and_then(|l| l.href.clone());

    FeedEntry {
        title: non_empty(e.title.map(|t| t.value)),
        link: non_empty(link),
        id: non_empty(e.id),
        author: non_empty(e.author.and_then(|a| a.name)),
        summary: non_empty(e.summary.map(|t| t.value))
            .or_else(|| non_empty(e.content.map(|t| t.value))),
        published_at: e
            .published
            .as_deref()
            .or(e.updated.as_deref())
            .and_then(parse_rfc3339),
    }
}

/// Job boards put HTML entities in RSS outside CDATA; XML only knows five.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Board</title>
    <item>
      <title>Acme: Rust Engineer (Worldwide)</title>
      <link>https://board.example/jobs/1</link>
      <guid isPermaLink="false">board-1</guid>
      <dc:creator>Acme</dc:creator>
      <description><![CDATA[<p>Build things&nbsp;fast</p>]]></description>
      <pubDate>Mon, 06 Oct 2025 10:00:00 +0000</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Board</title>
  <entry>
    <title type="html">Designer at Globex</title>
    <id>tag:atom.example,2025:7</id>
    <link rel="self" href="https://atom.example/api/7"/>
    <link rel="alternate" href="https://atom.example/jobs/7"/>
    <author><name>Globex</name></author>
    <summary type="html">Make it pretty</summary>
    <updated>2025-10-06T10:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn rss_items_keep_optional_fields() {
        let v: Vec<FeedEntry> = parse_feed(RSS).unwrap().into_iter().flatten().collect();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].id.as_deref(), Some("board-1"));
        assert_eq!(v[0].author.as_deref(), Some("Acme"));
        assert!(v[0].summary.as_deref().unwrap().contains("Build things"));
        assert!(v[0].published_at.is_some());
        assert_eq!(v[1].link, None);
    }

    #[test]
    fn atom_prefers_alternate_link() {
        let v: Vec<FeedEntry> = parse_feed(ATOM).unwrap().into_iter().flatten().collect();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].link.as_deref(), Some("https://atom.example/jobs/7"));
        assert_eq!(v[0].title.as_deref(), Some("Designer at Globex"));
        assert_eq!(v[0].author.as_deref(), Some("Globex"));
        assert!(v[0].published_at.is_some());
    }

    #[test]
    fn html_page_is_rejected() {
        assert!(parse_feed("<html><body><p>nope</body></html>").is_err());
        assert!(parse_feed("not xml at all").is_err());
    }

    #[test]
    fn bad_item_keeps_its_neighbours() {
        let xml = r#"<rss version="2.0"><channel>
<item><title>One</title><link>https://board.example/jobs/1</link></item>
<item><title>A</title><title>B</title><link>https://board.example/jobs/2</link></item>
<item><title>Dev <b>bold</b></title><link>https://board.example/jobs/3</link></item>
<item><title>Four</title><link>https://board.example/jobs/4</link></item>
</channel></rss>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].as_ref().unwrap().title.as_deref(), Some("One"));
        assert!(v[1].is_err());
        assert!(v[2].is_err());
        assert_eq!(v[3].as_ref().unwrap().title.as_deref(), Some("Four"));
    }

    #[test]
    fn empty_channel_is_an_empty_feed() {
        let v = parse_feed(r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#).unwrap();
        assert!(v.is_empty());
    }
}
