// src/ingest/text.rs
//! Plain-text helpers shared by the extractors: markup stripping, description
//! truncation, company and location inference, salary and logo hints.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Upper bound on stored description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 1500;
pub const NO_DESCRIPTION: &str = "No description";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const DEFAULT_LOCATION: &str = "Remote";
pub const SALARY_NOT_LISTED: &str = "Not Listed";

/// Strip tags, decode entities, normalize typographic quotes, collapse whitespace.
pub fn strip_markup(s: &str) -> String {
    // 1) Drop script/style bodies entirely, then the remaining tags
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS
        .get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
    let out = re_blocks.replace_all(s, " ");

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let out = re_tags.replace_all(&out, " ");

    // 2) HTML entity decode (after tag removal so `&lt;b&gt;` stays text)
    let mut out = html_escape::decode_html_entities(&out).to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (including decoded &nbsp;)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Plain-text description capped at `max_chars`; empty input becomes the
/// "No description" sentinel.
pub fn clean_description(raw: &str, max_chars: usize) -> String {
    let text = strip_markup(raw);
    if text.is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    if text.chars().count() > max_chars {
        return text.chars().take(max_chars).collect::<String>().trim_end().to_string();
    }
    text
}

/// Guess the company from a posting title.
///
/// `"Backend Engineer at Acme (EU only)"` gives `Acme`; `"Acme: Backend Engineer"`
/// gives `Acme`. The `" at "` form wins when both are present.
pub fn infer_company(title: &str) -> Option<String> {
    if let Some(idx) = title.rfind(" at ") {
        let tail = &title[idx + 4..];
        let tail = match tail.find('(') {
            Some(p) => &tail[..p],
            None => tail,
        };
        let tail = tail.trim();
        if !tail.is_empty() {
            return Some(tail.to_string());
        }
    }
    if let Some((head, _)) = title.split_once(':') {
        let head = head.trim();
        if !head.is_empty() {
            return Some(head.to_string());
        }
    }
    None
}

/// Explicit company field when usable, else inferred from the title, else the
/// "Unknown Company" sentinel.
pub fn resolve_company(explicit: Option<&str>, title: &str) -> String {
    if let Some(c) = explicit.map(str::trim) {
        if !c.is_empty() && !c.eq_ignore_ascii_case("unknown") {
            return c.to_string();
        }
    }
    infer_company(title).unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// Parenthesized suffix of a title, e.g. `"EU only"` from `"Designer (EU only)"`.
/// Only a group that closes the title counts.
pub fn location_hint(title: &str) -> Option<String> {
    let inner = title.trim_end().strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let hint = inner[open + 1..].trim();
    if hint.is_empty() {
        None
    } else {
        Some(hint.to_string())
    }
}

pub fn normalize_location(hint: Option<&str>) -> String {
    match hint.map(strip_markup) {
        Some(h) if !h.is_empty() => h,
        _ => DEFAULT_LOCATION.to_string(),
    }
}

/// First salary-looking figure in the text (`$80,000`, `$80k`, `80k-120k`,
/// `90,000 USD`), verbatim, else "Not Listed".
pub fn salary_text(description: &str) -> String {
    static RE_SALARY: OnceCell<Regex> = OnceCell::new();
    let re = RE_SALARY.get_or_init(|| {
        Regex::new(
            r"(?i)(\$\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?k?(?:\s*-\s*\$?\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?k?)?|\b\d{2,3}k\s*-\s*\d{2,3}k\b|\b\d{1,3}(?:,\d{3})+\s*(?:usd|eur|gbp)\b)",
        )
        .unwrap()
    });
    re.find(description)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| SALARY_NOT_LISTED.to_string())
}

/// Logo guess from the company name; falls back to the board's own logo.
pub fn logo_url(company: &str, site_domain: &str) -> String {
    if !company.eq_ignore_ascii_case(UNKNOWN_COMPANY) && !company.eq_ignore_ascii_case("unknown") {
        let clean: String = company
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if !clean.is_empty() {
            return format!("https://logos.hunter.io/{clean}.com");
        }
    }
    format!("https://logos.hunter.io/{site_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_collapses_ws_and_entities() {
        let s = "  <p>Hello,&nbsp;&nbsp;<b>world</b></p>\n<ul><li>&ldquo;ok&rdquo;</li></ul> ";
        assert_eq!(strip_markup(s), r#"Hello, world "ok""#);
    }

    #[test]
    fn strip_markup_drops_scripts() {
        let s = "<div>Job<script>var x = '<b>';</script> post</div>";
        assert_eq!(strip_markup(s), "Job post");
    }

    #[test]
    fn long_description_is_capped() {
        let raw = "a".repeat(5000);
        let out = clean_description(&raw, DESCRIPTION_MAX_CHARS);
        assert_eq!(out.chars().count(), DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn empty_description_gets_sentinel() {
        assert_eq!(clean_description("", DESCRIPTION_MAX_CHARS), NO_DESCRIPTION);
        assert_eq!(clean_description("<p> </p>", DESCRIPTION_MAX_CHARS), NO_DESCRIPTION);
    }

    #[test]
    fn company_after_at_trims_parenthesis() {
        assert_eq!(
            infer_company("Backend Engineer at Acme Corp (EU only)").as_deref(),
            Some("Acme Corp")
        );
    }

    #[test]
    fn company_before_colon() {
        assert_eq!(
            infer_company("Globex: Senior Rust Developer").as_deref(),
            Some("Globex")
        );
        assert_eq!(infer_company("Senior Rust Developer"), None);
    }

    #[test]
    fn explicit_unknown_company_is_replaced() {
        assert_eq!(resolve_company(Some("unknown"), "Initech: QA"), "Initech");
        assert_eq!(resolve_company(Some("  Hooli "), "Initech: QA"), "Hooli");
        assert_eq!(resolve_company(None, "Tester"), UNKNOWN_COMPANY);
    }

    #[test]
    fn location_hint_reads_parenthesized_suffix() {
        assert_eq!(location_hint("Designer (EU only)").as_deref(), Some("EU only"));
        assert_eq!(location_hint("Designer"), None);
        assert_eq!(location_hint("Designer ()"), None);
        assert_eq!(location_hint("Designer (EU only)  ").as_deref(), Some("EU only"));
        assert_eq!(location_hint("Engineer (Rust) - Senior"), None);
        assert_eq!(location_hint("Engineer (Rust), Remote (LATAM)").as_deref(), Some("LATAM"));
        assert_eq!(normalize_location(None), "Remote");
    }

    #[test]
    fn salary_patterns() {
        assert_eq!(salary_text("Pay: $80,000 - $120,000 per year"), "$80,000 - $120,000");
        assert_eq!(salary_text("We pay 90k-120k plus equity"), "90k-120k");
        assert_eq!(salary_text("Competitive"), SALARY_NOT_LISTED);
    }

    #[test]
    fn logo_falls_back_to_board() {
        assert_eq!(logo_url("Acme, Inc.", "remoteok.com"), "https://logos.hunter.io/acmeinc.com");
        assert_eq!(
            logo_url(UNKNOWN_COMPANY, "remoteok.com"),
            "https://logos.hunter.io/remoteok.com"
        );
    }
}
