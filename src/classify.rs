//! # Classifier
//!
//! Pure keyword classification of postings:
//!
//! - `categorize`: first category (in table order) whose keyword set matches the title.
//! - `eligibility`: restricted terms beat accepted (worldwide) terms; no match is `Unknown`.
//! - `job_type`: Full-Time unless the text says part-time, contract or internship.
//!
//! Keywords match case-insensitively at the start of a word, so `design`
//! matches "Designer" but `ui` does not match "Build".

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::ingest::types::{Category, Eligibility};

/// One row of the category table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub name: Category,
    pub keywords: Vec<String>,
}

/// Ordered category table. Order is the tie-break: earlier rows win.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
}

impl CategoryTable {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                name: r.name,
                keywords: r
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Built-in table, used when the config does not define `[[categories]]`.
    pub fn default_seed() -> Self {
        let seed: [(Category, &[&str]); 7] = [
            (
                Category::Development,
                &[
                    "developer", "engineer", "software", "programmer", "react", "node",
                    "python", "rust", "golang", "java", "devops", "backend", "frontend",
                    "full stack", "fullstack", "sre",
                ],
            ),
            (
                Category::Design,
                &["design", "ui", "ux", "artist", "creative", "illustrator"],
            ),
            (
                Category::Marketing,
                &["marketing", "seo", "growth", "content", "copywriter", "social media"],
            ),
            (
                Category::Sales,
                &["sales", "account executive", "business development", "sdr", "account manager"],
            ),
            (
                Category::Support,
                &["support", "customer success", "customer service", "help desk", "helpdesk"],
            ),
            (
                Category::Product,
                &["product manager", "product owner", "product"],
            ),
            (
                Category::Data,
                &["data", "analyst", "analytics", "machine learning"],
            ),
        ];
        Self::new(
            seed.iter()
                .map(|(name, kws)| CategoryRule {
                    name: *name,
                    keywords: kws.iter().map(|k| k.to_string()).collect(),
                })
                .collect(),
        )
    }

    pub fn categorize(&self, title: &str) -> Category {
        let t = title.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| contains_term(&t, k)))
            .map(|r| r.name)
            .unwrap_or(Category::Other)
    }
}

/// Term lists for geographic eligibility.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EligibilityTerms {
    pub restricted: Vec<String>,
    pub accepted: Vec<String>,
}

impl EligibilityTerms {
    pub fn default_seed() -> Self {
        let restricted = [
            "us only", "usa only", "u.s. only", "us-only", "us based", "us citizens",
            "united states", "north america", "americas only", "canada", "europe only",
            "eu only", "uk only", "emea only", "apac only", "latam only",
        ];
        let accepted = [
            "worldwide", "world wide", "anywhere in the world", "anywhere", "global",
            "work from anywhere", "location independent",
        ];
        Self {
            restricted: restricted.iter().map(|s| s.to_string()).collect(),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn eligibility(&self, title: &str, location_text: &str) -> Eligibility {
        let text = format!("{title} {location_text}").to_lowercase();
        if self
            .restricted
            .iter()
            .any(|t| contains_term(&text, &t.to_lowercase()))
        {
            return Eligibility::Restricted;
        }
        if self
            .accepted
            .iter()
            .any(|t| contains_term(&text, &t.to_lowercase()))
        {
            return Eligibility::Eligible;
        }
        Eligibility::Unknown
    }
}

/// Both tables bundled for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    pub categories: CategoryTable,
    pub eligibility: EligibilityTerms,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            categories: CategoryTable::default_seed(),
            eligibility: EligibilityTerms::default_seed(),
        }
    }
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::default);

/// `categorize` against the built-in table.
pub fn categorize(title: &str) -> Category {
    DEFAULT_CLASSIFIER.categories.categorize(title)
}

/// `eligibility` against the built-in term lists.
pub fn eligibility(title: &str, location_text: &str) -> Eligibility {
    DEFAULT_CLASSIFIER
        .eligibility
        .eligibility(title, location_text)
}

pub fn job_type(title: &str, description: &str) -> &'static str {
    let text = format!("{title} {description}").to_lowercase();
    if contains_term(&text, "part-time") || contains_term(&text, "part time") {
        "Part-Time"
    } else if contains_term(&text, "contract") || contains_term(&text, "freelance") {
        "Contract"
    } else if contains_word(&text, "intern") || contains_word(&text, "internship") {
        "Internship"
    } else {
        "Full-Time"
    }
}

/// `needle` occurs in `haystack` starting at a word boundary.
/// Both sides are expected lowercased already.
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Like `contains_term`, but the match must also end at a word boundary.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(i, m)| {
        let before_ok = haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[i + m.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designer_is_design() {
        assert_eq!(categorize("Senior UX Designer"), Category::Design);
    }

    #[test]
    fn no_keyword_is_other() {
        assert_eq!(categorize("Random Task"), Category::Other);
    }

    #[test]
    fn earlier_row_wins_ties() {
        // "data" and "engineer" both match; Development comes first.
        assert_eq!(categorize("Data Engineer"), Category::Development);
        assert_eq!(categorize("Data Analyst"), Category::Data);
    }

    #[test]
    fn keywords_match_at_word_start_only() {
        assert_eq!(categorize("Build Lead"), Category::Other);
        assert_eq!(categorize("Customer Support Hero"), Category::Support);
    }

    #[test]
    fn configured_order_is_respected() {
        let t = CategoryTable::new(vec![
            CategoryRule {
                name: Category::Data,
                keywords: vec!["Data".into()],
            },
            CategoryRule {
                name: Category::Development,
                keywords: vec!["engineer".into()],
            },
        ]);
        assert_eq!(t.categorize("Data Engineer"), Category::Data);
    }

    #[test]
    fn exclusion_wins_over_worldwide() {
        assert_eq!(
            eligibility("Engineer (US Only, Worldwide)", ""),
            Eligibility::Restricted
        );
        assert_eq!(
            eligibility("Engineer", "US Only, Worldwide"),
            Eligibility::Restricted
        );
    }

    #[test]
    fn worldwide_is_eligible_and_silence_is_unknown() {
        assert_eq!(eligibility("Rust Dev (Worldwide)", ""), Eligibility::Eligible);
        assert_eq!(eligibility("Rust Dev", "Anywhere"), Eligibility::Eligible);
        assert_eq!(eligibility("Rust Dev", ""), Eligibility::Unknown);
    }

    #[test]
    fn restricted_terms_need_word_start() {
        // "bonus only" must not read as "us only"
        assert_eq!(eligibility("Sales rep, bonus only", "Global"), Eligibility::Eligible);
    }

    #[test]
    fn job_type_detection() {
        assert_eq!(job_type("Part-time Editor", ""), "Part-Time");
        assert_eq!(job_type("Rust Dev", "6 month contract"), "Contract");
        assert_eq!(job_type("Marketing Intern", ""), "Internship");
        assert_eq!(job_type("Internal Tools Engineer", ""), "Full-Time");
        assert_eq!(job_type("Rust Dev", "permanent"), "Full-Time");
    }
}
