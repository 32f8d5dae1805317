// tests/classify.rs
//
// Deterministic classification: category table order and eligibility tie-break.

use remote_job_bay::classify::{
    categorize, eligibility, job_type, CategoryRule, CategoryTable, EligibilityTerms,
};
use remote_job_bay::ingest::types::{Category, Eligibility};

#[test]
fn handpicked_categories() {
    let cases = [
        ("Senior UX Designer", Category::Design),
        ("Random Task", Category::Other),
        ("Backend Developer (Rust)", Category::Development),
        ("Growth Marketing Lead", Category::Marketing),
        ("Account Executive, EMEA", Category::Sales),
        ("Customer Success Manager", Category::Support),
        ("Product Manager", Category::Product),
        ("Analytics Specialist", Category::Data),
    ];
    for (title, want) in cases {
        assert_eq!(categorize(title), want, "title: {title}");
    }
}

#[test]
fn earlier_table_row_wins_on_overlap() {
    // "Data Engineer" hits Development ("engineer") before Data ("data").
    assert_eq!(categorize("Data Engineer"), Category::Development);

    let flipped = CategoryTable::new(vec![
        CategoryRule {
            name: Category::Data,
            keywords: vec!["data".into()],
        },
        CategoryRule {
            name: Category::Development,
            keywords: vec!["engineer".into()],
        },
    ]);
    assert_eq!(flipped.categorize("Data Engineer"), Category::Data);
    assert_eq!(flipped.categorize("Gardener"), Category::Other);
}

#[test]
fn categorize_is_case_insensitive_and_repeatable() {
    for _ in 0..3 {
        assert_eq!(categorize("SENIOR ux DESIGNER"), Category::Design);
    }
}

#[test]
fn restricted_wins_over_worldwide() {
    assert_eq!(
        eligibility("Engineer (US Only, Worldwide)", ""),
        Eligibility::Restricted
    );
    assert_eq!(eligibility("Engineer", "Worldwide"), Eligibility::Eligible);
    assert_eq!(eligibility("Engineer", "Berlin"), Eligibility::Unknown);
}

#[test]
fn custom_terms_replace_the_seed() {
    let terms = EligibilityTerms {
        restricted: vec!["germany only".into()],
        accepted: vec!["remote-first".into()],
    };
    assert_eq!(terms.eligibility("Dev", "Germany only"), Eligibility::Restricted);
    assert_eq!(terms.eligibility("Dev", "remote-first"), Eligibility::Eligible);
    assert_eq!(terms.eligibility("Dev", "Worldwide"), Eligibility::Unknown);
}

#[test]
fn job_types() {
    assert_eq!(job_type("Part-time Designer", ""), "Part-Time");
    assert_eq!(job_type("Writer", "Freelance contract, 3 months"), "Contract");
    assert_eq!(job_type("Marketing Intern", ""), "Internship");
    assert_eq!(job_type("Engineer", "Great team"), "Full-Time");
}
