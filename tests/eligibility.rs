// tests/eligibility.rs
use std::collections::HashSet;

use eew_relay::feed::{is_eligible, is_new, is_relevant};
use eew_relay::FeedEntry;

fn keywords() -> Vec<String> {
    vec!["緊急地震速報".to_string()]
}

fn entry(id: &str, title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        id: id.into(),
        title: title.into(),
        link: link.into(),
    }
}

#[test]
fn relevance_matches_eew_titles_only() {
    let kw = keywords();
    assert!(is_relevant("緊急地震速報（警報）第3報", &kw));
    assert!(!is_relevant("その他のお知らせ", &kw));
}

#[test]
fn filtering_is_idempotent() {
    let kw = keywords();
    let mut seen = HashSet::new();
    seen.insert("A2".to_string());

    let entries = vec![
        entry("A1", "緊急地震速報（警報）", "https://x/d1"),
        entry("A2", "緊急地震速報（警報）", "https://x/d2"),
        entry("A3", "その他のお知らせ", "https://x/d3"),
        entry("", "緊急地震速報（警報）", "https://x/d4"),
    ];

    let pick = |entries: &[FeedEntry]| -> Vec<String> {
        entries
            .iter()
            .filter(|e| is_eligible(e, &kw, &seen))
            .map(|e| e.id.clone())
            .collect()
    };

    let first = pick(&entries);
    let second = pick(&entries);
    assert_eq!(first, vec!["A1".to_string()]);
    assert_eq!(first, second);
}

#[test]
fn seen_ids_are_filtered_out() {
    let mut seen = HashSet::new();
    assert!(is_new("A1", &seen));
    seen.insert("A1".to_string());
    assert!(!is_new("A1", &seen));
}

#[test]
fn missing_id_or_link_is_rejected_regardless_of_title() {
    let kw = keywords();
    let seen = HashSet::new();
    assert!(!is_eligible(
        &entry("", "緊急地震速報（警報）", "https://x/d1"),
        &kw,
        &seen
    ));
    assert!(!is_eligible(
        &entry("A1", "緊急地震速報（警報）", ""),
        &kw,
        &seen
    ));
}
