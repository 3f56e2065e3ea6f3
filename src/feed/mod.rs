// src/feed/mod.rs
pub mod atom;
pub mod types;

use std::collections::HashSet;

use anyhow::Result;
use metrics::counter;

use crate::feed::types::FeedEntry;
use crate::http::TextTransport;

/// Fetch and parse every configured feed URL, concatenating entries in
/// configured-URL order. A failing URL is logged and skipped so one dead
/// feed cannot starve the others; the caller sees whatever was fetched.
pub async fn fetch_entries(
    transport: &dyn TextTransport,
    feed_urls: &[String],
) -> Result<Vec<FeedEntry>> {
    let mut out = Vec::new();
    for url in feed_urls {
        let body = match transport.get_text(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = ?e, %url, "feed fetch error");
                counter!("feed_fetch_errors_total").increment(1);
                continue;
            }
        };
        match atom::parse_entries(&body) {
            Ok(mut entries) => out.append(&mut entries),
            Err(e) => {
                tracing::warn!(error = ?e, %url, "feed parse error");
                counter!("feed_fetch_errors_total").increment(1);
            }
        }
    }
    Ok(out)
}

/// Case-sensitive substring containment against the configured keyword set.
pub fn is_relevant(title: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| title.contains(k.as_str()))
}

/// A non-empty id that has not been delivered yet.
pub fn is_new(id: &str, seen: &HashSet<String>) -> bool {
    !id.is_empty() && !seen.contains(id)
}

/// An entry without an id or a detail link can never be delivered nor
/// recorded as seen.
pub fn is_usable(entry: &FeedEntry) -> bool {
    !entry.id.is_empty() && !entry.link.is_empty()
}

pub fn is_eligible(entry: &FeedEntry, keywords: &[String], seen: &HashSet<String>) -> bool {
    is_usable(entry) && is_relevant(&entry.title, keywords) && is_new(&entry.id, seen)
}
