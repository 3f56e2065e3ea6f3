// src/feed/types.rs

/// One item from a feed listing. Sub-elements the feed omits parse to empty
/// strings; the eligibility checks decide what is usable.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    /// Upstream-assigned stable identifier, unique per report revision.
    /// Deduplication key for the seen set.
    pub id: String,
    pub title: String,
    /// Absolute URL of the detail report document (`<link href>`).
    pub link: String,
}
