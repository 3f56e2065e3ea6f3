// src/pipeline.rs
//! One poll cycle: fetch → filter → summarize → notify → persist → mirror,
//! plus the continuous interval loop around it.

use std::collections::HashSet;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::config::AppConfig;
use crate::feed::{self, types::FeedEntry};
use crate::http::TextTransport;
use crate::notify::Notifier;
use crate::report;
use crate::seen::{MirrorSink, SeenStore};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_entries_total", "Entries parsed from feed documents.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse errors.");
        describe_counter!("alerts_delivered_total", "Summaries delivered to the chat endpoint.");
        describe_counter!(
            "entries_skipped_total",
            "Entries skipped as unusable, irrelevant, or already seen."
        );
        describe_counter!(
            "entry_errors_total",
            "Entries whose summarize/notify step failed this cycle."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("poll_last_run_ts", "Unix ts when the poll cycle last ran.");
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Owns the seen set for the process lifetime; everything else is borrowed
/// or injected so tests can swap the transports.
pub struct Pipeline<'a> {
    cfg: &'a AppConfig,
    transport: &'a dyn TextTransport,
    notifier: &'a dyn Notifier,
    store: SeenStore,
    mirror: Option<&'a dyn MirrorSink>,
    seen: HashSet<String>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        cfg: &'a AppConfig,
        transport: &'a dyn TextTransport,
        notifier: &'a dyn Notifier,
        store: SeenStore,
        mirror: Option<&'a dyn MirrorSink>,
    ) -> Self {
        let seen = store.load();
        Self {
            cfg,
            transport,
            notifier,
            store,
            mirror,
            seen,
        }
    }

    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Run one cycle. Entries process sequentially in fetch order; each
    /// eligible entry completes summarize → notify → mark-seen → persist
    /// before the next one, so a crash loses at most the in-flight entry's
    /// seen mark (the next cycle redelivers it).
    pub async fn run_cycle(&mut self) -> Result<CycleStats> {
        ensure_metrics_described();

        let entries = feed::fetch_entries(self.transport, &self.cfg.feed_urls).await?;
        let mut stats = CycleStats {
            fetched: entries.len(),
            ..CycleStats::default()
        };

        for entry in &entries {
            if !feed::is_eligible(entry, &self.cfg.keywords, &self.seen) {
                counter!("entries_skipped_total").increment(1);
                stats.skipped += 1;
                continue;
            }
            match self.deliver(entry).await {
                Ok(()) => {
                    counter!("alerts_delivered_total").increment(1);
                    stats.delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, id = %entry.id, "entry delivery failed");
                    counter!("entry_errors_total").increment(1);
                    stats.errors += 1;
                }
            }
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        gauge!("poll_last_run_ts").set(now as f64);
        Ok(stats)
    }

    /// Summarize, send, then persist the id. A summarize/notify failure
    /// leaves the id unmarked so the next cycle retries it. A persistence
    /// failure is logged but does not undo the delivery: the in-memory set
    /// carries the id until a later save succeeds.
    async fn deliver(&mut self, entry: &FeedEntry) -> Result<()> {
        let summary = report::summarize(self.transport, &entry.link).await?;
        self.notifier.send(&summary).await?;

        self.seen.insert(entry.id.clone());
        match self.store.save(&self.seen) {
            Err(e) => {
                tracing::warn!(error = ?e, "seen-state save failed; retrying on next delivery");
            }
            Ok(()) => {
                if let Some(mirror) = self.mirror {
                    if let Err(e) = mirror.store(self.store.path()).await {
                        tracing::warn!(error = ?e, "seen-state mirror failed");
                    }
                }
            }
        }
        Ok(())
    }

    /// Continuous mode: poll forever on the configured interval. Cycle
    /// failures are logged and the loop keeps going; nothing short of
    /// process termination stops it.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.cfg.poll_interval);
        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(stats) => {
                    tracing::info!(
                        target: "poll",
                        fetched = stats.fetched,
                        delivered = stats.delivered,
                        skipped = stats.skipped,
                        errors = stats.errors,
                        "poll tick"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "poll cycle failed");
                }
            }
        }
    }
}
