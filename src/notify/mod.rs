// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;

/// Delivery seam for formatted summaries. Implementations do not retry;
/// failure isolation belongs to the poll loop.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

pub use telegram::TelegramNotifier;
