//! EEW Alert Relay — Binary Entrypoint
//! Wires configuration, transports, and the poll loop; runs continuously or
//! as a single externally-scheduled pass.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eew_relay::seen::GitMirror;
use eew_relay::{AppConfig, HttpTransport, MirrorSink, Pipeline, SeenStore, TelegramNotifier};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Configuration errors are the only thing allowed to exit non-zero.
    let cfg = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(
        feeds = cfg.feed_urls.len(),
        interval_secs = cfg.poll_interval.as_secs(),
        run_once = cfg.run_once,
        state = %cfg.state_path.display(),
        "starting eew relay"
    );

    let transport = HttpTransport::new();
    let notifier = TelegramNotifier::new(&cfg.telegram_token, cfg.telegram_chat_id.clone());
    let store = SeenStore::new(cfg.state_path.clone());
    let git_mirror = cfg.git_mirror.then(GitMirror::new);
    let mirror = git_mirror.as_ref().map(|m| m as &dyn MirrorSink);

    let mut pipeline = Pipeline::new(&cfg, &transport, &notifier, store, mirror);

    if cfg.run_once {
        // Single-shot: the external scheduler owns the cadence. Operational
        // failures are logged, not turned into a non-zero exit.
        match pipeline.run_cycle().await {
            Ok(stats) => tracing::info!(
                fetched = stats.fetched,
                delivered = stats.delivered,
                skipped = stats.skipped,
                errors = stats.errors,
                "single pass done"
            ),
            Err(e) => tracing::warn!(error = ?e, "single pass failed"),
        }
    } else {
        pipeline.run().await;
    }

    Ok(())
}
