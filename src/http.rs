// src/http.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Transport seam for everything the relay fetches as text (feed listings
/// and report documents). Tests inject an in-memory implementation.
#[async_trait]
pub trait TextTransport: Send + Sync {
    /// GET `url` and return the body. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextTransport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("non-2xx from {url}"))?;

        resp.text()
            .await
            .with_context(|| format!("reading body from {url}"))
    }
}
