//! Page fetching.
//!
//! Scrapers do not talk to `reqwest` directly; they go through the [`FetchPage`]
//! trait so extraction can run against canned HTML in tests.
//!
//! - [`FetchPage`]: core trait, "give me the body of this URL"
//! - [`HttpFetcher`]: the real implementation, one shared `reqwest::Client` with the
//!   configured User-Agent and timeout
//!
//! There is no retry: a timeout or a non-success status is returned as an error and
//! the caller decides whether that skips a source or just one field.

use reqwest::Client;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Trait for fetching the text body of a page.
pub trait FetchPage {
    /// Fetch `url` and return its decoded body.
    async fn fetch_page(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// HTTP implementation of [`FetchPage`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher sending `user_agent` on every request and giving up after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            let body = response.text().await?;
            Ok::<_, Box<dyn Error>>(body)
        }
        .await;
        let dt = t0.elapsed();

        match &res {
            Ok(body) => debug!(elapsed_ms = dt.as_millis() as u64, bytes = body.len(), "Fetched page"),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "Fetch failed"),
        }
        res
    }
}
