use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use rand::RngExt;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with rate-limiting, retry and cancellation.
    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        self.polite_delay(cancel).await?;

        let mut last_err = Error::Fetch(format!("no attempts made for {}", url));

        for attempt in 1..=(self.config.max_retries + 1) {
            debug!("GET {} (attempt {})", url, attempt);

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                resp = self.inner.get(url).send() => resp,
            };

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .map_err(|e| Error::Fetch(format!("read body of {}: {}", url, e)));
                    } else if status.as_u16() == 429 || status.as_u16() == 503 {
                        // Rate limited — back off harder
                        let backoff = Duration::from_millis(
                            self.config.request_delay_ms * (2u64.pow(attempt)),
                        );
                        warn!(
                            "Rate limited ({}) on attempt {}, sleeping {:?}",
                            status, attempt, backoff
                        );
                        self.cancellable_sleep(backoff, cancel).await?;
                        last_err = Error::Fetch(format!("HTTP {} for {}", status, url));
                    } else {
                        last_err = Error::Fetch(format!("HTTP {} for {}", status, url));
                        break; // Don't retry 4xx other than 429
                    }
                }
                Err(e) => {
                    last_err = Error::Fetch(format!("request to {} failed: {}", url, e));
                    let backoff =
                        Duration::from_millis(self.config.request_delay_ms * (attempt as u64));
                    warn!("Request failed on attempt {}: {}", attempt, e);
                    self.cancellable_sleep(backoff, cancel).await?;
                }
            }
        }

        Err(last_err)
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self, cancel: &CancellationToken) -> Result<()> {
        let jitter = rand::rng().random_range(0..=self.config.jitter_ms);
        let total = Duration::from_millis(self.config.request_delay_ms + jitter);
        self.cancellable_sleep(total, cancel).await
    }

    async fn cancellable_sleep(&self, dur: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep(dur) => Ok(()),
        }
    }
}
