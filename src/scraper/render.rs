//! Headless-rendered page acquisition.
//!
//! The listing page builds its product grid from script, so a plain GET sees
//! an empty shell. Each call spawns a short-lived headless Chromium with
//! `--dump-dom` and a virtual-time budget: rendering runs at most that long,
//! then whatever DOM is present is accepted as final. The process is reaped
//! on every exit path — `kill_on_drop` covers timeout and cancellation.

use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use rand::RngExt;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Base backoff between render attempts.
const RETRY_BASE: Duration = Duration::from_secs(2);

pub struct RenderClient {
    chrome_bin: String,
    render_budget_ms: u64,
    timeout_secs: u64,
    max_retries: u32,
}

impl RenderClient {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            chrome_bin: config.chrome_bin.clone(),
            render_budget_ms: config.render_budget_ms,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }

    /// Render `url` and return the settled DOM as HTML text.
    pub async fn render_dom(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| Error::Fetch(format!("invalid URL {}: {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Fetch(format!(
                "only http/https URLs allowed, got: {}",
                parsed.scheme()
            )));
        }

        for attempt in 1..=(self.max_retries + 1) {
            debug!("Rendering {} (attempt {})", url, attempt);

            match self.run_chrome(url, cancel).await {
                Ok(html) if !html.trim().is_empty() => return Ok(html),
                Ok(_) => {
                    warn!("Empty DOM for {} on attempt {}", url, attempt);
                    if attempt > self.max_retries {
                        return Err(Error::Fetch(format!("empty DOM for {}", url)));
                    }
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!("Render of {} failed on attempt {}: {}", url, attempt, e);
                    if attempt > self.max_retries {
                        return Err(e);
                    }
                }
            }

            let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
            let backoff = RETRY_BASE * attempt + jitter;
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep(backoff) => {}
            }
        }

        Err(Error::Fetch(format!("render attempts exhausted for {}", url)))
    }

    async fn run_chrome(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let output_fut = tokio::process::Command::new(&self.chrome_bin)
            .args([
                "--headless",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                &format!("--virtual-time-budget={}", self.render_budget_ms),
                "--dump-dom",
                url,
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = tokio::time::timeout(Duration::from_secs(self.timeout_secs), output_fut) => {
                match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        return Err(Error::Fetch(format!(
                            "failed to launch {} for {}: {}",
                            self.chrome_bin, url, e
                        )))
                    }
                    Err(_) => {
                        return Err(Error::Fetch(format!(
                            "render timed out after {}s for {}",
                            self.timeout_secs, url
                        )))
                    }
                }
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.chars().take(200).collect();
            return Err(Error::Fetch(format!(
                "renderer exited with {} for {}: {}",
                output.status, url, snippet
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
