use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub catalog: CatalogConfig,
    pub nlu: NluConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Ceiling for client-side rendering: the listing page fills its product
    /// grid from script, so the DOM is read only after this budget elapses.
    #[serde(default = "default_render_budget_ms")]
    pub render_budget_ms: u64,

    #[serde(default = "default_chrome_bin")]
    pub chrome_bin: String,
}

/// Catalog cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

/// Conversational language service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NluConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub project_name: String,

    #[serde(default)]
    pub deployment_name: String,

    #[serde(default = "default_language")]
    pub language: String,
}

impl NluConfig {
    /// All connection fields must be present before a recognizer is usable.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
            && !self.api_key.is_empty()
            && !self.project_name.is_empty()
            && !self.deployment_name.is_empty()
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_listing_url() -> String {
    "https://heat-mvmnt.de/releases".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "release-radar/0.1 (sneaker release tracker)".to_string()
}
fn default_render_budget_ms() -> u64 {
    5000
}
fn default_chrome_bin() -> String {
    std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string())
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/shoes.csv")
}
fn default_refresh_interval_secs() -> u64 {
    3600
}
fn default_language() -> String {
    "it".to_string()
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("RADAR").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                listing_url: default_listing_url(),
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                max_retries: default_max_retries(),
                user_agent: default_user_agent(),
                render_budget_ms: default_render_budget_ms(),
                chrome_bin: default_chrome_bin(),
            },
            catalog: CatalogConfig {
                snapshot_path: default_snapshot_path(),
                refresh_interval_secs: default_refresh_interval_secs(),
            },
            nlu: NluConfig {
                endpoint: String::new(),
                api_key: String::new(),
                project_name: String::new(),
                deployment_name: String::new(),
                language: default_language(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nlu_config_gate_requires_all_connection_fields() {
        let mut cfg = NluConfig {
            endpoint: "https://example.cognitiveservices.azure.com".into(),
            api_key: "key".into(),
            project_name: "shoes".into(),
            deployment_name: "production".into(),
            language: "it".into(),
        };
        assert!(cfg.is_configured());

        cfg.api_key.clear();
        assert!(!cfg.is_configured());
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.catalog.refresh_interval_secs, 3600);
        assert!(cfg.scraper.listing_url.starts_with("https://"));
        assert!(!cfg.nlu.is_configured());
    }
}
