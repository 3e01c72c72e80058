pub mod cleaner;
pub mod http_client;
pub mod parsers;
pub mod render;

use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::models::Shoe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::http_client::HttpClient;
use self::parsers::{parse_listing_links, parse_release_page};
use self::render::RenderClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable catalog acquisition abstraction. One implementation per site
/// layout; a markup change means a new impl, not a rewrite of callers.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self, cancel: &CancellationToken) -> Result<Vec<Shoe>>;
}

// ── heat-mvmnt scraper ────────────────────────────────────────────────────────

pub struct HeatMvmntScraper {
    render: RenderClient,
    client: HttpClient,
    listing_url: String,
}

impl HeatMvmntScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            render: RenderClient::new(config),
            client: HttpClient::new(config)?,
            listing_url: config.listing_url.trim_end_matches('/').to_string(),
        })
    }

    /// Render the listing page and collect the release detail URLs.
    pub async fn fetch_listing_links(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        info!("Rendering listing page {}", self.listing_url);
        let html = self.render.render_dom(&self.listing_url, cancel).await?;
        let links = parse_listing_links(&html, &self.listing_url);
        info!("{} release pages discovered", links.len());
        Ok(links)
    }
}

#[async_trait]
impl CatalogSource for HeatMvmntScraper {
    async fn fetch_catalog(&self, cancel: &CancellationToken) -> Result<Vec<Shoe>> {
        let links = self.fetch_listing_links(cancel).await?;

        let mut shoes = Vec::with_capacity(links.len());
        let mut skipped = 0usize;

        for url in &links {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let html = match self.client.get_text(url, cancel).await {
                Ok(html) => html,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    // one bad page never invalidates the whole refresh
                    warn!("{}: {} — skipped", url, e);
                    skipped += 1;
                    continue;
                }
            };

            match cleaner::clean_shoe(parse_release_page(&html)) {
                Ok(shoe) => {
                    debug!("{}: extracted '{}'", url, shoe.name);
                    shoes.push(shoe);
                }
                Err(e) => {
                    warn!("{}: {} — skipped", url, e);
                    skipped += 1;
                }
            }
        }

        info!("Catalog fetched: {} records, {} skipped", shoes.len(), skipped);
        Ok(shoes)
    }
}
