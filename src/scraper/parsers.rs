//! Structural extraction from the release site's markup.
//!
//! The site exposes no stable ids or data attributes, so fields are located
//! by position in the document tree. These paths are coupled to one concrete
//! layout; when the site changes, this module (not its callers) is what gets
//! a new version.

use crate::models::RawShoePage;
use scraper::{Html, Selector};
use tracing::warn;

// Listing grid: one card per release, each wrapping an anchor to the
// release's detail page.
const CARD_SELECTOR: &str = r#"div.mb-5.sm\:mb-2"#;
const CARD_LINK_SELECTOR: &str = "a.rte-ignore.group.block";

// Detail page field positions.
const NAME_SELECTOR: &str = "body > div:nth-of-type(1) > main > div:nth-of-type(3) > h1";
const IMAGE_SELECTOR: &str =
    "body > div:nth-of-type(1) > main > div:nth-of-type(3) > div:nth-of-type(1) picture > source:nth-of-type(1)";
const RELEASE_SELECTOR: &str = "body > div:nth-of-type(1) > main > div:nth-of-type(3) \
     > div:nth-of-type(3) > div:nth-of-type(1) > div:nth-of-type(2)";
const PRICE_SELECTOR: &str = "body > div:nth-of-type(1) > main > div:nth-of-type(3) \
     > div:nth-of-type(3) > div:nth-of-type(2) > div > div:nth-of-type(1) > div:nth-of-type(2) > div";

// ── Listing page ──────────────────────────────────────────────────────────────

/// Extract detail-page URLs from the rendered listing page, in page order,
/// resolved against `base_url` and de-duplicated.
pub fn parse_listing_links(html: &str, base_url: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    let Ok(card_sel) = Selector::parse(CARD_SELECTOR) else {
        warn!("Bad card selector");
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse(CARD_LINK_SELECTOR) else {
        warn!("Bad link selector");
        return Vec::new();
    };

    let base = url::Url::parse(base_url).ok();
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for card in doc.select(&card_sel) {
        for anchor in card.select(&link_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let resolved = if href.starts_with("http://") || href.starts_with("https://") {
                href.to_string()
            } else if let Some(ref b) = base {
                match b.join(href) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                }
            } else {
                continue;
            };

            if seen.insert(resolved.clone()) {
                links.push(resolved);
            }
        }
    }

    links
}

// ── Release detail page ───────────────────────────────────────────────────────

/// Pull the raw field texts out of one release page. Absent nodes become
/// `None`; deciding what that means is the cleaner's job.
pub fn parse_release_page(html: &str) -> RawShoePage {
    let doc = Html::parse_document(html);

    RawShoePage {
        name: select_text(&doc, NAME_SELECTOR),
        image: select_attr(&doc, IMAGE_SELECTOR, "srcset"),
        release: select_text(&doc, RELEASE_SELECTOR),
        price: select_text(&doc, PRICE_SELECTOR),
    }
}

fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let text = el.text().collect::<String>().trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

fn select_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    el.value().attr(attr).map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="mb-5 sm:mb-2">
            <a class="rte-ignore group block" href="/releases/nike-air-max-95">Nike</a>
          </div>
          <div class="mb-5 sm:mb-2">
            <a class="rte-ignore group block" href="https://heat-mvmnt.de/releases/adidas-samba">Adidas</a>
            <a class="rte-ignore group block" href="/releases/nike-air-max-95">dupe</a>
          </div>
          <div class="other"><a class="rte-ignore group block" href="/not-a-card">x</a></div>
        </body></html>"#;

    #[test]
    fn listing_links_are_resolved_deduped_and_ordered() {
        let links = parse_listing_links(LISTING, "https://heat-mvmnt.de/releases");
        assert_eq!(
            links,
            vec![
                "https://heat-mvmnt.de/releases/nike-air-max-95".to_string(),
                "https://heat-mvmnt.de/releases/adidas-samba".to_string(),
            ]
        );
    }

    #[test]
    fn listing_links_of_empty_shell_is_empty() {
        assert!(parse_listing_links("<html><body></body></html>", "https://heat-mvmnt.de").is_empty());
    }

    fn detail_page(price_block: &str) -> String {
        format!(
            r#"<html><body>
              <div>
                <main>
                  <div>nav</div>
                  <div>breadcrumbs</div>
                  <div>
                    <h1>  Nike Air Max 95 "Neon"  </h1>
                    <div>
                      <div><picture>
                        <source srcset="https://images.heat-mvmnt.de/am95.webp 640w">
                        <img src="fallback.jpg">
                      </picture></div>
                    </div>
                    <div>gallery</div>
                    <div>
                      <div>
                        <div>Release</div>
                        <div>01.03.2025 09:00</div>
                      </div>
                      <div>
                        <div>
                          <div>
                            <div>Preis</div>
                            <div>
                              <div>{price_block}</div>
                            </div>
                          </div>
                        </div>
                      </div>
                    </div>
                  </div>
                </main>
              </div>
            </body></html>"#
        )
    }

    #[test]
    fn detail_fields_are_found_by_position() {
        let raw = parse_release_page(&detail_page("169,95 €"));
        assert_eq!(raw.name.as_deref(), Some(r#"Nike Air Max 95 "Neon""#));
        assert_eq!(
            raw.image.as_deref(),
            Some("https://images.heat-mvmnt.de/am95.webp 640w")
        );
        assert_eq!(raw.release.as_deref(), Some("01.03.2025 09:00"));
        assert_eq!(raw.price.as_deref(), Some("169,95 €"));
    }

    #[test]
    fn missing_nodes_become_none() {
        let raw = parse_release_page("<html><body><div><main></main></div></body></html>");
        assert!(raw.name.is_none());
        assert!(raw.image.is_none());
        assert!(raw.release.is_none());
        assert!(raw.price.is_none());
    }
}
