//! Property listing adapter.
//!
//! Scrapes a listing search page for a free-text location and appends every
//! successful scrape to the local listing store.

use crate::cache_validator::ResponseCache;
use crate::errors::AppError;
use crate::html::{element_text, selector};
use crate::http_client::{Source, SourceFetcher};
use crate::models::{ListingRecord, SourceOutcome, MISSING_FIELD};
use crate::store::JsonArrayStore;
use reqwest::Url;
use scraper::Html;

const MAX_IMAGES: usize = 5;

pub struct ListingService {
    fetcher: SourceFetcher,
    cache: ResponseCache,
    store: JsonArrayStore,
    base_url: String,
}

impl ListingService {
    pub fn new(
        fetcher: SourceFetcher,
        cache: ResponseCache,
        store: JsonArrayStore,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            store,
            base_url: base_url.into(),
        }
    }

    /// Scrape listing data for an address, neighborhood, city, or zip code.
    ///
    /// Never fails: fetch and parse errors come back as an error-tagged record.
    /// Every successful call appends one record to the store, whether the
    /// page came from upstream or from the response cache.
    pub async fn scrape(&self, location: &str) -> SourceOutcome<ListingRecord> {
        let key = ResponseCache::fingerprint(Source::Listing, location);
        let outcome = self
            .cache
            .get_or_fetch(key, || self.scrape_uncached(location))
            .await;

        if let SourceOutcome::Data(ref record) = outcome {
            if let Err(e) = self.store.append(record).await {
                tracing::error!("Error saving listing to JSON store: {}", e);
            }
        }
        outcome
    }

    async fn scrape_uncached(&self, location: &str) -> SourceOutcome<ListingRecord> {
        tracing::info!("Starting listing scrape for input: {}", location);

        match self.try_scrape(location).await {
            Ok(SourceOutcome::Data(record)) => {
                tracing::info!(
                    "Scraped listing - Price: {}, Address: {}, Type: {}, Size: {}, Images: {}",
                    record.price,
                    record.address,
                    record.property_type,
                    record.property_size,
                    record.images.len()
                );
                SourceOutcome::Data(record)
            }
            Ok(error_record) => error_record,
            Err(e) => {
                tracing::error!("Error occurred while scraping {}: {}", location, e);
                SourceOutcome::error(e.to_string())
            }
        }
    }

    async fn try_scrape(&self, location: &str) -> Result<SourceOutcome<ListingRecord>, AppError> {
        let url = listing_url(&self.base_url, location)?;
        tracing::debug!("Navigating to URL: {}", url);

        let page = self.fetcher.get(Source::Listing, url).await?;
        if !page.is_success() {
            tracing::error!(
                "Failed to fetch listing page. Status code: {}",
                page.status.as_u16()
            );
            return Ok(SourceOutcome::error(format!(
                "Failed to fetch listing page. Status code: {}",
                page.status.as_u16()
            )));
        }

        let historical = historical_data_url(&self.base_url, location);
        parse_listing_page(&page.body, historical).map(SourceOutcome::Data)
    }
}

/// `{base}/homes/{location with spaces as dashes}_rb/`
pub fn listing_url(base_url: &str, location: &str) -> Result<Url, AppError> {
    let formatted = format!("{}_rb", location.trim().replace(' ', "-"));
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| AppError::BadRequest(format!("{} cannot be a base URL", base_url)))?
        .pop_if_empty()
        .push("homes")
        .push(&formatted)
        .push("");
    Ok(url)
}

/// Research page for the city part of the input (text before the first comma).
pub fn historical_data_url(base_url: &str, location: &str) -> String {
    let city = location.split(',').next().unwrap_or_default().trim();
    format!(
        "{}/research/data/{}-real-estate/",
        base_url.trim_end_matches('/'),
        city.to_lowercase().replace(' ', "-")
    )
}

/// Extracts the listing regions from a rendered page. Each missing region
/// degrades to `"N/A"` on its own.
pub fn parse_listing_page(
    html: &str,
    historical_data_url: String,
) -> Result<ListingRecord, AppError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let text_of = |css: &str| -> Result<String, AppError> {
        let sel = selector(css)?;
        Ok(root
            .select(&sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_else(|| MISSING_FIELD.to_string()))
    };

    let fact_sel = selector(".ds-home-fact-list-item")?;
    let facts: Vec<String> = root.select(&fact_sel).map(|el| element_text(&el)).collect();
    let fact_containing = |needle: &str| -> String {
        facts
            .iter()
            .find(|fact| fact.contains(needle))
            .cloned()
            .unwrap_or_else(|| MISSING_FIELD.to_string())
    };

    let image_sel = selector(".media-stream img")?;
    let images = root
        .select(&image_sel)
        .take(MAX_IMAGES)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string)
        .collect();

    Ok(ListingRecord {
        price: text_of(".ds-summary-row")?,
        address: text_of(".ds-address-container")?,
        property_type: text_of(".ds-home-type")?,
        property_size: facts
            .first()
            .cloned()
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
        zestimate: text_of(".ds-estimate-value")?,
        year_built: fact_containing("Year Built"),
        property_taxes: fact_containing("Property Tax"),
        images,
        historical_data_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"
        <html><body>
          <div class="ds-summary-row"> $2,450,000 </div>
          <div class="ds-address-container">100 Market St, San Francisco, CA 94105</div>
          <span class="ds-home-type">Office</span>
          <ul>
            <li class="ds-home-fact-list-item">12,500 sqft</li>
            <li class="ds-home-fact-list-item">Year Built: 1998</li>
            <li class="ds-home-fact-list-item">Property Tax: $31,200</li>
          </ul>
          <div class="media-stream">
            <img src="https://img.example.com/1.jpg">
            <img>
            <img src="https://img.example.com/2.jpg">
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_page_extracts_regions() {
        let record = parse_listing_page(LISTING_PAGE, "hist".to_string()).unwrap();
        assert_eq!(record.price, "$2,450,000");
        assert_eq!(record.property_type, "Office");
        assert_eq!(record.property_size, "12,500 sqft");
        assert_eq!(record.year_built, "Year Built: 1998");
        assert_eq!(record.property_taxes, "Property Tax: $31,200");
        assert_eq!(
            record.images,
            vec![
                "https://img.example.com/1.jpg".to_string(),
                "https://img.example.com/2.jpg".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_regions_degrade_individually() {
        let html = r#"<div class="ds-summary-row">$900,000</div>"#;
        let record = parse_listing_page(html, String::new()).unwrap();
        assert_eq!(record.price, "$900,000");
        assert_eq!(record.address, MISSING_FIELD);
        assert_eq!(record.zestimate, MISSING_FIELD);
        assert_eq!(record.year_built, MISSING_FIELD);
        assert!(record.images.is_empty());
    }

    #[test]
    fn test_images_capped_at_five() {
        let imgs: String = (0..8)
            .map(|i| format!(r#"<img src="https://img.example.com/{}.jpg">"#, i))
            .collect();
        let html = format!(r#"<div class="media-stream">{}</div>"#, imgs);
        let record = parse_listing_page(&html, String::new()).unwrap();
        assert_eq!(record.images.len(), 5);
    }

    #[test]
    fn test_listing_url_format() {
        let url = listing_url("https://www.zillow.com", "Austin TX 78701").unwrap();
        assert_eq!(url.as_str(), "https://www.zillow.com/homes/Austin-TX-78701_rb/");
    }

    #[test]
    fn test_listing_url_escapes_reserved_chars() {
        let url = listing_url("https://www.zillow.com", "Suite #4?").unwrap();
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_historical_data_url_uses_city() {
        assert_eq!(
            historical_data_url("https://www.zillow.com", "San Francisco, CA"),
            "https://www.zillow.com/research/data/san-francisco-real-estate/"
        );
    }
}
