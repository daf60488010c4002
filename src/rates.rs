//! Interest-rate adapter: scrapes the key market index rate table from a
//! fixed page, falling back to a static list.

use crate::cache_validator::ResponseCache;
use crate::errors::AppError;
use crate::html::{element_text, selector};
use crate::http_client::{Source, SourceFetcher};
use crate::models::{RateEntry, RateSheet};
use crate::store::write_json_file;
use reqwest::Url;
use scraper::Html;
use std::path::PathBuf;

const SECTION_ID: &str = "keymarketinterestrates";
const RATES_FILE: &str = "key_market_rates.json";
const CACHE_KEY_INPUT: &str = "key-market-index-rates";

pub struct RateService {
    fetcher: SourceFetcher,
    cache: ResponseCache,
    url: String,
    data_dir: PathBuf,
}

impl RateService {
    pub fn new(
        fetcher: SourceFetcher,
        cache: ResponseCache,
        url: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            url: url.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Current key market index rates. Always non-empty: when the page is
    /// unreachable or has no rows, the static placeholder list is returned
    /// with `fallback: true`.
    pub async fn fetch(&self) -> RateSheet {
        let key = ResponseCache::fingerprint(Source::Rates, CACHE_KEY_INPUT);
        if let Some(cached) = self.cache.get::<Vec<RateEntry>>(&key).await {
            return RateSheet {
                rates: cached,
                fallback: false,
            };
        }

        tracing::info!("Starting rate scrape for: {}", self.url);
        let rates = match self.scrape().await {
            Ok(rates) if !rates.is_empty() => rates,
            Ok(_) => {
                tracing::warn!("No rates found, serving placeholder rates");
                return fallback_sheet();
            }
            Err(e) => {
                tracing::error!("Error scraping {}: {}, serving placeholder rates", self.url, e);
                return fallback_sheet();
            }
        };

        tracing::info!("Extracted {} rates from {}", rates.len(), self.url);
        self.cache.insert(key, &rates).await;

        let path = self.data_dir.join(RATES_FILE);
        if let Err(e) = write_json_file(&path, &rates).await {
            tracing::error!("Error saving rate data to {}: {}", path.display(), e);
        }

        RateSheet {
            rates,
            fallback: false,
        }
    }

    async fn scrape(&self) -> Result<Vec<RateEntry>, AppError> {
        let url = Url::parse(&self.url)?;
        let source = url.host_str().unwrap_or("unknown").to_string();

        let page = self.fetcher.get(Source::Rates, url).await?;
        if !page.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to fetch rates. Status code: {}",
                page.status.as_u16()
            )));
        }

        parse_rate_table(&page.body, &source)
    }
}

/// Reads the first table following the key market rates heading, skipping
/// its header row. Rows with fewer than two cells are ignored.
pub fn parse_rate_table(html: &str, source: &str) -> Result<Vec<RateEntry>, AppError> {
    let document = Html::parse_document(html);

    // Selector lists match in document order, so the first table after the
    // heading is the next "table" hit once the heading has been seen.
    let anchor_sel = selector(&format!("h2#{}, table", SECTION_ID))?;
    let table = document
        .select(&anchor_sel)
        .skip_while(|el| el.value().name() != "h2")
        .find(|el| el.value().name() == "table");

    let Some(table) = table else {
        return Ok(Vec::new());
    };

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let rates = table
        .select(&row_sel)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&cell_sel).map(|td| element_text(&td)).collect();
            if cells.len() < 2 {
                return None;
            }
            Some(RateEntry {
                index: cells[0].clone(),
                rate: cells[1].clone(),
                source: source.to_string(),
            })
        })
        .collect();

    Ok(rates)
}

/// Static placeholder readings served when no live rates can be read.
pub fn fallback_rates() -> Vec<RateEntry> {
    [
        ("30-Year Fixed", "5.25%", "Bankrate (placeholder)"),
        ("Commercial Mortgage", "4.85%", "CBRE (placeholder)"),
        ("Multifamily Mortgage", "4.75%", "Freddie Mac (placeholder)"),
    ]
    .into_iter()
    .map(|(index, rate, source)| RateEntry {
        index: index.to_string(),
        rate: rate.to_string(),
        source: source.to_string(),
    })
    .collect()
}

fn fallback_sheet() -> RateSheet {
    RateSheet {
        rates: fallback_rates(),
        fallback: true,
    }
}
