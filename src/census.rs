//! Economic/demographic adapter over the Census Bureau ACS 5-year API.

use crate::cache_validator::ResponseCache;
use crate::errors::AppError;
use crate::http_client::{redact_url, Source, SourceFetcher};
use crate::models::{CensusData, SourceOutcome, SourceRecord};
use reqwest::Url;
use serde_json::Value;

/// ACS variables requested for every region: area name and total population.
const CENSUS_FIELDS: &str = "NAME,B01003_001E";
const ACS_DATASET: &str = "2019/acs/acs5";

pub const FETCH_FAILED: &str = "Failed to fetch census data";
pub const NO_DATA: &str = "No census data available";

pub struct CensusService {
    fetcher: SourceFetcher,
    cache: ResponseCache,
    base_url: String,
    api_key: String,
}

impl CensusService {
    pub fn new(
        fetcher: SourceFetcher,
        cache: ResponseCache,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch census data for a state-level region code (e.g. `06`).
    pub async fn fetch(&self, region: &str) -> SourceOutcome<CensusData> {
        let key = ResponseCache::fingerprint(Source::Census, region);
        self.cache
            .get_or_fetch(key, || self.fetch_uncached(region))
            .await
    }

    async fn fetch_uncached(&self, region: &str) -> SourceOutcome<CensusData> {
        match self.fetch_rows(region).await {
            Ok(raw) => parse_census_response(&raw),
            Err(e) => {
                tracing::error!("Error fetching Census data for region {}: {}", region, e);
                SourceOutcome::error(FETCH_FAILED)
            }
        }
    }

    async fn fetch_rows(&self, region: &str) -> Result<Value, AppError> {
        let for_clause = format!("state:{}", region);
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, ACS_DATASET),
            &[
                ("get", CENSUS_FIELDS),
                ("for", for_clause.as_str()),
                ("key", self.api_key.as_str()),
            ],
        )?;

        tracing::info!("Fetching census data for region: {}", region);
        tracing::debug!("Census URL: {}", redact_url(&url));

        self.fetcher.get_json(Source::Census, url).await
    }
}

/// Reshapes the API's header row + data rows into one mapping per data row.
pub fn parse_census_response(raw: &Value) -> SourceOutcome<CensusData> {
    let rows: Vec<Vec<Value>> = match raw.as_array() {
        Some(rows) => rows
            .iter()
            .map(|row| row.as_array().cloned().unwrap_or_default())
            .collect(),
        None => {
            tracing::warn!("Census response is not a JSON array");
            return SourceOutcome::error(NO_DATA);
        }
    };

    match rows_to_records(&rows) {
        Some(records) => SourceOutcome::Data(CensusData {
            census_results: records,
            message: "Successfully retrieved Census data".to_string(),
        }),
        None => SourceOutcome::error(NO_DATA),
    }
}

/// Maps each data row onto the header row by position. Returns `None` when
/// there is no data row. Short rows yield `null` for the missing trailing
/// cells; cells past the last header are dropped.
pub fn rows_to_records(rows: &[Vec<Value>]) -> Option<Vec<SourceRecord>> {
    if rows.len() < 2 {
        return None;
    }

    let headers: Vec<String> = rows[0]
        .iter()
        .map(|header| match header {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let records = rows[1..]
        .iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.get(i).cloned().unwrap_or(Value::Null)))
                .collect::<SourceRecord>()
        })
        .collect();

    Some(records)
}
