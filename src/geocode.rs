use crate::errors::AppError;
use crate::http_client::{redact_url, Source, SourceFetcher};
use reqwest::Url;
use serde_json::Value;

const RESULT_LIMIT: &str = "5";

/// Place search proxied to the Mapbox geocoding API.
pub struct GeocodeService {
    fetcher: SourceFetcher,
    base_url: String,
    access_token: Option<String>,
}

impl GeocodeService {
    pub fn new(
        fetcher: SourceFetcher,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            access_token,
        }
    }

    /// Returns Mapbox's feature collection for `query` unchanged.
    pub async fn search(&self, query: &str) -> Result<Value, AppError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| AppError::Misconfigured("Mapbox access token is not set".to_string()))?;

        let place = format!("{}.json", query);
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", place.as_str()]);
        url.query_pairs_mut()
            .append_pair("access_token", token)
            .append_pair("limit", RESULT_LIMIT);

        tracing::info!("Geocoding query: {}", query);
        tracing::debug!("Mapbox URL: {}", redact_url(&url));

        self.fetcher.get_json(Source::Geocode, url).await
    }
}
