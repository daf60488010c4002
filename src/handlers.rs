use crate::cache_validator::ResponseCache;
use crate::census::CensusService;
use crate::config::Config;
use crate::document::DocumentExtractor;
use crate::errors::{AppError, ResultExt};
use crate::geocode::GeocodeService;
use crate::http_client::{RetryPolicy, SourceFetcher};
use crate::listing::ListingService;
use crate::models::*;
use crate::news::{NewsPreset, NewsService};
use crate::rates::RateService;
use crate::report::ReportService;
use crate::store::JsonArrayStore;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Listing scrapes are appended here, under `DATA_DIR`.
pub const LISTING_STORE_FILE: &str = "saved_data.json";

const CACHE_MAX_ENTRIES: u64 = 10_000;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    pub listing: Arc<ListingService>,
    pub census: Arc<CensusService>,
    pub news: Arc<NewsService>,
    pub rates: Arc<RateService>,
    pub geocode: Arc<GeocodeService>,
    pub report: Arc<ReportService>,
    /// Compiled keyword and entity patterns, shared with blocking tasks.
    pub extractor: Arc<DocumentExtractor>,
}

impl AppState {
    /// Wires every adapter to one HTTP client, one response cache and the
    /// listing store.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let retry = RetryPolicy {
            max_retries: config.fetch_max_retries,
            base_backoff: Duration::from_millis(config.fetch_backoff_ms),
        };
        let fetcher = SourceFetcher::new(Duration::from_secs(config.http_timeout_secs), retry)?;
        let cache = ResponseCache::new(Duration::from_secs(config.cache_ttl_secs), CACHE_MAX_ENTRIES);
        let listing_store = JsonArrayStore::new(config.data_dir.join(LISTING_STORE_FILE));

        let listing = Arc::new(ListingService::new(
            fetcher.clone(),
            cache.clone(),
            listing_store,
            config.listing_base_url.clone(),
        ));
        let census = Arc::new(CensusService::new(
            fetcher.clone(),
            cache.clone(),
            config.census_base_url.clone(),
            config.census_api_key.clone(),
        ));
        let news = Arc::new(NewsService::new(
            fetcher.clone(),
            cache.clone(),
            config.news_base_url.clone(),
            config.news_max_results,
            config.data_dir.clone(),
        ));
        let rates = Arc::new(RateService::new(
            fetcher.clone(),
            cache,
            config.rates_url.clone(),
            config.data_dir.clone(),
        ));
        let geocode = Arc::new(GeocodeService::new(
            fetcher,
            config.mapbox_base_url.clone(),
            config.mapbox_access_token.clone(),
        ));
        let report = Arc::new(ReportService::new(
            listing.clone(),
            census.clone(),
            news.clone(),
        ));
        let extractor = Arc::new(DocumentExtractor::with_defaults()?);

        Ok(Self {
            config,
            listing,
            census,
            news,
            rates,
            geocode,
            report,
            extractor,
        })
    }
}

fn require<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, AppError> {
    required_param(value).ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
}

/// Health check endpoint.
///
/// Returns the service status, name and version.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "cre-signals-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/zillow?address=
///
/// Listing data for an address, neighborhood, city, or zip code. Upstream
/// failures come back as 200 with an `error` field.
pub async fn zillow(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AddressQuery>,
) -> Result<Json<SourceOutcome<ListingRecord>>, AppError> {
    let address = require(params.address.as_ref(), "Address")?;
    tracing::info!("GET /api/zillow - address: {}", address);

    Ok(Json(state.listing.scrape(address).await))
}

/// GET /census?region= and /api/census?region=
pub async fn census(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionQuery>,
) -> Result<Json<SourceOutcome<CensusData>>, AppError> {
    let region = require(params.region.as_ref(), "Region")?;
    tracing::info!("GET /census - region: {}", region);

    Ok(Json(state.census.fetch(region).await))
}

/// GET /api/news?topic=
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopicQuery>,
) -> Result<Json<SourceOutcome<NewsFeed>>, AppError> {
    let topic = require(params.topic.as_ref(), "Topic")?;
    tracing::info!("GET /api/news - topic: {}", topic);

    Ok(Json(state.news.search(topic).await))
}

/// GET /api/news/:preset
///
/// One of the fixed feeds (`national`, `regional`, `emerging`). The feed is
/// also written to the data directory.
pub async fn news_preset(
    State(state): State<Arc<AppState>>,
    Path(preset): Path<String>,
) -> Result<Json<SourceOutcome<NewsFeed>>, AppError> {
    let preset = NewsPreset::from_slug(&preset)
        .ok_or_else(|| AppError::NotFound(format!("Unknown news feed: {}", preset)))?;
    tracing::info!("GET /api/news/{:?}", preset);

    Ok(Json(state.news.preset(preset).await))
}

/// GET /api/rates
pub async fn rates(State(state): State<Arc<AppState>>) -> Json<RateSheet> {
    tracing::info!("GET /api/rates");
    Json(state.rates.fetch().await)
}

/// GET /api/geocode?q=
///
/// Mapbox's response is passed through unchanged. Unlike the scraping
/// routes, an upstream failure here is an HTTP error.
pub async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<Value>, AppError> {
    let query = required_param(params.q.as_ref())
        .ok_or_else(|| AppError::BadRequest("Missing query parameter 'q'".to_string()))?;
    tracing::info!("GET /api/geocode - q: {}", query);

    let features = state.geocode.search(query).await?;
    Ok(Json(features))
}

/// GET /api/report?address=&region=
pub async fn report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let address = require(params.address.as_ref(), "Address")?;
    let region = require(params.region.as_ref(), "Region")?;
    tracing::info!("GET /api/report - address: {}, region: {}", address, region);

    Ok(Json(state.report.build(address, region).await))
}

/// POST /api/upload
///
/// Accepts a multipart body with a PDF in the `file` part and returns the
/// fields extracted from it. The upload is kept on disk only while it is
/// being read.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| AppError::BadRequest("No file part".to_string()))?;
    if filename.trim().is_empty() {
        return Err(AppError::BadRequest("No selected file".to_string()));
    }

    let filename = sanitize_filename(&filename);
    tracing::info!("POST /api/upload - {} ({} bytes)", filename, bytes.len());

    let upload_dir = state.config.data_dir.join("uploads");
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("creating {}", upload_dir.display()))?;
    let path = upload_dir.join(format!("{}-{}", Uuid::new_v4(), filename));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("saving upload to {}", path.display()))?;

    let extractor = state.extractor.clone();
    let extract_from = path.clone();
    let extracted = tokio::task::spawn_blocking(move || extractor.extract_path(&extract_from))
        .await
        .map_err(|e| AppError::InternalError(format!("extraction task failed: {}", e)));

    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
    }

    let details = extracted??;
    tracing::info!(
        "Extracted {} property fields and {} tenants from {}",
        details.property_details.len(),
        details.tenants.len(),
        filename
    );

    Ok(Json(UploadResponse { filename, details }))
}

/// Final path component with anything outside `[A-Za-z0-9._-]` replaced.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}
