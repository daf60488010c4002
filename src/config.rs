use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_CORS_ORIGINS: &str = "https://getaicre.com,https://aicre.io,http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub census_api_key: String,
    pub mapbox_access_token: Option<String>,
    pub listing_base_url: String,
    pub census_base_url: String,
    pub news_base_url: String,
    pub rates_url: String,
    pub mapbox_base_url: String,
    pub data_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub news_max_results: usize,
    pub fetch_max_retries: u32,
    pub fetch_backoff_ms: u64,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|name| std::env::var(name).ok())?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Listing base URL: {}", config.listing_base_url);
        tracing::debug!("Census base URL: {}", config.census_base_url);
        tracing::debug!("News base URL: {}", config.news_base_url);
        tracing::debug!("Rates URL: {}", config.rates_url);
        if config.mapbox_access_token.is_none() {
            tracing::warn!("MAPBOX_ACCESS_TOKEN not set, /api/geocode will return 500");
        }
        tracing::debug!("Data directory: {}", config.data_dir.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let census_api_key = lookup("CENSUS_API_KEY")
            .or_else(|| lookup("NEXT_PUBLIC_CENSUS_API_KEY"))
            .ok_or_else(|| anyhow::anyhow!("CENSUS_API_KEY environment variable required"))
            .and_then(|key| {
                if key.trim().is_empty() {
                    anyhow::bail!("CENSUS_API_KEY cannot be empty");
                }
                Ok(key)
            })?;

        let mapbox_access_token = lookup("MAPBOX_ACCESS_TOKEN")
            .or_else(|| lookup("NEXT_PUBLIC_MAPBOX_ACCESS_TOKEN"))
            .filter(|s| !s.trim().is_empty());

        let cors_origins = lookup("CORS_ORIGINS")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port: number(&lookup, "PORT", 5328)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            census_api_key,
            mapbox_access_token,
            listing_base_url: url(&lookup, "LISTING_BASE_URL", "https://www.zillow.com")?,
            census_base_url: url(&lookup, "CENSUS_BASE_URL", "https://api.census.gov/data")?,
            news_base_url: url(&lookup, "NEWS_BASE_URL", "https://news.google.com")?,
            rates_url: url(
                &lookup,
                "RATES_URL",
                "https://www.commercialloandirect.com/commercial-rates.php",
            )?,
            mapbox_base_url: url(&lookup, "MAPBOX_BASE_URL", "https://api.mapbox.com")?,
            data_dir: lookup("DATA_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            http_timeout_secs: number(&lookup, "HTTP_TIMEOUT_SECS", 30)?,
            cache_ttl_secs: number(&lookup, "CACHE_TTL_SECS", 900)?,
            news_max_results: number(&lookup, "NEWS_MAX_RESULTS", 10)?,
            fetch_max_retries: number(&lookup, "FETCH_MAX_RETRIES", 3)?,
            fetch_backoff_ms: number(&lookup, "FETCH_BACKOFF_MS", 500)?,
            cors_origins,
        })
    }
}

fn url<F>(lookup: &F, name: &str, default: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(name) {
        Some(value) if value.trim().is_empty() => anyhow::bail!("{} cannot be empty", name),
        Some(value) => value,
        None => return Ok(default.to_string()),
    };
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn number<F, T>(lookup: &F, name: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        None => Ok(default),
    }
}
