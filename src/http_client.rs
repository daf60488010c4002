use crate::circuit_breaker::{create_source_circuit_breaker, SourceBreaker};
use crate::errors::AppError;
use failsafe::futures::CircuitBreaker;
use reqwest::header::USER_AGENT;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Desktop browser identity; listing and news sites serve bot pages otherwise.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Upstream sources the service talks to. Each has its own circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Listing,
    Census,
    News,
    Rates,
    Geocode,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Listing,
        Source::Census,
        Source::News,
        Source::Rates,
        Source::Geocode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Listing => "listing",
            Source::Census => "census",
            Source::News => "news",
            Source::Rates => "rates",
            Source::Geocode => "geocode",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry schedule for 429/5xx responses: `base_backoff * 2^attempt`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Raw upstream response: status plus body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

enum FetchFailure {
    Transport(String),
    Retryable(FetchedPage),
}

/// Shared HTTP client for all adapters, with per-source circuit breakers and
/// retry on 429/5xx.
#[derive(Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
    breakers: Arc<HashMap<Source, SourceBreaker>>,
    retry: RetryPolicy,
}

impl SourceFetcher {
    /// Creates a new `SourceFetcher`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-request timeout applied by the underlying client.
    /// * `retry` - Retry schedule for rate-limited or failing upstreams.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        let breakers = Source::ALL
            .iter()
            .map(|source| (*source, create_source_circuit_breaker()))
            .collect();

        Ok(Self {
            client,
            breakers: Arc::new(breakers),
            retry,
        })
    }

    /// GETs `url` on behalf of `source`.
    ///
    /// Returns the page for any HTTP status once retries are exhausted, so
    /// adapters can report the status code. Transport errors and an open
    /// circuit are returned as `ExternalApiError`.
    pub async fn get(&self, source: Source, url: Url) -> Result<FetchedPage, AppError> {
        let breaker = self.breakers.get(&source).ok_or_else(|| {
            AppError::InternalError(format!("No circuit breaker for source {}", source))
        })?;

        let mut attempt = 0;
        loop {
            match breaker.call(self.send_once(&url)).await {
                Ok(page) => return Ok(page),
                Err(failsafe::Error::Rejected) => {
                    tracing::warn!("Circuit open for {}, rejecting request", source);
                    return Err(AppError::ExternalApiError(format!(
                        "{} source temporarily unavailable (circuit open)",
                        source
                    )));
                }
                Err(failsafe::Error::Inner(FetchFailure::Transport(e))) => {
                    tracing::error!("{} request failed: {}", source, e);
                    return Err(AppError::ExternalApiError(format!(
                        "{} request failed: {}",
                        source, e
                    )));
                }
                Err(failsafe::Error::Inner(FetchFailure::Retryable(page))) => {
                    if attempt >= self.retry.max_retries {
                        return Ok(page);
                    }
                    let backoff = self.retry.backoff(attempt);
                    tracing::warn!(
                        "{} returned {} (attempt {}/{}), backing off {:.1}s",
                        source,
                        page.status,
                        attempt + 1,
                        self.retry.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// GETs `url` and decodes a successful body as JSON.
    pub async fn get_json(
        &self,
        source: Source,
        url: Url,
    ) -> Result<serde_json::Value, AppError> {
        let page = self.get(source, url).await?;
        if !page.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "{} returned status {}",
                source, page.status
            )));
        }
        serde_json::from_str(&page.body).map_err(|e| {
            AppError::ParseError(format!("Failed to parse {} response: {}", source, e))
        })
    }

    async fn send_once(&self, url: &Url) -> Result<FetchedPage, FetchFailure> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Transport(e.without_url().to_string()))?;

        let page = FetchedPage { status, body };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(FetchFailure::Retryable(page));
        }
        Ok(page)
    }
}

/// Renders a URL for logs with credential query parameters masked.
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if matches!(k.as_ref(), "key" | "token" | "access_token") {
                "[REDACTED]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}
