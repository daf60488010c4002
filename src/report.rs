//! Combined property report: listing, demographics and development news for
//! one address in one call.

use crate::census::CensusService;
use crate::listing::ListingService;
use crate::models::ReportResponse;
use crate::news::NewsService;
use chrono::Utc;
use std::sync::Arc;

pub struct ReportService {
    listing: Arc<ListingService>,
    census: Arc<CensusService>,
    news: Arc<NewsService>,
}

impl ReportService {
    pub fn new(
        listing: Arc<ListingService>,
        census: Arc<CensusService>,
        news: Arc<NewsService>,
    ) -> Self {
        Self {
            listing,
            census,
            news,
        }
    }

    /// Each section carries its own adapter outcome, so one unreachable
    /// source never fails the whole report.
    pub async fn build(&self, address: &str, region: &str) -> ReportResponse {
        tracing::info!("Building report for {} (region {})", address, region);

        let listing = self.listing.scrape(address).await;
        let demographics = self.census.fetch(region).await;
        let development = self.news.search(&development_topic(address)).await;

        let failed = [
            listing.is_error(),
            demographics.is_error(),
            development.is_error(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count();
        if failed > 0 {
            tracing::warn!("Report for {} has {} failed section(s)", address, failed);
        }

        ReportResponse {
            address: address.to_string(),
            region: region.to_string(),
            listing,
            demographics,
            development,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// City portion of a free-text address: the second comma-separated part when
/// there is one, otherwise the whole input.
pub fn city_of(address: &str) -> &str {
    let mut parts = address.split(',').map(str::trim);
    let first = parts.next().unwrap_or_default();
    match parts.next() {
        Some(city) if !city.is_empty() => city,
        _ => first,
    }
}

pub fn development_topic(address: &str) -> String {
    format!("{} commercial real estate development", city_of(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_of_full_address() {
        assert_eq!(city_of("1600 Larimer St, Denver, CO 80202"), "Denver");
    }

    #[test]
    fn test_city_of_bare_city() {
        assert_eq!(city_of(" Austin "), "Austin");
        assert_eq!(city_of("Austin, "), "Austin");
    }

    #[test]
    fn test_development_topic() {
        assert_eq!(
            development_topic("10 Main St, Boise, ID"),
            "Boise commercial real estate development"
        );
    }
}
