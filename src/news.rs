//! News adapter: scrapes a news search results page for a topic.

use crate::cache_validator::ResponseCache;
use crate::errors::AppError;
use crate::html::{first_attr, first_text, selector};
use crate::http_client::{Source, SourceFetcher};
use crate::models::{NewsArticle, NewsFeed, SourceOutcome};
use crate::store::write_json_file;
use reqwest::Url;
use scraper::Html;
use std::path::PathBuf;

/// Fixed feeds served under `/api/news/{preset}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsPreset {
    National,
    Regional,
    Emerging,
}

impl NewsPreset {
    /// Parses the path segment used in `/api/news/{preset}`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "national" => Some(NewsPreset::National),
            "regional" => Some(NewsPreset::Regional),
            "emerging" => Some(NewsPreset::Emerging),
            _ => None,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            NewsPreset::National => "National Commercial Real Estate News",
            NewsPreset::Regional => "Regional Commercial Real Estate News",
            NewsPreset::Emerging => "Emerging Commercial Real Estate News",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            NewsPreset::National => "national_news.json",
            NewsPreset::Regional => "regional_news.json",
            NewsPreset::Emerging => "emerging_news.json",
        }
    }
}

pub struct NewsService {
    fetcher: SourceFetcher,
    cache: ResponseCache,
    base_url: String,
    max_results: usize,
    data_dir: PathBuf,
}

impl NewsService {
    pub fn new(
        fetcher: SourceFetcher,
        cache: ResponseCache,
        base_url: impl Into<String>,
        max_results: usize,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            base_url: base_url.into(),
            max_results,
            data_dir: data_dir.into(),
        }
    }

    /// Search headlines for a free-text topic. Results are not persisted.
    pub async fn search(&self, topic: &str) -> SourceOutcome<NewsFeed> {
        let key = ResponseCache::fingerprint(Source::News, topic);
        self.cache
            .get_or_fetch(key, || self.search_uncached(topic))
            .await
    }

    /// Fetch one of the fixed feeds and write it to `{data_dir}/{preset}_news.json`.
    pub async fn preset(&self, preset: NewsPreset) -> SourceOutcome<NewsFeed> {
        let outcome = self.search(preset.topic()).await;

        if let SourceOutcome::Data(ref feed) = outcome {
            let path = self.data_dir.join(preset.file_name());
            match write_json_file(&path, feed).await {
                Ok(()) => tracing::info!("News data saved to {}", path.display()),
                Err(e) => tracing::error!("Error saving news data to {}: {}", path.display(), e),
            }
        }
        outcome
    }

    async fn search_uncached(&self, topic: &str) -> SourceOutcome<NewsFeed> {
        tracing::info!("Starting news scrape for: {}", topic);

        match self.try_search(topic).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Error while scraping news for {}: {}", topic, e);
                SourceOutcome::error(e.to_string())
            }
        }
    }

    async fn try_search(&self, topic: &str) -> Result<SourceOutcome<NewsFeed>, AppError> {
        let url = Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", topic), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
        )?;

        let page = self.fetcher.get(Source::News, url).await?;
        if !page.is_success() {
            let status = page.status.as_u16();
            tracing::error!("Failed to fetch news. Status code: {}", status);
            return Ok(SourceOutcome::error(format!(
                "Failed to fetch news. Status code: {}",
                status
            )));
        }

        let articles = parse_search_results(&page.body, &self.base_url, self.max_results)?;
        tracing::info!("Found {} headlines for {}", articles.len(), topic);
        Ok(SourceOutcome::Data(NewsFeed { articles }))
    }
}

/// Extracts up to `max_results` articles from a search results page.
///
/// A result without a title or a link is skipped; the rest of the page is
/// still read.
pub fn parse_search_results(
    html: &str,
    base_url: &str,
    max_results: usize,
) -> Result<Vec<NewsArticle>, AppError> {
    let base = Url::parse(base_url)?;
    let document = Html::parse_document(html);

    let article_sel = selector("article")?;
    let heading_sel = selector("h3, h4")?;
    let link_sel = selector("a[href]")?;
    let snippet_sel = selector("p")?;
    let image_sel = selector("img[src]")?;
    let source_sel = selector("[data-n-tid], .source")?;

    let mut articles = Vec::new();
    for result in document.select(&article_sel) {
        if articles.len() >= max_results {
            break;
        }

        let Some(href) = first_attr(&result, &link_sel, "href") else {
            tracing::debug!("Skipping news result without a link");
            continue;
        };
        let Some(title) =
            first_text(&result, &heading_sel).or_else(|| first_text(&result, &link_sel))
        else {
            tracing::debug!("Skipping news result without a title");
            continue;
        };
        let Ok(link) = base.join(&href) else {
            tracing::debug!("Skipping news result with malformed link: {}", href);
            continue;
        };

        articles.push(NewsArticle {
            title,
            link: link.to_string(),
            snippet: first_text(&result, &snippet_sel),
            image: first_attr(&result, &image_sel, "src"),
            source: first_text(&result, &source_sel),
        });
    }

    Ok(articles)
}
