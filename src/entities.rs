//! Named-entity recognition used by the document extractor.

use crate::errors::AppError;
use regex::Regex;

pub const LABEL_ORG: &str = "ORG";
pub const LABEL_DATE: &str = "DATE";
pub const LABEL_MONEY: &str = "MONEY";
pub const LABEL_PERCENT: &str = "PERCENT";

/// One recognized span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub label: String,
    pub text: String,
    pub start: usize,
}

/// Anything that can label spans of free text.
pub trait EntityRecognizer: Send + Sync {
    /// Entities in `text`, ordered by position.
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

/// Pattern-based recognizer for the entity kinds that matter in rent rolls
/// and operating statements: money, percentages, dates, organizations.
pub struct RuleBasedRecognizer {
    patterns: Vec<(&'static str, Regex)>,
}

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";

const ORG_SUFFIXES: &str = "Inc|LLC|L\\.L\\.C|Corp|Corporation|Company|Co|Ltd|LP|LLP|Group|Partners|Holdings|Trust|Bank|Realty|Properties|Associates|REIT";

impl RuleBasedRecognizer {
    pub fn new() -> Result<Self, AppError> {
        let money = r"\$\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:million|billion|thousand|MM|[MBK])\b)?";
        let percent = r"\b\d{1,3}(?:\.\d+)?\s?%";
        let date = format!(
            r"\b\d{{1,2}}/\d{{1,2}}/\d{{2,4}}\b|\b(?:{months})\.?\s\d{{1,2}}(?:st|nd|rd|th)?,?\s\d{{4}}\b|\b(?:{months})\s\d{{4}}\b|\b(?:Q[1-4]|FY)\s?\d{{4}}\b",
            months = MONTHS
        );
        let org = format!(
            r"\b(?:[A-Z][\w&'\-]*[ \t]+){{1,4}}(?:{suffixes})\b\.?",
            suffixes = ORG_SUFFIXES
        );

        let compile = |label: &'static str, pattern: &str| -> Result<(&'static str, Regex), AppError> {
            Regex::new(pattern)
                .map(|re| (label, re))
                .map_err(|e| AppError::InternalError(format!("invalid {} pattern: {}", label, e)))
        };

        Ok(Self {
            patterns: vec![
                compile(LABEL_MONEY, money)?,
                compile(LABEL_PERCENT, percent)?,
                compile(LABEL_DATE, &date)?,
                compile(LABEL_ORG, &org)?,
            ],
        })
    }
}

impl EntityRecognizer for RuleBasedRecognizer {
    fn recognize(&self, text: &str) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .patterns
            .iter()
            .flat_map(|(label, re)| {
                re.find_iter(text).map(move |m| Entity {
                    label: label.to_string(),
                    text: m.as_str().trim().to_string(),
                    start: m.start(),
                })
            })
            .collect();
        entities.sort_by_key(|e| e.start);
        entities
    }
}
