use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Loosely-typed mapping an adapter returns: field name to extracted value.
pub type SourceRecord = serde_json::Map<String, Value>;

/// Placeholder for a listing region that was not found on the page.
pub const MISSING_FIELD: &str = "N/A";

// ============ Adapter Outcomes ============

/// Body returned in place of a record when a source could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

/// Either the adapter's record or an error-tagged record.
///
/// Serialized untagged, so the wire shape is exactly one of the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceOutcome<T> {
    Data(T),
    Error(ErrorRecord),
}

impl<T> SourceOutcome<T> {
    pub fn error(message: impl Into<String>) -> Self {
        SourceOutcome::Error(ErrorRecord {
            error: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SourceOutcome::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SourceOutcome::Data(data) => Some(data),
            SourceOutcome::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SourceOutcome::Data(_) => None,
            SourceOutcome::Error(record) => Some(&record.error),
        }
    }
}

// ============ Listing ============

/// Fields scraped from a property listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub price: String,
    pub address: String,
    pub property_type: String,
    pub property_size: String,
    pub zestimate: String,
    pub year_built: String,
    pub property_taxes: String,
    pub images: Vec<String>,
    pub historical_data_url: String,
}

// ============ Census ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusData {
    pub census_results: Vec<SourceRecord>,
    pub message: String,
}

// ============ News ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(alias = "url")]
    pub link: String,
    pub snippet: Option<String>,
    pub image: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsFeed {
    pub articles: Vec<NewsArticle>,
}

// ============ Rates ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub index: String,
    pub rate: String,
    pub source: String,
}

/// Interest-rate readings. `fallback` is true when the entries are the
/// static placeholder list rather than a live reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSheet {
    pub rates: Vec<RateEntry>,
    pub fallback: bool,
}

// ============ Document Extraction ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntry {
    pub tenant_name: String,
    pub amount: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialDetail {
    pub tenant_name: String,
    pub amount_due: String,
    pub payment_status: String,
}

/// Structured view of a rent roll / operating statement PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExtractionResult {
    pub property_details: BTreeMap<String, String>,
    pub tenants: Vec<TenantEntry>,
    pub financial_details: Vec<FinancialDetail>,
    pub additional_entities: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub details: DocumentExtractionResult,
}

// ============ Report ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub address: String,
    pub region: String,
    pub listing: SourceOutcome<ListingRecord>,
    pub demographics: SourceOutcome<CensusData>,
    pub development: SourceOutcome<NewsFeed>,
    pub generated_at: String,
}

// ============ Query Parameters ============

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub address: Option<String>,
    pub region: Option<String>,
}

/// Returns the trimmed value when present and non-blank.
pub fn required_param(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
