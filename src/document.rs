//! Field extraction from commercial real-estate PDFs (rent rolls, operating
//! statements, offering memoranda).
//!
//! The text of every page is concatenated, then four passes fill a
//! [`DocumentExtractionResult`]:
//!
//! 1. keyword table: first match per field wins;
//! 2. tenant lines (`name  $amount  status`), one tenant and one financial
//!    entry per line;
//! 3. named entities, bucketed by label and then into the fixed
//!    `organizations` / `dates` / `monetary_values` lists;
//! 4. any `key: value` line, appended under its key.

use crate::entities::{EntityRecognizer, RuleBasedRecognizer, LABEL_DATE, LABEL_MONEY, LABEL_ORG, LABEL_PERCENT};
use crate::errors::AppError;
use crate::models::{DocumentExtractionResult, FinancialDetail, TenantEntry};
use lopdf::content::{Content, Operation};
use lopdf::Object;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::Arc;

/// (field, pattern). Patterns are compiled case-insensitive. The `value`
/// group is the field value; without one, group 1, else the whole match.
const KEYWORD_PATTERNS: &[(&str, &str)] = &[
    ("address", r"\b(?:property address|address|location)\b[ \t]*:?\s*(?P<value>[^\n]+)"),
    ("tenant", r"(?P<value>[a-z][\w \t]*?)[ \t]+[\(\-]?\$\d[\d,.]*"),
    ("amount", r"\$\d[\d,]*(?:\.\d+)?"),
    ("status", r"\b(open credit|unpaid rent|paid rent|prepaid cam|late charge|shortpaid cam|open cam)\b"),
    ("occupancy_rate", r"\boccupancy rate\b:?\s*(?P<value>\d{1,3}(?:\.\d+)?%)"),
    ("lease_expiration", r"\b(?:lease expiration|lease end date)\b:?\s*(?P<value>\d{1,2}/\d{1,2}/\d{2,4})"),
    ("square_footage", r"\b(?:square footage|sq\.?\s?ft\.?)\s*:?\s*(?P<value>\d[\d,]*)"),
    ("net_operating_income", r"\b(?:noi|net operating income)\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("capital_expenditure", r"\b(?:capex|capital expenditures?)\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("annual_rent", r"\bannual (?:rent|rental income)\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("monthly_rent", r"\bmonthly rent\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("cam_charges", r"\b(?:cam|common area maintenance)(?: charges)?\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("tenant_improvements", r"\btenant improvements\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("management_fees", r"\bmanagement fees?\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("debt_service", r"\bdebt service\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("property_tax", r"\bproperty tax(?:es)?\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("insurance", r"\binsurance\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("vacancy_rate", r"\bvacancy rate\b:?\s*(?P<value>\d{1,3}(?:\.\d+)?%)"),
    ("maintenance_reserves", r"\bmaintenance reserves?\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("effective_gross_income", r"\b(?:egi|effective gross income)\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("gross_rental_income", r"\bgross rental income\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
    ("net_cash_flow", r"\bnet cash flow\b:?\s*\$?(?P<value>\d[\d,]*(?:\.\d+)?)"),
];

const TENANT_LINE_PATTERN: &str = r"(?im)^[ \t]*(?P<tenant>[a-z][\w&'.,\- ]*?)[ \t]+[\(\-]?(?P<amount>\$\d[\d,]*(?:\.\d+)?)\)?[ \t]+(?P<status>open credit|unpaid rent|paid rent|prepaid cam|late charge|shortpaid cam|open cam)\b";

const KEY_VALUE_PATTERN: &str = r"(?P<key>\b\w+\b(?: \b\w+\b){0,3})\s*:\s*(?P<value>.+)";

/// A single keyword rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub field: &'static str,
    pub pattern: Regex,
}

impl ExtractionRule {
    /// Value of the first match in `text`, trimmed.
    pub fn first_value(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let m = caps
            .name("value")
            .or_else(|| caps.get(1))
            .or_else(|| caps.get(0))?;
        Some(m.as_str().trim().to_string())
    }
}

/// The compiled keyword table. Built once at startup.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    rules: Vec<ExtractionRule>,
}

impl KeywordTable {
    pub fn new() -> Result<Self, AppError> {
        let rules = KEYWORD_PATTERNS
            .iter()
            .map(|&(field, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|pattern| ExtractionRule { field, pattern })
                    .map_err(|e| {
                        AppError::InternalError(format!("invalid keyword rule '{}': {}", field, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }
}

pub struct DocumentExtractor {
    keywords: KeywordTable,
    recognizer: Arc<dyn EntityRecognizer>,
    tenant_line: Regex,
    key_value: Regex,
}

impl DocumentExtractor {
    pub fn new(
        keywords: KeywordTable,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Result<Self, AppError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::InternalError(format!("invalid extractor pattern: {}", e)))
        };
        Ok(Self {
            keywords,
            recognizer,
            tenant_line: compile(TENANT_LINE_PATTERN)?,
            key_value: compile(KEY_VALUE_PATTERN)?,
        })
    }

    /// Keyword table plus the rule-based recognizer.
    pub fn with_defaults() -> Result<Self, AppError> {
        Self::new(KeywordTable::new()?, Arc::new(RuleBasedRecognizer::new()?))
    }

    /// Extract fields from the PDF at `path`. Read and parse failures are
    /// returned to the caller.
    pub fn extract_path(&self, path: &Path) -> Result<DocumentExtractionResult, AppError> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::DocumentError(format!("Failed to open PDF {}: {}", path.display(), e))
        })?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        self.extract_bytes(&bytes)
    }

    /// Extract fields from an in-memory PDF.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<DocumentExtractionResult, AppError> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| AppError::DocumentError(format!("Failed to open PDF: {}", e)))?;
        let text = pdf_text(document)?;
        tracing::info!("Extracted {} characters of PDF text", text.len());
        Ok(self.extract_text(&text))
    }

    /// Run every extraction pass over already-extracted document text.
    pub fn extract_text(&self, text: &str) -> DocumentExtractionResult {
        let mut result = DocumentExtractionResult::default();

        for rule in self.keywords.rules() {
            if let Some(value) = rule.first_value(text) {
                result.property_details.insert(rule.field.to_string(), value);
            }
        }

        for caps in self.tenant_line.captures_iter(text) {
            let tenant_name = caps["tenant"].trim().to_string();
            let amount = caps["amount"].trim().to_string();
            let status = caps["status"].trim().to_string();

            result.financial_details.push(FinancialDetail {
                tenant_name: tenant_name.clone(),
                amount_due: amount.clone(),
                payment_status: status.clone(),
            });
            result.tenants.push(TenantEntry {
                tenant_name,
                amount,
                status,
            });
        }

        let entities = self.recognizer.recognize(text);
        for entity in &entities {
            let bucket = result
                .additional_entities
                .entry(entity.label.to_lowercase())
                .or_default();
            if !bucket.contains(&entity.text) {
                bucket.push(entity.text.clone());
            }
        }

        let mut organizations = Vec::new();
        let mut dates = Vec::new();
        let mut monetary_values = Vec::new();
        for entity in &entities {
            match entity.label.as_str() {
                LABEL_ORG => organizations.push(entity.text.clone()),
                LABEL_DATE => dates.push(entity.text.clone()),
                LABEL_MONEY | LABEL_PERCENT => monetary_values.push(entity.text.clone()),
                _ => {}
            }
        }
        result
            .additional_entities
            .insert("organizations".to_string(), organizations);
        result.additional_entities.insert("dates".to_string(), dates);
        result
            .additional_entities
            .insert("monetary_values".to_string(), monetary_values);

        for caps in self.key_value.captures_iter(text) {
            let key = caps["key"].trim().to_string();
            let value = caps["value"].trim().to_string();
            result.additional_entities.entry(key).or_default().push(value);
        }

        tracing::debug!(
            "Document extraction: {} property fields, {} tenants, {} entity keys",
            result.property_details.len(),
            result.tenants.len(),
            result.additional_entities.len()
        );

        result
    }
}

/// Text of every page, in page order, one line per line of text on the page.
pub fn pdf_text(mut document: lopdf::Document) -> Result<String, AppError> {
    if document.is_encrypted() {
        return Err(AppError::DocumentError(
            "Encrypted PDFs are not supported".to_string(),
        ));
    }

    let mut text = String::new();
    for (page_number, page_id) in document.get_pages() {
        let content = document
            .get_and_decode_page_content(page_id)
            .map_err(|e| page_error(page_number, e))?;
        let lined = split_text_lines(content)
            .encode()
            .map_err(|e| page_error(page_number, e))?;
        document
            .change_page_content(page_id, lined)
            .map_err(|e| page_error(page_number, e))?;

        let page_text = document
            .extract_text(&[page_number])
            .map_err(|e| page_error(page_number, e))?;
        text.push_str(&page_text);
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}

fn page_error(page_number: u32, e: lopdf::Error) -> AppError {
    AppError::DocumentError(format!("Failed to read page {}: {}", page_number, e))
}

/// lopdf only ends a line of extracted text at `ET`, so rows laid out with
/// `Td`/`T*` inside one text object run together. Every line move closes and
/// reopens the text object; a move along the same line becomes a space.
/// `'` and `"` are rewritten as `T*` plus `Tj`, which lopdf can read.
///
/// The rewritten stream is for text extraction only and is never rendered.
fn split_text_lines(content: Content) -> Content {
    let mut operations = Vec::with_capacity(content.operations.len());
    let mut shown = false;
    let mut line_y: Option<f32> = None;

    for operation in content.operations {
        match operation.operator.as_str() {
            "BT" => {
                shown = false;
                line_y = None;
                operations.push(operation);
            }
            "Td" | "TD" => {
                let new_line = float_operand(&operation, 1) != 0.0;
                if new_line {
                    line_y = None;
                }
                if shown {
                    if new_line {
                        break_line(&mut operations);
                        shown = false;
                    } else if float_operand(&operation, 0) != 0.0 {
                        operations.push(word_gap());
                    }
                }
                operations.push(operation);
            }
            "T*" => {
                if shown {
                    break_line(&mut operations);
                    shown = false;
                }
                operations.push(operation);
            }
            "Tm" => {
                let y = float_operand(&operation, 5);
                if shown {
                    if line_y == Some(y) {
                        operations.push(word_gap());
                    } else {
                        break_line(&mut operations);
                        shown = false;
                    }
                }
                line_y = Some(y);
                operations.push(operation);
            }
            "'" | "\"" => {
                if shown {
                    break_line(&mut operations);
                }
                let mut operands = operation.operands;
                let shown_text = operands.pop();
                if operation.operator == "\"" && operands.len() == 2 {
                    operations.push(Operation::new("Tw", vec![operands[0].clone()]));
                    operations.push(Operation::new("Tc", vec![operands[1].clone()]));
                }
                operations.push(Operation::new("T*", vec![]));
                if let Some(shown_text) = shown_text {
                    operations.push(Operation::new("Tj", vec![shown_text]));
                }
                shown = true;
            }
            "Tj" | "TJ" => {
                shown = true;
                operations.push(operation);
            }
            _ => operations.push(operation),
        }
    }

    Content { operations }
}

fn float_operand(operation: &Operation, index: usize) -> f32 {
    operation
        .operands
        .get(index)
        .and_then(|operand| operand.as_float().ok())
        .unwrap_or(0.0)
}

fn break_line(operations: &mut Vec<Operation>) {
    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("BT", vec![]));
}

fn word_gap() -> Operation {
    Operation::new("Tj", vec![Object::string_literal(" ")])
}

/// Pretty JSON rendering of an extraction result.
pub fn to_json(result: &DocumentExtractionResult) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENT_ROLL: &str = "\
Rent Roll - Harbor Point Plaza
Property Address: 2100 Harbor Blvd, Costa Mesa, CA
Square Footage: 48,250
Occupancy Rate: 92%
Net Operating Income: $1,245,000
Lease End Date: 12/31/2027
Acme Coffee Co   $4,500.00   Paid rent
Blue Door Dental   ($1,200.50)   Unpaid rent
Summit Fitness LLC   $9,800   Prepaid cam
Square Footage: 51,000
";

    fn extractor() -> DocumentExtractor {
        DocumentExtractor::with_defaults().unwrap()
    }

    #[test]
    fn test_keyword_table_compiles() {
        let table = KeywordTable::new().unwrap();
        assert_eq!(table.rules().len(), KEYWORD_PATTERNS.len());
    }

    #[test]
    fn test_first_match_wins() {
        let result = extractor().extract_text(RENT_ROLL);
        assert_eq!(result.property_details["square_footage"], "48,250");
    }

    #[test]
    fn test_property_details() {
        let result = extractor().extract_text(RENT_ROLL);
        let details = &result.property_details;
        assert_eq!(details["address"], "2100 Harbor Blvd, Costa Mesa, CA");
        assert_eq!(details["occupancy_rate"], "92%");
        assert_eq!(details["net_operating_income"], "1,245,000");
        assert_eq!(details["lease_expiration"], "12/31/2027");
        assert_eq!(details["amount"], "$1,245,000");
        assert_eq!(details["status"], "Paid rent");
        assert!(!details.contains_key("vacancy_rate"));
    }

    #[test]
    fn test_tenant_lines_fill_parallel_lists() {
        let result = extractor().extract_text(RENT_ROLL);
        assert_eq!(result.tenants.len(), 3);
        assert_eq!(result.financial_details.len(), 3);

        assert_eq!(result.tenants[0].tenant_name, "Acme Coffee Co");
        assert_eq!(result.tenants[0].amount, "$4,500.00");
        assert_eq!(result.tenants[0].status, "Paid rent");

        assert_eq!(result.tenants[1].tenant_name, "Blue Door Dental");
        assert_eq!(result.financial_details[1].amount_due, "$1,200.50");
        assert_eq!(result.financial_details[1].payment_status, "Unpaid rent");
    }

    #[test]
    fn test_entities_bucketed_twice() {
        let result = extractor().extract_text(RENT_ROLL);
        let entities = &result.additional_entities;

        assert!(entities["money"].contains(&"$4,500.00".to_string()));
        assert!(entities["monetary_values"].contains(&"$4,500.00".to_string()));
        assert!(entities["monetary_values"].contains(&"92%".to_string()));
        assert!(entities["dates"].contains(&"12/31/2027".to_string()));
        assert!(entities["organizations"]
            .iter()
            .any(|org| org.ends_with("Summit Fitness LLC")));
    }

    #[test]
    fn test_label_buckets_deduplicate() {
        let result = extractor().extract_text("Deposit $500. Late fee $500.");
        assert_eq!(result.additional_entities["money"], vec!["$500".to_string()]);
        assert_eq!(result.additional_entities["monetary_values"].len(), 2);
    }

    #[test]
    fn test_key_value_catch_all() {
        let result = extractor().extract_text("Parking Ratio: 4.0 per 1,000 SF\nZoning: C-2\nZoning: C-3\n");
        let entities = &result.additional_entities;
        assert_eq!(entities["Parking Ratio"], vec!["4.0 per 1,000 SF".to_string()]);
        assert_eq!(
            entities["Zoning"],
            vec!["C-2".to_string(), "C-3".to_string()]
        );
    }

    #[test]
    fn test_empty_text_has_fixed_buckets_only() {
        let result = extractor().extract_text("");
        assert!(result.property_details.is_empty());
        assert!(result.tenants.is_empty());
        assert_eq!(result.additional_entities.len(), 3);
        assert!(result.additional_entities["organizations"].is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = extractor()
            .extract_path(Path::new("/nonexistent/rent_roll.pdf"))
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentError(_)));
    }

    #[test]
    fn test_invalid_pdf_bytes_is_error() {
        let err = extractor().extract_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, AppError::DocumentError(ref msg) if msg.starts_with("Failed to open PDF")));
    }

    fn operators(content: &Content) -> Vec<&str> {
        content
            .operations
            .iter()
            .map(|operation| operation.operator.as_str())
            .collect()
    }

    fn show(text: &str) -> Operation {
        Operation::new("Tj", vec![Object::string_literal(text)])
    }

    #[test]
    fn test_line_moves_close_the_text_object() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                show("Square Footage: 48,250"),
                Operation::new("Td", vec![0.into(), (-14).into()]),
                show("Occupancy Rate: 92%"),
                Operation::new("T*", vec![]),
                show("Zoning: C-2"),
                Operation::new("ET", vec![]),
            ],
        };

        assert_eq!(
            operators(&split_text_lines(content)),
            vec!["BT", "Tf", "Td", "Tj", "ET", "BT", "Td", "Tj", "ET", "BT", "T*", "Tj", "ET"]
        );
    }

    #[test]
    fn test_same_line_moves_become_spaces() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 600.into()]),
                show("Acme Coffee Co"),
                Operation::new("Td", vec![180.into(), 0.into()]),
                show("$4,500.00"),
                Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 400.into(), 600.into()]),
                show("Paid rent"),
                Operation::new("ET", vec![]),
            ],
        };

        let split = split_text_lines(content);
        assert_eq!(
            operators(&split),
            vec!["BT", "Tm", "Tj", "Tj", "Td", "Tj", "Tj", "Tm", "Tj", "ET"]
        );
        assert_eq!(split.operations[3].operands[0], Object::string_literal(" "));
    }

    #[test]
    fn test_quote_operators_become_readable_lines() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                show("Rent Roll"),
                Operation::new("'", vec![Object::string_literal("Zoning: C-2")]),
                Operation::new(
                    "\"",
                    vec![1.into(), 0.into(), Object::string_literal("Parking: 120")],
                ),
                Operation::new("ET", vec![]),
            ],
        };

        let split = split_text_lines(content);
        assert_eq!(
            operators(&split),
            vec!["BT", "Tj", "ET", "BT", "T*", "Tj", "ET", "BT", "Tw", "Tc", "T*", "Tj", "ET"]
        );
        assert_eq!(split.operations[11].operands[0], Object::string_literal("Parking: 120"));
    }

    #[test]
    fn test_moves_before_any_text_are_untouched() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Td", vec![0.into(), (-14).into()]),
                show("Only line"),
                Operation::new("ET", vec![]),
            ],
        };
        assert_eq!(
            operators(&split_text_lines(content)),
            vec!["BT", "Td", "Td", "Tj", "ET"]
        );
    }

    #[test]
    fn test_to_json_round_trips_structure() {
        let result = extractor().extract_text(RENT_ROLL);
        let json = to_json(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["property_details"].is_object());
        assert!(value["tenants"].is_array());
        assert!(value["financial_details"].is_array());
        assert!(value["additional_entities"].is_object());
    }
}
