/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use cre_signals_api::census::rows_to_records;
use cre_signals_api::document::DocumentExtractor;
use cre_signals_api::http_client::RetryPolicy;
use cre_signals_api::listing::listing_url;
use cre_signals_api::models::required_param;
use proptest::prelude::*;
use serde_json::Value;
use std::time::Duration;

// Property: census rows map onto the header row one to one
proptest! {
    #[test]
    fn census_records_align_with_headers(
        headers in prop::collection::vec("[A-Z_0-9]{1,8}", 1..6),
        rows in prop::collection::vec(prop::collection::vec("[a-z0-9]{0,6}", 0..8), 1..5)
    ) {
        let mut table: Vec<Vec<Value>> = vec![headers.iter().cloned().map(Value::String).collect()];
        table.extend(rows.iter().map(|row| row.iter().cloned().map(Value::String).collect()));

        let records = rows_to_records(&table).expect("data rows present");
        prop_assert_eq!(records.len(), rows.len());

        for (record, row) in records.iter().zip(&rows) {
            for (i, header) in headers.iter().enumerate() {
                // Later duplicate headers overwrite earlier ones
                if headers[i + 1..].contains(header) {
                    continue;
                }
                let expected = row.get(i).cloned().map(Value::String).unwrap_or(Value::Null);
                prop_assert_eq!(&record[header], &expected);
            }
        }
    }

    #[test]
    fn census_header_only_is_none(headers in prop::collection::vec("[A-Z]{1,8}", 0..6)) {
        let table = vec![headers.into_iter().map(Value::String).collect::<Vec<_>>()];
        prop_assert!(rows_to_records(&table).is_none());
    }
}

// Property: document extraction never panics and keeps its lists parallel
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn extraction_never_panics(text in "\\PC{0,400}") {
        let extractor = DocumentExtractor::with_defaults().unwrap();
        let result = extractor.extract_text(&text);
        prop_assert_eq!(result.tenants.len(), result.financial_details.len());
        prop_assert!(result.additional_entities.contains_key("organizations"));
        prop_assert!(result.additional_entities.contains_key("dates"));
        prop_assert!(result.additional_entities.contains_key("monetary_values"));
    }

    #[test]
    fn first_square_footage_wins(first in 1u32..1_000_000, second in 1u32..1_000_000) {
        let extractor = DocumentExtractor::with_defaults().unwrap();
        let text = format!("Square Footage: {}\nSquare Footage: {}\n", first, second);
        let result = extractor.extract_text(&text);
        prop_assert_eq!(&result.property_details["square_footage"], &first.to_string());
    }

    #[test]
    fn tenant_lines_are_captured(
        name in "[A-Z][a-z]{2,10}( [A-Z][a-z]{2,10}){0,2}",
        dollars in 1u32..100_000,
        cents in 0u32..100
    ) {
        let extractor = DocumentExtractor::with_defaults().unwrap();
        let amount = format!("${}.{:02}", dollars, cents);
        let text = format!("{}   {}   Unpaid rent\n", name, amount);
        let result = extractor.extract_text(&text);

        prop_assert_eq!(result.tenants.len(), 1);
        prop_assert_eq!(&result.tenants[0].tenant_name, &name);
        prop_assert_eq!(&result.tenants[0].amount, &amount);
        prop_assert_eq!(&result.financial_details[0].payment_status, "Unpaid rent");
    }
}

// Property: request helpers
proptest! {
    #[test]
    fn blank_parameters_are_missing(spaces in "[ \\t]{0,10}") {
        prop_assert_eq!(required_param(Some(&spaces)), None);
    }

    #[test]
    fn listing_url_never_contains_spaces(location in "[A-Za-z0-9 ,]{1,40}") {
        let url = listing_url("https://www.zillow.com", &location).unwrap();
        prop_assert!(url.path().starts_with("/homes/"));
        prop_assert!(url.path().ends_with("_rb/"));
        prop_assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn backoff_is_non_decreasing(base_ms in 1u64..1_000, attempt in 0u32..10) {
        let policy = RetryPolicy { max_retries: 10, base_backoff: Duration::from_millis(base_ms) };
        prop_assert!(policy.backoff(attempt + 1) >= policy.backoff(attempt));
    }
}
