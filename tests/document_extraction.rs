/// PDF extraction against a generated rent roll
mod common;

use common::{rent_roll_pdf, RENT_ROLL_PAGES};
use cre_signals_api::document::{pdf_text, DocumentExtractor};
use tempfile::TempDir;

#[test]
fn test_page_text_keeps_line_breaks_in_page_order() {
    let document = lopdf::Document::load_mem(&rent_roll_pdf()).unwrap();
    let text = pdf_text(document).unwrap();

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let expected: Vec<&str> = RENT_ROLL_PAGES.iter().flat_map(|page| page.iter().copied()).collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_extract_bytes_reads_fields_from_every_page() {
    let extractor = DocumentExtractor::with_defaults().unwrap();
    let result = extractor.extract_bytes(&rent_roll_pdf()).unwrap();

    // First page wins for repeated labels
    assert_eq!(result.property_details["square_footage"], "48,250");
    assert_eq!(result.property_details["occupancy_rate"], "92%");
    assert_eq!(result.property_details["lease_expiration"], "12/31/2027");

    assert_eq!(result.tenants.len(), 1);
    assert_eq!(result.tenants[0].tenant_name, "Acme Coffee Co");
    assert_eq!(result.tenants[0].amount, "$4,500.00");
    assert_eq!(result.tenants[0].status, "Paid rent");
    assert_eq!(result.financial_details.len(), 1);
    assert_eq!(result.financial_details[0].payment_status, "Paid rent");
}

#[test]
fn test_extract_path_matches_extract_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rent_roll.pdf");
    std::fs::write(&path, rent_roll_pdf()).unwrap();

    let extractor = DocumentExtractor::with_defaults().unwrap();
    let from_path = extractor.extract_path(&path).unwrap();
    let from_bytes = extractor.extract_bytes(&rent_roll_pdf()).unwrap();

    assert_eq!(from_path, from_bytes);
    assert_eq!(from_path.tenants[0].tenant_name, "Acme Coffee Co");
}
