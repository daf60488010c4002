//! Small helpers over `scraper` shared by the page adapters.

use crate::errors::AppError;
use scraper::{ElementRef, Selector};

pub fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ParseError(format!("invalid selector '{}': {:?}", css, e)))
}

/// Concatenated text of an element with surrounding whitespace trimmed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first descendant matching `selector`, if non-empty.
pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
}

/// Attribute of the first descendant matching `selector` that carries it.
pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
