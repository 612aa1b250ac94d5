//! Filter parsing
//!
//! Parses JSON filter definitions into Filter structs with validation.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::types::Filter;

/// Maximum size of filter JSON in bytes (64KB)
const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of filters allowed
const MAX_FILTERS: usize = 50;

#[derive(Error, Debug)]
pub enum FilterParseError {
    #[error("Filter JSON exceeds maximum size of {max} bytes")]
    TooLarge { max: usize },

    #[error("Invalid filter JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Maximum {max} filters allowed")]
    TooMany { max: usize },

    #[error("Invalid filter attribute `{0}`")]
    InvalidAttribute(String),
}

fn attribute_regex() -> &'static Regex {
    static RE_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    RE_ATTRIBUTE.get_or_init(|| Regex::new(r"^\w+(\.\w+)*$").expect("Invalid regex"))
}

/// Parse filters from a JSON array
///
/// Validates JSON size and filter count, and rejects attribute paths that
/// are not plain dot-separated identifiers.
pub fn parse_filters(json_str: &str) -> Result<Vec<Filter>, FilterParseError> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterParseError::TooLarge {
            max: MAX_FILTER_JSON_SIZE,
        });
    }

    let filters: Vec<Filter> = serde_json::from_str(json_str)?;

    if filters.len() > MAX_FILTERS {
        return Err(FilterParseError::TooMany { max: MAX_FILTERS });
    }

    for filter in &filters {
        if !attribute_regex().is_match(filter.attribute()) {
            return Err(FilterParseError::InvalidAttribute(
                filter.attribute().to_string(),
            ));
        }
    }

    Ok(filters)
}
