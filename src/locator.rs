use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ExtractionError;

lazy_static! {
    static ref DATABASE_ID: Regex = Regex::new(r"([a-f0-9]{32})(?:[?#]|$)").unwrap();
}

/// Pulls the database id out of a Notion URL.
///
/// The id is the leftmost run of 32 lowercase hex digits that ends the
/// string or is followed by `?` or `#`. For a longer hex run this picks the
/// trailing 32 digits.
pub fn extract_database_id(locator: &str) -> Result<String, ExtractionError> {
    DATABASE_ID
        .captures(locator)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| ExtractionError {
            locator: locator.to_string(),
        })
}
