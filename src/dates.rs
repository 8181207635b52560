use chrono::format::strftime::StrftimeItems;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// IMF-fixdate, as used by `Last-Modified` and friends.
pub fn format_http_date(datetime: DateTime<Utc>) -> String {
    let format = StrftimeItems::new("%a, %d %b %Y %H:%M:%S GMT");
    datetime.format_with_items(format).to_string()
}

/// Parses the date strings Notion hands out: full RFC 3339 timestamps,
/// timestamps without an offset, and bare `YYYY-MM-DD` dates. Values
/// without an offset are taken as UTC.
pub fn parse_post_date(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(date_str) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime.and_utc());
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}
