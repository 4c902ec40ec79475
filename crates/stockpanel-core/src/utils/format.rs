use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Placeholder shown for absent or unreadable values.
pub const EMPTY: &str = "-";

/// Product descriptions and remarks are cut to this many characters in
/// the products table.
pub const TABLE_TEXT_LIMIT: usize = 60;

/// Parse the timestamp shapes the backend produces. Values with an offset
/// are converted to local time.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format a timestamp as `YYYY-MM-DD HH:MM`.
pub fn format_datetime(value: Option<&str>) -> String {
    value
        .and_then(parse_timestamp)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}

/// Format a date as `DD/MM/YYYY`, keeping the calendar day as written.
pub fn format_report_date(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return EMPTY.to_string();
    };
    let date = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()));
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}

/// Prefix an amount with the currency marker.
pub fn format_currency(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => format!("Rs. {}", v),
        _ => EMPTY.to_string(),
    }
}

/// Cut text to `max_chars` characters, marking the cut with `…`.
pub fn truncate_text(value: Option<&str>, max_chars: usize) -> String {
    let Some(text) = value.filter(|t| !t.is_empty()) else {
        return EMPTY.to_string();
    };
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

/// Keep only ASCII digits from typed quantity input.
pub fn sanitize_quantity(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}
