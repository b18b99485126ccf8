//! Display formatting for listings and exports. All functions are total:
//! missing or unusable input yields an empty string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const MAX_FRACTION_DIGITS: usize = 3;

/// Thousands-grouped number, up to three fraction digits (`1234567` -> `1,234,567`).
pub fn format_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return String::new();
    };

    let rendered = format!("{:.*}", MAX_FRACTION_DIGITS, value);
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if is_zero { "" } else { sign };

    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

pub fn format_percentage(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => format!("{value:.decimals$}%"),
        None => String::new(),
    }
}

/// `Jan 5, 2026` style date. Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD`; anything else renders empty.
pub fn format_date_for_export(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(parse_date)
        .map(format_date)
        .unwrap_or_default()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
