// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// analytics modules can assume clean, typed values.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (spaces, text).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters, which also covers
///   textual placeholders such as `nan` or `None`.
/// - Rejects commas: `"1,5"` may be a decimal comma or a thousands group, so
///   it counts as missing rather than as 15.
/// - Returns `None` for anything that cannot be safely parsed or is not finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if s.contains(',') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%b-%y"];

/// Parse a timestamp column. Date-only values resolve to midnight so that a
/// window bound like `2024-05-31` excludes later times on that day.
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Blank in the CSV sense: empty after trimming, or a textual null that a
/// numeric-to-string coercion left behind.
pub fn is_blank(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case("nan")
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Round to two decimals, the precision every published metric uses. Ties on
/// the scaled value go to the even neighbour, so a mean of 10.125 gives 10.12.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// Integer score from a 0-5 index or a 0-100 average. Ties go to the even
/// neighbour so 2.5 scores 2 and 3.5 scores 4.
pub fn round_score(v: f64) -> i64 {
    v.round_ties_even() as i64
}

/// `12.3456` -> `"12.35%"`.
pub fn format_percent(v: f64) -> String {
    format!("{:.2}%", v)
}

/// Reads back a value produced by `format_percent`.
pub fn parse_percent(s: &str) -> f64 {
    s.trim_end_matches('%').parse::<f64>().unwrap_or(0.0)
}

/// Minutes rendered as `H:MM`, e.g. `135.0` -> `"2:15"`.
pub fn minutes_to_hhmm(minutes: f64) -> String {
    if !minutes.is_finite() || minutes == 0.0 {
        return "0:00".to_string();
    }
    let hours = (minutes / 60.0).floor() as i64;
    let mins = (minutes % 60.0).floor() as i64;
    format!("{}:{:02}", hours, mins)
}

/// Minutes rendered as `H:MM:SS`, e.g. `45.5` -> `"0:45:30"`.
pub fn minutes_to_hhmmss(minutes: f64) -> String {
    if !minutes.is_finite() || minutes == 0.0 {
        return "0:00:00".to_string();
    }
    let hours = (minutes / 60.0).floor() as i64;
    let mins = (minutes % 60.0).floor() as i64;
    let secs = ((minutes % 1.0) * 60.0).floor() as i64;
    format!("{}:{:02}:{:02}", hours, mins, secs)
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"));

/// Column header to snake_case: `"Machine Status"` -> `machine_status`,
/// `"YearsExperience"` -> `years_experience`, `"SO Area / CE Area"` ->
/// `so_area_ce_area`.
pub fn to_snake(s: &str) -> String {
    let s = s.trim();
    let s = NON_WORD.replace_all(s, "");
    let s = WHITESPACE.replace_all(&s, "_");
    let s = CAMEL_BOUNDARY.replace_all(&s, "${1}_${2}");
    s.to_lowercase()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
