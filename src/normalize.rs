//! Area-group name correction.
//!
//! Area groups are typed by hand in the source spreadsheets, so the same
//! area shows up as `jakarat 2`, `BAndung`, `semarang` and so on. Every read
//! path runs `area_group` through [`normalize_area_group`] before grouping.

use once_cell::sync::Lazy;
use regex::Regex;

/// Stands in for blank cells and numeric-coercion leftovers (`nan`, `0`).
pub const UNKNOWN_AREA: &str = "Unknown";

const PLACEHOLDERS: &[&str] = &["", "nan", "none", "null", "0", "0.0"];

/// Lowercase misspelling (or lowercase form) -> canonical spelling. Order
/// matters: the first matching prefix wins.
const CITY_CORRECTIONS: &[(&str, &str)] = &[
    ("semarang", "Semarang"),
    ("bandung", "Bandung"),
    ("padang", "Padang"),
    ("depok", "Depok"),
    ("medan", "Medan"),
    ("solo", "Solo"),
    ("yogyakarta", "Yogyakarta"),
    ("kendari", "Kendari"),
    ("bali", "Bali"),
    ("jakarat 3", "Jakarta 3"),
    ("jakarat 2", "Jakarta 2"),
    ("jakarat 1", "Jakarta 1"),
];

static JAKARAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)jakarat").expect("static regex"));
static JAKARTAA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)jakartaa").expect("static regex"));

/// Normalize an area group name. Idempotent: feeding the output back in
/// returns it unchanged.
pub fn normalize_area_group(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    if PLACEHOLDERS.contains(&lower.as_str()) {
        return UNKNOWN_AREA.to_string();
    }

    let mut name = trimmed.to_string();
    if lower.contains("jakarat") && !lower.contains("jakarta") {
        name = JAKARAT.replace_all(&name, "Jakarta").into_owned();
        name = JAKARTAA.replace_all(&name, "Jakarta").into_owned();
    }
    for (wrong, correct) in CITY_CORRECTIONS {
        if name.eq_ignore_ascii_case(wrong) {
            return (*correct).to_string();
        }
        // Compared byte for byte so the suffix split is always the matched length.
        let prefix_matches = name
            .get(..wrong.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(wrong));
        if prefix_matches {
            return format!("{}{}", correct, &name[wrong.len()..]);
        }
    }

    capitalize_first_word(&name)
}

/// Multi-word names: `"bandar lampung"` -> `"Bandar lampung"`, but only when
/// the first word is entirely lowercase. A single word gets its first letter
/// raised whenever it is lowercase, so `"dKI"` -> `"DKI"`.
fn capitalize_first_word(name: &str) -> String {
    let eligible = match name.find(' ') {
        Some(idx) if idx > 0 => {
            let first = &name[..idx];
            first.chars().any(char::is_lowercase) && !first.chars().any(char::is_uppercase)
        }
        _ => true,
    };
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if eligible && c.is_lowercase() => {
            format!("{}{}", c.to_uppercase(), chars.as_str())
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_become_unknown() {
        for raw in ["", "  ", "nan", "NaN", "0", "0.0", "None"] {
            assert_eq!(normalize_area_group(raw), UNKNOWN_AREA, "input {:?}", raw);
        }
    }

    #[test]
    fn test_jakarta_typo_family() {
        assert_eq!(normalize_area_group("Jakarat 2"), "Jakarta 2");
        assert_eq!(normalize_area_group("jakarat 3"), "Jakarta 3");
        assert_eq!(normalize_area_group("JAKARAT 1"), "Jakarta 1");
        assert_eq!(normalize_area_group("Jakarata 1"), "Jakarta 1");
        assert_eq!(normalize_area_group("Jakarta 2"), "Jakarta 2");
    }

    #[test]
    fn test_city_corrections_keep_suffix() {
        assert_eq!(normalize_area_group("BAndung"), "Bandung");
        assert_eq!(normalize_area_group("bandung 2"), "Bandung 2");
        assert_eq!(normalize_area_group("SEMARANG"), "Semarang");
        assert_eq!(normalize_area_group("medan Barat"), "Medan Barat");
        assert_eq!(normalize_area_group(" yogyakarta "), "Yogyakarta");
    }

    #[test]
    fn test_capitalizes_first_word_only() {
        assert_eq!(normalize_area_group("surabaya timur"), "Surabaya timur");
        assert_eq!(normalize_area_group("makassar"), "Makassar");
        assert_eq!(normalize_area_group("dKI barat"), "dKI barat");
        assert_eq!(normalize_area_group("Palembang"), "Palembang");
    }

    #[test]
    fn test_single_word_raises_lowercase_initial() {
        assert_eq!(normalize_area_group("dKI"), "DKI");
        assert_eq!(normalize_area_group("aceh"), "Aceh");
        assert_eq!(normalize_area_group("bSD"), "BSD");
        assert_eq!(normalize_area_group("DKI"), "DKI");
    }

    #[test]
    fn test_non_ascii_prefix_is_not_a_correction() {
        // KELVIN SIGN lowercases to an ASCII `k` but is three bytes wide.
        assert_eq!(normalize_area_group("\u{212A}endari"), "\u{212A}endari");
        assert_eq!(normalize_area_group("\u{212A}endari 2"), "\u{212A}endari 2");
        assert_eq!(normalize_area_group("KENDARI 2"), "Kendari 2");
    }

    #[test]
    fn test_idempotent_over_samples() {
        let samples = [
            "",
            "nan",
            "0",
            "NULL",
            "Jakarat 2",
            "jakarat 3",
            "Jakarata 1",
            "jakarta 1",
            "Jakarta 2",
            "BAndung",
            "bandung 2",
            "Bandung",
            "semarang",
            "SOLO",
            "solok",
            "bali",
            "Balikpapan",
            "kendari 1",
            "padang panjang",
            "depok",
            "Medan",
            "surabaya timur",
            "Makassar",
            "123",
            "  yogyakarta  ",
            "über stadt",
            "dKI",
            "\u{212A}endari",
        ];
        for raw in samples {
            let once = normalize_area_group(raw);
            let twice = normalize_area_group(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }
}
