// src/process/normalize.rs
//
// Cell coercion. Nothing in here fails: malformed input degrades to a
// default and is logged at debug level.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::date_parser::{self, DateFormat};
use crate::schema::RawValue;

static CURRENCY_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SAR|USD").expect("currency token pattern is valid"));

/// Trimmed text, or `None` for blanks and the spreadsheet placeholders
/// `"0"` and `"nan"`.
pub fn clean_text(value: &RawValue) -> Option<String> {
    let text = match value {
        RawValue::Empty => return None,
        RawValue::Text(s) => s.trim().to_string(),
        RawValue::Number(n) => number_text(*n),
        RawValue::Bool(b) => b.to_string(),
        RawValue::DateTime(dt) => dt.date().format("%Y-%m-%d").to_string(),
    };
    if text.is_empty() || text == "0" || text.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(text)
    }
}

/// Lenient numeric coercion; anything unparseable is `0.0`.
pub fn parse_number(value: &RawValue) -> f64 {
    match value {
        RawValue::Number(n) if n.is_finite() => *n,
        RawValue::Text(s) => {
            let stripped = CURRENCY_TOKENS.replace_all(s, "");
            let cleaned: String = stripped
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return 0.0;
            }
            match cleaned.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => {
                    debug!(raw = %s, "unparseable number, using 0");
                    0.0
                }
            }
        }
        _ => 0.0,
    }
}

/// Number where zero means "not filled in".
pub fn parse_nonzero(value: &RawValue) -> Option<f64> {
    let n = parse_number(value);
    (n != 0.0).then_some(n)
}

/// Calendar day from a native date-time or from text in one of `formats`.
pub fn parse_date(value: &RawValue, formats: &[DateFormat]) -> Option<NaiveDate> {
    match value {
        RawValue::DateTime(dt) => Some(dt.date()),
        RawValue::Text(s) => {
            let parsed = date_parser::parse_with(s, formats);
            if parsed.is_none() && !s.trim().is_empty() {
                debug!(raw = %s, "unrecognised date, treating as absent");
            }
            parsed
        }
        _ => None,
    }
}

/// ISO `YYYY-MM-DD` rendering used in every output document.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}

/// Render a number the way a spreadsheet shows it: integral values without
/// a fractional part.
pub fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::date_parser::{SERVICE_DATE_FORMATS, WORKBOOK_DATE_FORMATS};
    use chrono::NaiveDateTime;

    #[test]
    fn text_placeholders_are_absent() {
        assert_eq!(clean_text(&"  Riyadh Store ".into()), Some("Riyadh Store".into()));
        assert_eq!(clean_text(&"".into()), None);
        assert_eq!(clean_text(&"   ".into()), None);
        assert_eq!(clean_text(&"0".into()), None);
        assert_eq!(clean_text(&"NaN".into()), None);
        assert_eq!(clean_text(&"nan".into()), None);
        assert_eq!(clean_text(&RawValue::Empty), None);
    }

    #[test]
    fn numeric_cells_render_as_text() {
        assert_eq!(clean_text(&RawValue::Number(1042.0)), Some("1042".into()));
        assert_eq!(clean_text(&RawValue::Number(2.5)), Some("2.5".into()));
        assert_eq!(clean_text(&RawValue::Number(0.0)), None);
    }

    #[test]
    fn currency_amounts_parse() {
        assert_eq!(parse_number(&"1,234.50 SAR".into()), 1234.5);
        assert_eq!(parse_number(&"USD 99".into()), 99.0);
        assert_eq!(parse_number(&" 7 ".into()), 7.0);
        assert_eq!(parse_number(&RawValue::Number(12.25)), 12.25);
    }

    #[test]
    fn malformed_numbers_fall_back_to_zero() {
        assert_eq!(parse_number(&"n/a".into()), 0.0);
        assert_eq!(parse_number(&"nan".into()), 0.0);
        assert_eq!(parse_number(&"inf".into()), 0.0);
        assert_eq!(parse_number(&RawValue::Empty), 0.0);
        assert_eq!(parse_number(&RawValue::Bool(true)), 0.0);
        assert_eq!(parse_nonzero(&"0".into()), None);
        assert_eq!(parse_nonzero(&"12".into()), Some(12.0));
    }

    #[test]
    fn day_first_date_string() {
        let d = parse_date(&"15/03/2025".into(), WORKBOOK_DATE_FORMATS).unwrap();
        assert_eq!(iso_date(d), "2025-03-15");
    }

    #[test]
    fn native_datetime_truncates_to_day() {
        let dt = NaiveDateTime::parse_from_str("2025-10-02 17:45:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let d = parse_date(&dt.into(), SERVICE_DATE_FORMATS).unwrap();
        assert_eq!(iso_date(d), "2025-10-02");
        assert_eq!(parse_date(&RawValue::Number(45000.0), SERVICE_DATE_FORMATS), None);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(100.0 / 3.0, 1), 33.3);
        assert_eq!(round_to(2.0 / 3.0 * 100.0, 1), 66.7);
        assert_eq!(round_to(1234.5678, 2), 1234.57);
    }
}
