use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Accepted text layouts for date cells. Precedence is chosen per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `15/03/2025`
    DayMonthYear,
    /// `2025-03-15`
    IsoDate,
    /// `2025-03-15T08:30:00`, `2025-03-15 08:30:00`, or RFC 3339 with offset
    IsoDateTime,
}

/// Smartsheet hands out ISO dates; day-first only as a last resort.
pub const SERVICE_DATE_FORMATS: &[DateFormat] = &[
    DateFormat::IsoDate,
    DateFormat::IsoDateTime,
    DateFormat::DayMonthYear,
];

/// Store workbooks are typed in by hand, day-first.
pub const WORKBOOK_DATE_FORMATS: &[DateFormat] = &[
    DateFormat::DayMonthYear,
    DateFormat::IsoDate,
    DateFormat::IsoDateTime,
];

impl DateFormat {
    /// Parse `s` (already trimmed) to calendar-day precision.
    pub fn parse(self, s: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::DayMonthYear => {
                NaiveDate::parse_from_str(leading_token(s), "%d/%m/%Y").ok()
            }
            DateFormat::IsoDate => NaiveDate::parse_from_str(leading_token(s), "%Y-%m-%d").ok(),
            DateFormat::IsoDateTime => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .map(|dt| dt.date())
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())),
        }
    }
}

/// Try each format in order; first hit wins.
pub fn parse_with(s: &str, formats: &[DateFormat]) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    formats.iter().find_map(|f| f.parse(s))
}

/// The date part of a date-time string: everything before the first space or `T`.
fn leading_token(s: &str) -> &str {
    s.split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_first_source() {
        assert_eq!(parse_with("15/03/2025", WORKBOOK_DATE_FORMATS), Some(ymd(2025, 3, 15)));
        assert_eq!(
            parse_with("15/03/2025 10:00:00", WORKBOOK_DATE_FORMATS),
            Some(ymd(2025, 3, 15))
        );
    }

    #[test]
    fn iso_variants() {
        assert_eq!(parse_with("2025-03-15", SERVICE_DATE_FORMATS), Some(ymd(2025, 3, 15)));
        assert_eq!(
            parse_with("2025-03-15T08:30:00", SERVICE_DATE_FORMATS),
            Some(ymd(2025, 3, 15))
        );
        assert_eq!(
            parse_with("2025-03-15 08:30:00", WORKBOOK_DATE_FORMATS),
            Some(ymd(2025, 3, 15))
        );
        assert_eq!(
            parse_with("2025-12-31T23:30:00Z", &[DateFormat::IsoDateTime]),
            Some(ymd(2025, 12, 31))
        );
    }

    #[test]
    fn precedence_is_per_source() {
        // 03/04/2025 is only valid day-first; both lists end up accepting it,
        // but an ISO-only list must not.
        assert_eq!(parse_with("03/04/2025", SERVICE_DATE_FORMATS), Some(ymd(2025, 4, 3)));
        assert_eq!(parse_with("03/04/2025", &[DateFormat::IsoDate]), None);
    }

    #[test]
    fn garbage_is_absent() {
        assert_eq!(parse_with("", WORKBOOK_DATE_FORMATS), None);
        assert_eq!(parse_with("next week", WORKBOOK_DATE_FORMATS), None);
        assert_eq!(parse_with("31/02/2025", WORKBOOK_DATE_FORMATS), None);
    }
}
