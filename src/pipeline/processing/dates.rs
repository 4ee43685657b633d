use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Formats tried first, in priority order. Month precedes day in both
/// slash forms so `2/3/2003` is always February 3rd.
pub const PRIMARY_DATE_FORMATS: [DateFormat; 3] = [
    DateFormat::DateTime("%m/%d/%Y %H:%M"), // 2/24/2003 0:00
    DateFormat::Date("%m/%d/%Y"),           // 2/24/2003
    DateFormat::Date("%Y-%m-%d"),           // 2003-02-24
];

/// Last-resort formats, tried after every primary format has failed
/// and after RFC 3339 / RFC 2822.
pub const FALLBACK_DATE_FORMATS: [DateFormat; 16] = [
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    DateFormat::DateTime("%Y-%m-%dT%H:%M:%S"),
    DateFormat::DateTime("%Y-%m-%d %H:%M"),
    DateFormat::DateTime("%m/%d/%Y %H:%M:%S"),
    DateFormat::Date("%Y/%m/%d"),
    DateFormat::Date("%d %B %Y"),
    DateFormat::Date("%B %d, %Y"),
    DateFormat::Date("%b %d, %Y"),
    DateFormat::Date("%d %b %Y"),
    DateFormat::Date("%Y%m%d"),
    DateFormat::Date("%Y.%m.%d"),
    DateFormat::Date("%b %d %Y"),
    DateFormat::Date("%B %d %Y"),
    DateFormat::Date("%d-%b-%Y"),
    DateFormat::DateTime("%m/%d/%y %H:%M"), // 2/24/03 0:00
    DateFormat::Date("%m/%d/%y"),
];

/// chrono's `%Y` also matches one or two digit years; a four-digit pattern
/// must not claim them.
const MIN_FULL_YEAR: i32 = 1000;

/// A strftime pattern with or without a time-of-day component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Date(&'static str),
    DateTime(&'static str),
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Date(fmt) | DateFormat::DateTime(fmt) => *fmt,
        }
    }

    pub fn parse(&self, input: &str) -> Option<NaiveDate> {
        let date = match self {
            DateFormat::Date(fmt) => NaiveDate::parse_from_str(input, fmt).ok(),
            DateFormat::DateTime(fmt) => NaiveDateTime::parse_from_str(input, fmt)
                .ok()
                .map(|dt| dt.date()),
        }?;
        if self.pattern().contains("%Y") && date.year() < MIN_FULL_YEAR {
            return None;
        }
        Some(date)
    }
}

/// Parse an order date with the fixed cascade: primary formats in order,
/// then the generic fallback. `None` means the value is unparseable.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let input = value.trim();
    if input.is_empty() {
        return None;
    }

    PRIMARY_DATE_FORMATS
        .iter()
        .find_map(|fmt| fmt.parse(input))
        .or_else(|| parse_generic(input))
}

/// Generic parse for values none of the primary formats accept
fn parse_generic(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATE_FORMATS.iter().find_map(|fmt| fmt.parse(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_primary_formats() {
        assert_eq!(parse_order_date("2/24/2003 0:00"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("12/1/2004 13:45"), Some(ymd(2004, 12, 1)));
        assert_eq!(parse_order_date("2/24/2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("2003-02-24"), Some(ymd(2003, 2, 24)));
    }

    #[test]
    fn slash_dates_are_month_first() {
        assert_eq!(parse_order_date("2/3/2003"), Some(ymd(2003, 2, 3)));
        // No month 24, and the day-first reading is never attempted
        assert_eq!(parse_order_date("24/2/2003"), None);
    }

    #[test]
    fn falls_back_to_generic_formats() {
        assert_eq!(parse_order_date("2003-02-24T10:15:00Z"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("2003-02-24 10:15:00"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("2003/02/24"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("February 24, 2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("24 Feb 2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("Feb 24 2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("February 24 2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("24-Feb-2003"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("2003.02.24"), Some(ymd(2003, 2, 24)));
    }

    #[test]
    fn two_digit_years_are_not_read_as_four_digit() {
        assert_eq!(parse_order_date("2/24/03 0:00"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("2/24/03"), Some(ymd(2003, 2, 24)));
        assert_eq!(parse_order_date("12/1/99"), Some(ymd(1999, 12, 1)));
        assert_eq!(DateFormat::Date("%m/%d/%Y").parse("2/24/03"), None);
        assert_eq!(DateFormat::Date("%Y-%m-%d").parse("3-02-24"), None);
    }

    #[test]
    fn rejects_unparseable_values() {
        assert_eq!(parse_order_date("not-a-date"), None);
        assert_eq!(parse_order_date(""), None);
        assert_eq!(parse_order_date("   "), None);
        assert_eq!(parse_order_date("2/30/2003"), None);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_order_date("  2/24/2003 0:00 "), Some(ymd(2003, 2, 24)));
    }
}
