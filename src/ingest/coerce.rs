//! Scalar coercion for the water-quality export.
//!
//! The export is written with German locale conventions: decimal commas,
//! dotted dates (`DD.MM.YYYY HH:mm:ss`) and censored lab values such as
//! `"<0,05"` (below detection limit). Nothing here fails: a value that cannot
//! be read becomes `None` and the caller records it as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A single spreadsheet cell before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Number(f64),
    Text(String),
}

impl RawCell {
    /// True when the cell carries no content at all (whitespace counts as none).
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Number(_) => false,
            RawCell::Text(text) => text.trim().is_empty(),
        }
    }

    /// True for the values a datetime column treats as "no timestamp":
    /// empty cells, empty text, zero and NaN.
    pub fn is_falsy(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Number(n) => *n == 0.0 || n.is_nan(),
            RawCell::Text(text) => text.is_empty(),
        }
    }

    /// Text form of the cell as the export would display it.
    pub fn to_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Text(text) => text.clone(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(text: &str) -> Self {
        RawCell::Text(text.to_string())
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        RawCell::Number(n)
    }
}

// Integral floats print without a fractional part, like the export shows them.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerces a cell to a number.
///
/// - empty cells and empty text are absent
/// - numbers pass through unchanged (NaN and infinities are absent)
/// - a leading `<` marks a censored value; the bound itself is returned
/// - the first `,` is read as a decimal point
/// - the numeric prefix is parsed and trailing text ignored (`"7,2 mg"` → 7.2)
pub fn parse_numeric(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Empty => None,
        RawCell::Number(n) => n.is_finite().then_some(*n),
        RawCell::Text(text) => parse_numeric_text(text),
    }
}

/// Text half of [`parse_numeric`].
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }

    let trimmed = text.trim();
    let bound = trimmed.strip_prefix('<').unwrap_or(trimmed);
    let normalized = bound.replacen(',', ".", 1);

    leading_float(&normalized).filter(|n| n.is_finite())
}

/// Parses the longest decimal-number prefix of `text`, after leading whitespace.
///
/// Accepts an optional sign, digits with an optional fraction, and an
/// optional exponent. Returns `None` when no digit is found.
pub(crate) fn leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Parses the longest base-10 integer prefix of `text`, after leading whitespace.
pub(crate) fn leading_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digit_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digit_start {
        return None;
    }

    s[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses an export timestamp.
///
/// The export writes `DD.MM.YYYY HH:mm:ss` with no zone; the result is the
/// naive wall-clock time. Text containing `T` is read as ISO 8601 instead,
/// with offset-bearing forms converted to UTC wall time.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if text.contains('T') {
        return parse_iso(text);
    }

    let mut parts = text.trim().split(' ');
    let (date_part, time_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), None) => (date, time),
        _ => return None,
    };

    let date = parse_dotted_date(date_part)?;
    let [hour, minute, second] = split_components(time_part, ':')?;

    date.and_hms_opt(
        u32::try_from(hour).ok()?,
        u32::try_from(minute).ok()?,
        u32::try_from(second).ok()?,
    )
}

/// Parses a bare `DD.MM.YYYY` date, or the date part of a full timestamp.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.trim().contains(' ') || text.contains('T') {
        return parse_timestamp(text).map(|ts| ts.date());
    }
    parse_dotted_date(text.trim())
}

/// Canonical ISO form, millisecond precision with a `Z` suffix.
pub fn to_iso_string(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn parse_dotted_date(text: &str) -> Option<NaiveDate> {
    let [day, month, year] = split_components(text, '.')?;
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )
}

fn split_components(text: &str, separator: char) -> Option<[i64; 3]> {
    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() != 3 {
        return None;
    }
    Some([
        leading_int(parts[0])?,
        leading_int(parts[1])?,
        leading_int(parts[2])?,
    ])
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ISO_NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::from(s)
    }

    // --- Numeric coercion ---

    #[test]
    fn test_empty_and_blank_are_absent() {
        assert_eq!(parse_numeric(&RawCell::Empty), None);
        assert_eq!(parse_numeric(&text("")), None);
        assert_eq!(parse_numeric(&text("   ")), None);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(parse_numeric(&RawCell::Number(8.1)), Some(8.1));
        assert_eq!(parse_numeric(&RawCell::Number(0.0)), Some(0.0));
        assert_eq!(parse_numeric(&RawCell::Number(-3.5)), Some(-3.5));
        assert_eq!(parse_numeric(&RawCell::Number(f64::NAN)), None);
        assert_eq!(parse_numeric(&RawCell::Number(f64::INFINITY)), None);
    }

    #[test]
    fn test_censored_value_returns_bound() {
        assert_eq!(parse_numeric(&text("<0,05")), Some(0.05));
        assert_eq!(parse_numeric(&text("<30")), Some(30.0));
        assert_eq!(parse_numeric(&text("  <1,5 ")), Some(1.5));
        assert_eq!(
            parse_numeric(&text("<0,05")),
            parse_numeric(&text("0,05")),
            "censored and uncensored text must coerce identically"
        );
    }

    #[test]
    fn test_decimal_comma_equals_decimal_point() {
        for (comma, point) in [("8,1", "8.1"), ("12,75", "12.75"), ("-0,3", "-0.3"), ("451", "451")] {
            assert_eq!(
                parse_numeric(&text(comma)),
                parse_numeric(&text(point)),
                "{} and {} should coerce to the same value",
                comma,
                point
            );
        }
    }

    #[test]
    fn test_only_first_comma_is_normalized() {
        // "1,234,5" → "1.234,5" → numeric prefix 1.234
        assert_eq!(parse_numeric(&text("1,234,5")), Some(1.234));
    }

    #[test]
    fn test_trailing_garbage_after_prefix_is_ignored() {
        assert_eq!(parse_numeric(&text("7,2 mg/l")), Some(7.2));
        assert_eq!(parse_numeric(&text("12abc")), Some(12.0));
        assert_eq!(parse_numeric(&text("1e3")), Some(1000.0));
        assert_eq!(parse_numeric(&text("5.")), Some(5.0));
        assert_eq!(parse_numeric(&text(".5")), Some(0.5));
    }

    #[test]
    fn test_unparseable_is_absent() {
        for garbage in ["abc", "-", ".", "<", "n.a.", "--", "e5"] {
            assert_eq!(
                parse_numeric(&text(garbage)),
                None,
                "{:?} should not coerce to a number",
                garbage
            );
        }
    }

    #[test]
    fn test_leading_int_prefix() {
        assert_eq!(leading_int("51"), Some(51));
        assert_eq!(leading_int(" 08abc"), Some(8));
        assert_eq!(leading_int("-13"), Some(-13));
        assert_eq!(leading_int("3.7"), Some(3));
        assert_eq!(leading_int("x1"), None);
        assert_eq!(leading_int(""), None);
    }

    // --- Timestamps ---

    #[test]
    fn test_parse_dotted_timestamp() {
        let ts = parse_timestamp("02.08.2025 00:10:00").expect("should parse");
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2025, 8, 2)
                .unwrap()
                .and_hms_opt(0, 10, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_malformed_dotted_timestamps_are_invalid() {
        for bad in [
            "02.08.2025",
            "02.08.2025 00:10",
            "02-08-2025 00:10:00",
            "02.08.2025  00:10:00",
            "02.08.2025 00:10:00 extra",
            "xx.08.2025 00:10:00",
            "",
        ] {
            assert_eq!(parse_timestamp(bad), None, "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_calendar_invalid_timestamps_are_rejected() {
        assert_eq!(parse_timestamp("02.13.2025 00:10:00"), None, "month 13");
        assert_eq!(parse_timestamp("31.02.2025 00:10:00"), None, "Feb 31st");
        assert_eq!(parse_timestamp("02.08.2025 25:00:00"), None, "hour 25");
    }

    #[test]
    fn test_iso_timestamps_are_routed_to_iso_parser() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 2)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2025-08-02T08:15:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-02T10:15:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-02T08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-02T08:15:00.000"), Some(expected));
        assert_eq!(parse_timestamp("not a Timestamp"), None);
    }

    #[test]
    fn test_iso_string_round_trip() {
        for text in ["02.08.2025 00:10:00", "29.02.2024 23:59:59", "01.01.1999 12:00:00"] {
            let ts = parse_timestamp(text).unwrap();
            let iso = to_iso_string(&ts);
            assert!(iso.ends_with(".000Z"), "unexpected ISO form: {}", iso);
            assert_eq!(parse_timestamp(&iso), Some(ts), "round trip of {}", text);
        }
    }

    #[test]
    fn test_parse_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        assert_eq!(parse_date("02.08.2025"), Some(expected));
        assert_eq!(parse_date("02.08.2025 13:40:00"), Some(expected));
        assert_eq!(parse_date("2.8.2025"), Some(expected));
        assert_eq!(parse_date("02/08/2025"), None);
    }

    // --- Cells ---

    #[test]
    fn test_falsy_datetime_cells() {
        assert!(RawCell::Empty.is_falsy());
        assert!(text("").is_falsy());
        assert!(RawCell::Number(0.0).is_falsy());
        assert!(!text(" ").is_falsy(), "whitespace text is a (bad) timestamp, not empty");
        assert!(!RawCell::Number(45871.0).is_falsy());
    }

    #[test]
    fn test_number_cells_render_like_the_export() {
        assert_eq!(RawCell::Number(45871.0).to_text(), "45871");
        assert_eq!(RawCell::Number(0.25).to_text(), "0.25");
        assert_eq!(text("02.08.2025 00:10:00").to_text(), "02.08.2025 00:10:00");
    }
}
