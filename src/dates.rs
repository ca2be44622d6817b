//! Publication date normalisation.
//!
//! Listing pages spell dates in several ways (`2024-10-18`,
//! `2024-10-18T09:30:00Z`, `October 18, 2024`, `18 Oct 2024`, ...). All of them
//! collapse to a [`NaiveDate`]; anything unparseable becomes `None`, which
//! callers store as a missing date.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

/// Date-only patterns, tried in order.
const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parse free-form date text into a calendar date.
///
/// Time and zone suffixes are dropped first: anything after `+`, a trailing
/// `Z`, and anything after the `T` separator.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tech_trends_scraper::dates::normalize_date;
///
/// let expected = NaiveDate::from_ymd_opt(2024, 10, 18);
/// assert_eq!(normalize_date("Oct 18, 2024"), expected);
/// assert_eq!(normalize_date("2024-10-18T07:15:00+00:00"), expected);
/// assert_eq!(normalize_date("not a date"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let without_offset = raw.split('+').next().unwrap_or(raw);
    let without_zulu = without_offset.trim_end().trim_end_matches('Z');

    if let Ok(dt) = NaiveDateTime::parse_from_str(without_zulu.trim(), DATETIME_FORMAT) {
        return Some(dt.date());
    }

    let candidate = without_zulu.split('T').next().unwrap_or(without_zulu).trim();
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok());

    if parsed.is_none() {
        debug!(%raw, "Could not parse date");
    }
    parsed
}

/// Whether `text` mentions a month by its three-letter abbreviation.
///
/// Full names contain their abbreviation, so they match too.
pub fn mentions_month_abbrev(text: &str) -> bool {
    MONTHS.iter().any(|m| text.contains(&m[..3]))
}

/// Whether `text` mentions a month by its full English name.
pub fn mentions_full_month(text: &str) -> bool {
    MONTHS.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oct18() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 10, 18)
    }

    #[test]
    fn test_equivalent_spellings_agree() {
        assert_eq!(normalize_date("2024-10-18"), oct18());
        assert_eq!(normalize_date("October 18, 2024"), oct18());
        assert_eq!(normalize_date("Oct 18, 2024"), oct18());
        assert_eq!(normalize_date("18 October 2024"), oct18());
        assert_eq!(normalize_date("18 Oct 2024"), oct18());
    }

    #[test]
    fn test_time_and_zone_suffixes_are_dropped() {
        assert_eq!(normalize_date("2024-10-18T09:30:00Z"), oct18());
        assert_eq!(normalize_date("2024-10-18T09:30:00.000Z"), oct18());
        assert_eq!(normalize_date("2024-10-18T09:30:00+02:00"), oct18());
        assert_eq!(normalize_date("2024-10-18 +0000"), oct18());
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(normalize_date("  Oct 18, 2024\n"), oct18());
    }

    #[test]
    fn test_single_digit_day() {
        assert_eq!(
            normalize_date("Nov 5, 2024"),
            NaiveDate::from_ymd_opt(2024, 11, 5)
        );
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(normalize_date("not a date"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("   "), None);
        assert_eq!(normalize_date("2024-13-45"), None);
    }

    #[test]
    fn test_month_detection() {
        assert!(mentions_month_abbrev("Oct 15, 2025"));
        assert!(mentions_month_abbrev("September 3, 2024"));
        assert!(!mentions_month_abbrev("Python Basics"));
        assert!(mentions_full_month("November 22, 2024"));
        assert!(!mentions_full_month("Nov 22, 2024"));
    }
}
