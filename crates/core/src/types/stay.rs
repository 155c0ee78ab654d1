//! Stay date ranges and the overlap rule availability is built on.
//!
//! A stay covers the nights from `start` up to, but not including, `end`.
//! The guest checks out on `end`, so another stay may begin that same day.

use core::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date formats accepted from forms and query strings, tried in order.
///
/// HTML date inputs submit ISO dates; older links use month-first dates.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m-%d-%Y"];

/// A date string matched none of the accepted formats.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid date {input:?}, expected YYYY-MM-DD or MM-DD-YYYY")]
pub struct DateParseError {
    pub input: String,
}

/// Reasons a stay range is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StayRangeError {
    #[error(transparent)]
    Date(#[from] DateParseError),
    #[error("departure must be after arrival")]
    EndNotAfterStart,
}

/// Parse a calendar date in any accepted format.
///
/// # Errors
///
/// Returns [`DateParseError`] when no format matches.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| DateParseError {
            input: input.to_owned(),
        })
}

/// A half-open `[start, end)` range of calendar dates, at least one night long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStay")]
pub struct StayRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawStay {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawStay> for StayRange {
    type Error = StayRangeError;

    fn try_from(raw: RawStay) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl StayRange {
    /// # Errors
    ///
    /// Returns [`StayRangeError::EndNotAfterStart`] unless `end > start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StayRangeError> {
        if end <= start {
            return Err(StayRangeError::EndNotAfterStart);
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from user input.
    ///
    /// # Errors
    ///
    /// Returns [`StayRangeError`] if either date is malformed or the range is
    /// empty.
    pub fn parse(start: &str, end: &str) -> Result<Self, StayRangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights in the stay. Always at least one.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Strict half-open overlap: `self.start < other.end && self.end > other.start`.
    ///
    /// Ranges that only touch at a boundary do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether `date` is one of the nights covered.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Every night of the stay, in order.
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    /// A one-night range starting on `date`.
    #[must_use]
    pub fn single_night(date: NaiveDate) -> Option<Self> {
        let end = date.checked_add_days(Days::new(1))?;
        Some(Self { start: date, end })
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stay(a: (i32, u32, u32), b: (i32, u32, u32)) -> StayRange {
        StayRange::new(date(a.0, a.1, a.2), date(b.0, b.1, b.2)).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted_ranges() {
        let d = date(2026, 6, 1);
        assert_eq!(StayRange::new(d, d), Err(StayRangeError::EndNotAfterStart));
        assert_eq!(
            StayRange::new(date(2026, 6, 2), d),
            Err(StayRangeError::EndNotAfterStart)
        );
    }

    #[test]
    fn test_parse_accepts_iso_and_month_first() {
        assert_eq!(parse_date("2026-07-04").unwrap(), date(2026, 7, 4));
        assert_eq!(parse_date("07-04-2026").unwrap(), date(2026, 7, 4));
        assert!(parse_date("04/07/2026").is_err());
        assert!(matches!(
            StayRange::parse("2026-07-04", "bogus"),
            Err(StayRangeError::Date(_))
        ));
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let existing = stay((2026, 6, 1), (2026, 6, 5));
        let after = stay((2026, 6, 5), (2026, 6, 8));
        let before = stay((2026, 5, 28), (2026, 6, 1));
        assert!(!after.overlaps(&existing));
        assert!(!existing.overlaps(&after));
        assert!(!before.overlaps(&existing));
    }

    #[test]
    fn test_overlap_cases() {
        let existing = stay((2026, 6, 1), (2026, 6, 5));
        assert!(stay((2026, 6, 4), (2026, 6, 6)).overlaps(&existing));
        assert!(stay((2026, 5, 30), (2026, 6, 2)).overlaps(&existing));
        assert!(stay((2026, 6, 2), (2026, 6, 3)).overlaps(&existing));
        assert!(stay((2026, 5, 1), (2026, 7, 1)).overlaps(&existing));
        assert!(existing.overlaps(&existing));
    }

    #[test]
    fn test_nights() {
        let s = stay((2026, 2, 27), (2026, 3, 2));
        assert_eq!(s.nights(), 3);
        assert_eq!(
            s.nights_iter().collect::<Vec<_>>(),
            vec![date(2026, 2, 27), date(2026, 2, 28), date(2026, 3, 1)]
        );
        assert!(s.contains(date(2026, 3, 1)));
        assert!(!s.contains(date(2026, 3, 2)));
    }

    #[test]
    fn test_single_night() {
        let s = StayRange::single_night(date(2026, 12, 31)).unwrap();
        assert_eq!(s.end(), date(2027, 1, 1));
        assert_eq!(s.nights(), 1);
    }

    #[test]
    fn test_deserialize_enforces_order() {
        let ok: StayRange =
            serde_json::from_str(r#"{"start":"2026-01-01","end":"2026-01-03"}"#).unwrap();
        assert_eq!(ok.nights(), 2);
        assert!(
            serde_json::from_str::<StayRange>(r#"{"start":"2026-01-03","end":"2026-01-01"}"#)
                .is_err()
        );
    }
}
