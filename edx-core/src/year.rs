use serde::{Serialize, Serializer};
use std::fmt;

/// Earliest year with satellite coverage in the corpus.
pub const FIRST_YEAR: u16 = 2015;

/// The fixed "current year" that relative phrases ("last 3 years") end at.
pub const CURRENT_YEAR: u16 = 2024;

/// A four-digit year within [`FIRST_YEAR`]..=[`CURRENT_YEAR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(u16);

impl Year {
    pub fn new(year: u16) -> Option<Year> {
        (FIRST_YEAR..=CURRENT_YEAR).contains(&year).then_some(Year(year))
    }

    /// Parse a token of exactly four ASCII digits, rejecting out-of-range years.
    pub fn parse(token: &str) -> Option<Year> {
        if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        token.parse::<u16>().ok().and_then(Year::new)
    }

    pub fn current() -> Year {
        Year(CURRENT_YEAR)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// First day of the calendar year, "YYYY-01-01".
    pub fn start_date(&self) -> String {
        format!("{}-01-01", self.0)
    }

    /// Last day of the calendar year, "YYYY-12-31".
    pub fn end_date(&self) -> String {
        format!("{}-12-31", self.0)
    }
}

/// Contiguous years from `start` through `end`, clipped to the valid range.
///
/// Empty when the clipped start is after the clipped end.
pub fn clipped_span(start: i64, end: i64) -> Vec<Year> {
    let start = start.max(FIRST_YEAR as i64);
    let end = end.min(CURRENT_YEAR as i64);
    (start..=end)
        .filter_map(|y| u16::try_from(y).ok().and_then(Year::new))
        .collect()
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
