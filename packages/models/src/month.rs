//! Calendar month tokens and inclusive month ranges.
//!
//! The crime API is queried one month at a time using a `YYYY-MM` token.
//! [`MonthRange`] produces those tokens in order, rolling over year
//! boundaries, and can be iterated any number of times.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a string is not a valid `YYYY-MM` token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month token {input:?}: expected YYYY-MM")]
pub struct InvalidMonthError {
    /// The rejected input.
    pub input: String,
}

/// A calendar year-month, rendered as `YYYY-MM`.
///
/// Stored as the first day of the month so that ordering and month
/// arithmetic come from [`NaiveDate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthToken(NaiveDate);

impl MonthToken {
    /// Creates a token for the given year and month (1-12).
    ///
    /// Returns `None` if `month` is out of range.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(date) => Some(Self(date)),
            None => None,
        }
    }

    /// The calendar year.
    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// The calendar month (1-12).
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The following calendar month, or `None` past the end of the
    /// representable date range.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }
}

impl fmt::Display for MonthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for MonthToken {
    type Err = InvalidMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonthError {
            input: s.to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(year, 4) || !digits(month, 2) {
            return Err(invalid());
        }

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of months.
///
/// A range whose start is after its end is empty rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    /// First month (inclusive).
    pub start: MonthToken,
    /// Last month (inclusive).
    pub end: MonthToken,
}

impl MonthRange {
    /// Creates a range from `start` to `end`, both inclusive.
    #[must_use]
    pub const fn new(start: MonthToken, end: MonthToken) -> Self {
        Self { start, end }
    }

    /// Returns a fresh iterator over the months in this range.
    #[must_use]
    pub fn iter(&self) -> MonthIter {
        MonthIter {
            next: (self.start <= self.end).then_some(self.start),
            end: self.end,
        }
    }

    /// Number of months in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let ordinal = |m: MonthToken| i64::from(m.year()) * 12 + i64::from(m.month());
        usize::try_from(ordinal(self.end) - ordinal(self.start)).map_or(0, |m| m + 1)
    }

    /// Whether the range contains no months.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl IntoIterator for &MonthRange {
    type Item = MonthToken;
    type IntoIter = MonthIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the months of a [`MonthRange`].
#[derive(Debug, Clone)]
pub struct MonthIter {
    next: Option<MonthToken>,
    end: MonthToken,
}

impl Iterator for MonthIter {
    type Item = MonthToken;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next().filter(|n| *n <= self.end);
        Some(current)
    }
}
