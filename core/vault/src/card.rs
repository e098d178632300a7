//! Month/year dates printed on payment cards.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A card expiration or "valid from" date.
///
/// Only month and year are meaningful. The day is always the 1st at UTC
/// midnight so two dates for the same month compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardDate(DateTime<Utc>);

impl CardDate {
    /// Build a date from a calendar month (1-12) and a four-digit year.
    ///
    /// Returns `None` for months outside 1..=12 or years below 1000.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if !(1..=12).contains(&month) || year < 1000 {
            return None;
        }
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .map(Self)
    }

    /// Parse the `MM/YYYY` form. Missing or invalid input yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let (month, year) = text.trim().split_once('/')?;
        Self::from_parts(Some(month), Some(year))
    }

    /// Parse the compact `MMYYYY` form used by some CSV exports.
    pub fn parse_compact(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() != 6 || !text.is_ascii() {
            return None;
        }
        let (month, year) = text.split_at(2);
        Self::from_parts(Some(month), Some(year))
    }

    /// Build a date from separately stored month and year strings.
    pub fn from_parts(month: Option<&str>, year: Option<&str>) -> Option<Self> {
        let month = month?.trim().parse::<u32>().ok()?;
        let year = year?.trim().parse::<i32>().ok()?;
        Self::new(month, year)
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Two-digit month, as stores expect it in separate month fields.
    pub fn month_str(&self) -> String {
        format!("{:02}", self.month())
    }

    /// Four-digit year.
    pub fn year_str(&self) -> String {
        format!("{:04}", self.year())
    }

    /// The normalized instant (1st of the month, UTC midnight).
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as `MM/YYYY`.
    pub fn format(&self) -> String {
        format!("{}/{}", self.month_str(), self.year_str())
    }
}

impl fmt::Display for CardDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl TryFrom<String> for CardDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| format!("invalid card date '{}', expected MM/YYYY", value))
    }
}

impl From<CardDate> for String {
    fn from(date: CardDate) -> String {
        date.format()
    }
}
