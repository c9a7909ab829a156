//! Partial calendar dates as they appear on a profile.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A year, optionally refined to a month.
///
/// Serializes as `YYYY` or `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialDate {
    /// Four-digit year
    pub year: i32,
    /// Month (1-12), when known
    pub month: Option<u32>,
}

impl PartialDate {
    /// A year-only date.
    pub fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    /// A year-month date. Returns `None` for months outside 1-12.
    pub fn year_month(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self {
            year,
            month: Some(month),
        })
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{:04}-{:02}", self.year, month),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for PartialDate {
    type Err = String;

    /// Accepts `YYYY`, `YYYY-MM` and `YYYY-MM-DD` (the day is dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('-');
        let year = parts
            .next()
            .filter(|y| y.len() == 4)
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(|| format!("invalid year in {:?}", s))?;
        match parts.next() {
            None => Ok(Self::year(year)),
            Some(m) => m
                .parse::<u32>()
                .ok()
                .and_then(|m| Self::year_month(year, m))
                .ok_or_else(|| format!("invalid month in {:?}", s)),
        }
    }
}

impl Serialize for PartialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartialDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// End of a date range: a date or the open-ended "present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateBound {
    /// A concrete end date
    Date(PartialDate),
    /// Still ongoing
    Present,
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBound::Date(date) => date.fmt(f),
            DateBound::Present => f.write_str("present"),
        }
    }
}

impl FromStr for DateBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("present") {
            Ok(DateBound::Present)
        } else {
            s.parse().map(DateBound::Date)
        }
    }
}

impl Serialize for DateBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A start/end range. `raw` keeps the source text whenever any part of it
/// could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Range start
    #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<PartialDate>,

    /// Range end
    #[serde(rename = "endDate", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateBound>,

    /// Original text when parsing was incomplete
    #[serde(rename = "dateRaw", default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl DateRange {
    /// A fully parsed range.
    pub fn new(start: Option<PartialDate>, end: Option<DateBound>) -> Self {
        Self {
            start,
            end,
            raw: None,
        }
    }

    /// An unparsed range that only preserves the text.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            start: None,
            end: None,
            raw: Some(text.into()),
        }
    }

    /// No start, no end, no raw text.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.raw.is_none()
    }

    /// Whether parsing lost nothing.
    pub fn is_complete(&self) -> bool {
        self.raw.is_none() && (self.start.is_some() || self.end.is_some())
    }
}
