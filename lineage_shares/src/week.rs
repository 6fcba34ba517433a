//! Canonical week keys.
//!
//! All the dates are bucketed with the ISO-8601 week numbering: weeks start on
//! Monday and belong to the ISO week-based year. This is the only rule used in
//! the crate, whatever the encoding of the input.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};
use log::debug;

use crate::config::{LineageErrors, RawWeek};

/// A (year, week) pair. Ordering is numeric on the year, then on the week.
///
/// It is rendered as `YYYY/WW`, the week being padded for display only.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    /// Builds a key, checking that this week exists in the ISO calendar.
    pub fn new(year: i32, week: u32) -> Option<WeekKey> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|_| WeekKey { year, week })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// The Monday opening this week.
    pub fn monday(&self) -> NaiveDate {
        // The constructors only build weeks that exist in the calendar.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or(NaiveDate::MIN)
    }

    fn from_date(d: NaiveDate) -> WeekKey {
        let iso = d.iso_week();
        WeekKey {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl Display for WeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = LineageErrors;

    fn from_str(s: &str) -> Result<WeekKey, LineageErrors> {
        parse_text(s)
    }
}

/// Turns any raw week encoding into its canonical key.
///
/// Fails with [`LineageErrors::MalformedDate`] carrying the original input. It
/// never falls back to the current date.
pub fn normalize(raw: &RawWeek) -> Result<WeekKey, LineageErrors> {
    match raw {
        RawWeek::Text(s) => parse_text(s),
        RawWeek::Date(d) => Ok(WeekKey::from_date(*d)),
        RawWeek::Timestamp(ms) => {
            from_timestamp_millis(*ms).ok_or_else(|| malformed(&raw.to_string()))
        }
    }
}

fn malformed(input: &str) -> LineageErrors {
    LineageErrors::MalformedDate {
        input: input.to_string(),
    }
}

fn from_timestamp_millis(ms: i64) -> Option<WeekKey> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| WeekKey::from_date(dt.date_naive()))
}

const MIN_TIMESTAMP_DIGITS: usize = 10;

fn parse_text(input: &str) -> Result<WeekKey, LineageErrors> {
    let s = input.trim();
    // Labels rendered for the charts carry a trailing week marker: "2022/10週".
    let s = s.strip_suffix('週').unwrap_or(s);

    if let Some(res) = parse_year_week(s) {
        return res.ok_or_else(|| malformed(input));
    }

    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        // 8 digits is a basic ISO date (20220107). Timestamps have at least 10.
        if s.len() == 8 {
            let date = NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| malformed(input))?;
            return Ok(WeekKey::from_date(date));
        }
        if s.len() < MIN_TIMESTAMP_DIGITS {
            return Err(malformed(input));
        }
        let ms = s.parse::<i64>().map_err(|_| malformed(input))?;
        return from_timestamp_millis(ms).ok_or_else(|| malformed(input));
    }

    let date = parse_date(s).ok_or_else(|| malformed(input))?;
    debug!("parse_text: {:?} -> {:?}", input, date);
    Ok(WeekKey::from_date(date))
}

// Returns None if the text does not have the YYYY/W shape at all, and
// Some(None) if it has the shape but names a week that does not exist.
fn parse_year_week(s: &str) -> Option<Option<WeekKey>> {
    let (y, w) = s.split_once('/')?;
    let is_digits = |x: &str| x.chars().all(|c| c.is_ascii_digit());
    if y.len() != 4 || w.is_empty() || w.len() > 2 || !is_digits(y) || !is_digits(w) {
        return None;
    }
    let year = y.parse::<i32>().ok()?;
    let week = w.parse::<u32>().ok()?;
    Some(WeekKey::new(year, week))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
