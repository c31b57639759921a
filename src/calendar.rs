/// Calendar primitives shared by the engine and the config layer:
/// weekday names, recurring DD/MM holidays, snap direction, output units.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

use crate::error::{BusinessTimeError, Result};

pub const SECONDS_PER_MINUTE: f64 = 60.0;
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Number of hours in a daily window running from `start_hour` to `end_hour`.
///
/// `end_hour < start_hour` is read as a window crossing midnight, so
/// `(18, 3)` yields 9. This is only a per-day scalar used to turn hours into
/// days; the engine itself never applies a window across midnight.
pub fn compute_working_hours(start_hour: u32, end_hour: u32) -> u32 {
    if end_hour < start_hour {
        24u32.saturating_sub(start_hour) + end_hour
    } else {
        end_hour - start_hour
    }
}

/// Parse a lowercase English weekday name ("monday" .. "sunday").
/// Surrounding whitespace and letter case are ignored; abbreviations are not accepted.
pub fn parse_weekday(name: &str) -> Result<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        other => Err(BusinessTimeError::Config(format!(
            "unknown weekday name '{}'",
            other
        ))),
    }
}

/// Lowercase English name of a weekday, the inverse of [`parse_weekday`]
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// A holiday recurring every year on the same day and month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Holiday {
    pub day: u32,
    pub month: u32,
}

impl Holiday {
    /// Build a holiday, rejecting day/month pairs that never occur (29/02 is allowed)
    pub fn new(day: u32, month: u32) -> Result<Self> {
        // 2020 is a leap year, so every real day/month exists in it
        if NaiveDate::from_ymd_opt(2020, month, day).is_none() {
            return Err(BusinessTimeError::Config(format!(
                "holiday {:02}/{:02} is not a calendar date",
                day, month
            )));
        }
        Ok(Self { day, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
        }
    }
}

impl FromStr for Holiday {
    type Err = BusinessTimeError;

    /// Parse `DD/MM`. Leading zeros are optional.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || BusinessTimeError::Config(format!("malformed holiday '{}', expected DD/MM", s));

        let (day, month) = s.trim().split_once('/').ok_or_else(malformed)?;
        let parse_part = |part: &str| -> Result<u32> {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };

        Holiday::new(parse_part(day)?, parse_part(month)?)
    }
}

impl fmt::Display for Holiday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.day, self.month)
    }
}

/// Which way to move when an instant has to be pushed into business time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The neighbouring calendar date in this direction
    pub fn step(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Direction::Forward => date.succ_opt(),
            Direction::Backward => date.pred_opt(),
        }
    }
}

/// Unit in which an accumulated interval is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

/// Parse an RFC 3339 instant such as `2020-12-28T13:45:00+01:00`
pub fn parse_instant(text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|e| BusinessTimeError::InvalidInstant(format!("'{}': {}", text, e)))
}



/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn working_hours_bounded() {
        let start: u32 = kani::any();
        kani::assume(start <= 24);
        let end: u32 = kani::any();
        kani::assume(end <= 24);

        let hours = compute_working_hours(start, end);
        kani::assert(hours <= 24, "a daily window is at most 24 hours");
    }

    #[kani::proof]
    fn working_hours_zero_only_when_degenerate() {
        let start: u32 = kani::any();
        kani::assume(start <= 24);
        let end: u32 = kani::any();
        kani::assume(end <= 24);

        if compute_working_hours(start, end) == 0 {
            kani::assert(start == end || (start == 24 && end == 0), "only an empty window has zero hours");
        }
    }
}
