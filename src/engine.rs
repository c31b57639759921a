/// Business-time engine
///
/// Classifies days against a weekly pattern and a list of recurring holidays,
/// snaps instants into the daily business window, measures business time
/// between two instants, and shifts instants by a business-time duration.
///
/// Every decision is taken in the configured timezone. Results are handed
/// back in the caller's own timezone.

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone,
    Timelike, Weekday,
};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace};

use crate::calendar::{
    compute_working_hours, parse_weekday, weekday_name, Direction, Holiday, TimeUnit,
    SECONDS_PER_HOUR, SECONDS_PER_MINUTE,
};
use crate::error::{BusinessTimeError, Result};

/// Longest run of consecutive non-business days a day-walking loop tolerates.
/// A recurring date cycles through every weekday within this span, so only a
/// broken configuration can exhaust it.
pub const MAX_IDLE_DAYS: u32 = 366 * 14;

/// Number of distinct day/month pairs outside of 29/02
const ORDINARY_DATES_PER_YEAR: usize = 365;

#[derive(Debug, Clone)]
pub struct BusinessTimeEngine {
    timezone: Tz,
    business_days: HashSet<Weekday>,
    start_hour: u32,
    end_hour: u32,
    holidays: HashSet<Holiday>,
}

impl BusinessTimeEngine {
    /// Build an engine from raw configuration values.
    ///
    /// Fails with [`BusinessTimeError::Config`] when the timezone is unknown, no
    /// business day is given, a weekday name or holiday is malformed, an hour lies
    /// outside `[0, 24]`, the window is empty or would cross midnight, or the
    /// holidays leave no date of the year free.
    ///
    /// `end_hour < start_hour` is refused even though [`compute_working_hours`]
    /// wraps it: every window is applied within a single local calendar day, so
    /// an overnight window has no per-day meaning.
    pub fn new<D, H>(
        timezone: &str,
        business_days: &[D],
        start_hour: u32,
        end_hour: u32,
        holidays: &[H],
    ) -> Result<Self>
    where
        D: AsRef<str>,
        H: AsRef<str>,
    {
        let timezone: Tz = timezone.trim().parse().map_err(|e| {
            BusinessTimeError::Config(format!("unknown timezone '{}': {}", timezone, e))
        })?;

        let business_days = business_days
            .iter()
            .map(|d| parse_weekday(d.as_ref()))
            .collect::<Result<HashSet<_>>>()?;
        if business_days.is_empty() {
            return Err(BusinessTimeError::Config(
                "at least one business day is required".to_string(),
            ));
        }

        Self::check_window(start_hour, end_hour)?;

        let holidays = holidays
            .iter()
            .map(|h| h.as_ref().parse::<Holiday>())
            .collect::<Result<HashSet<_>>>()?;
        let ordinary = holidays
            .iter()
            .filter(|h| !(h.day == 29 && h.month == 2))
            .count();
        if ordinary >= ORDINARY_DATES_PER_YEAR {
            return Err(BusinessTimeError::Config(
                "holidays cover every date of the year".to_string(),
            ));
        }

        let engine = Self {
            timezone,
            business_days,
            start_hour,
            end_hour,
            holidays,
        };
        info!("Business time engine configured: {}", engine);
        Ok(engine)
    }

    fn check_window(start_hour: u32, end_hour: u32) -> Result<()> {
        if start_hour > 24 || end_hour > 24 {
            return Err(BusinessTimeError::Config(format!(
                "window hours must lie in [0, 24], got [{}, {}]",
                start_hour, end_hour
            )));
        }
        if start_hour == end_hour {
            return Err(BusinessTimeError::Config(format!(
                "window [{}, {}] is empty; use [0, 24] for a whole day",
                start_hour, end_hour
            )));
        }
        if end_hour < start_hour {
            return Err(BusinessTimeError::Config(format!(
                "window [{}, {}] crosses midnight; the daily window must end on the day it starts",
                start_hour, end_hour
            )));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Configured window as `(start_hour, end_hour)`
    pub fn window(&self) -> (u32, u32) {
        (self.start_hour, self.end_hour)
    }

    /// Business days in calendar order, Monday first
    pub fn business_days(&self) -> Vec<Weekday> {
        let mut days: Vec<Weekday> = self.business_days.iter().copied().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days
    }

    /// Holidays sorted by month, then day
    pub fn holidays(&self) -> Vec<Holiday> {
        let mut holidays: Vec<Holiday> = self.holidays.iter().copied().collect();
        holidays.sort_by_key(|h| (h.month, h.day));
        holidays
    }

    /// Hours in the configured daily window
    pub fn working_hours(&self) -> u32 {
        compute_working_hours(self.start_hour, self.end_hour)
    }

    /// Hours in a window from `start_hour` to `end_hour`, wrapping past midnight.
    /// Needs no engine; see [`compute_working_hours`].
    pub fn compute_working_hours(start_hour: u32, end_hour: u32) -> u32 {
        compute_working_hours(start_hour, end_hour)
    }

    /// Convert a number of business hours into business days of the configured window
    pub fn hours_to_days(&self, hours: f64) -> f64 {
        hours / f64::from(self.working_hours())
    }

    // === Classification ===

    /// Holidays win over the weekly pattern
    fn is_business_date(&self, date: NaiveDate) -> bool {
        if self.holidays.contains(&Holiday::of(date)) {
            return false;
        }
        self.business_days.contains(&date.weekday())
    }

    /// Whether the instant's calendar day, seen in the configured timezone, is a business day
    pub fn is_business_day<T: TimeZone>(&self, instant: &DateTime<T>) -> bool {
        self.is_business_date(self.localize(instant).date_naive())
    }

    /// Whether the instant falls inside the `[start, end)` window of a business day
    pub fn is_business_time<T: TimeZone>(&self, instant: &DateTime<T>) -> Result<bool> {
        let local = self.localize(instant);
        let date = local.date_naive();
        if !self.is_business_date(date) {
            return Ok(false);
        }
        Ok(self.window_start(date)? <= local && local < self.window_end(date)?)
    }

    // === Window boundaries ===

    fn localize<T: TimeZone>(&self, instant: &DateTime<T>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    /// Local wall-clock `hour:00:00` on `date`; hour 24 is midnight of the next day
    fn local_at(&self, date: NaiveDate, hour: u32) -> Result<DateTime<Tz>> {
        let (date, hour) = if hour == 24 {
            (self.step(date, Direction::Forward)?, 0)
        } else {
            (date, hour)
        };
        let naive = date
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| BusinessTimeError::InvalidInstant(format!("{} {:02}:00", date, hour)))?;
        Ok(self.resolve_local(naive))
    }

    fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                // Skipped by a forward transition: read the wall clock with the offset in force before the gap
                let before = self
                    .timezone
                    .from_utc_datetime(&(naive - TimeDelta::days(1)))
                    .offset()
                    .fix();
                let shift = TimeDelta::seconds(i64::from(before.local_minus_utc()));
                self.timezone.from_utc_datetime(&(naive - shift))
            }
        }
    }

    fn window_start(&self, date: NaiveDate) -> Result<DateTime<Tz>> {
        self.local_at(date, self.start_hour)
    }

    fn window_end(&self, date: NaiveDate) -> Result<DateTime<Tz>> {
        self.local_at(date, self.end_hour)
    }

    /// The boundary a walk in `direction` lands on when it enters `date`
    fn entry_boundary(&self, date: NaiveDate, direction: Direction) -> Result<DateTime<Tz>> {
        match direction {
            Direction::Forward => self.window_start(date),
            Direction::Backward => self.window_end(date),
        }
    }

    fn step(&self, date: NaiveDate, direction: Direction) -> Result<NaiveDate> {
        direction.step(date).ok_or_else(|| {
            BusinessTimeError::InvalidInstant(format!("no calendar day beyond {}", date))
        })
    }

    // === Snapping ===

    /// Move `instant` to the nearest moment inside a business window in `direction`.
    /// Instants already inside a window (boundaries included) of a business day are returned unchanged.
    pub fn snap_into_business_time<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        direction: Direction,
    ) -> Result<DateTime<T>> {
        let (_, snapped) = self.snap_local(self.localize(instant), direction)?;
        Ok(snapped.with_timezone(&instant.timezone()))
    }

    /// Snap and also report the business day whose window the result belongs to.
    ///
    /// The day is tracked explicitly because a window ending at 24 finishes on
    /// the next calendar date's midnight.
    fn snap_local(
        &self,
        local: DateTime<Tz>,
        direction: Direction,
    ) -> Result<(NaiveDate, DateTime<Tz>)> {
        let date = local.date_naive();
        let start = self.window_start(date)?;
        let end = self.window_end(date)?;

        let (mut day, mut snapped) = if local < start {
            match direction {
                Direction::Forward => (date, start),
                Direction::Backward => {
                    let previous = self.step(date, Direction::Backward)?;
                    (previous, self.window_end(previous)?)
                }
            }
        } else if local > end {
            match direction {
                Direction::Forward => {
                    let next = self.step(date, Direction::Forward)?;
                    (next, self.window_start(next)?)
                }
                Direction::Backward => (date, end),
            }
        } else {
            (date, local)
        };

        let mut guard = IdleGuard::default();
        while !self.is_business_date(day) {
            guard.idle()?;
            day = self.step(day, direction)?;
            snapped = self.entry_boundary(day, direction)?;
        }

        trace!("Snapped {} {:?} to {}", local, direction, snapped);
        Ok((day, snapped))
    }

    // === Interval accumulation ===

    /// Business time between `start` and `end`, reported in `unit`.
    /// Fails with [`BusinessTimeError::Ordering`] if `start` is after `end`.
    pub fn compute_business_time_in_interval<T: TimeZone>(
        &self,
        start: &DateTime<T>,
        end: &DateTime<T>,
        unit: TimeUnit,
    ) -> Result<f64> {
        let start = self.localize(start);
        let end = self.localize(end);
        if start > end {
            return Err(BusinessTimeError::Ordering {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        let seconds = delta_as_seconds(self.business_time_between(start, end)?);
        let value = match unit {
            TimeUnit::Seconds => seconds,
            TimeUnit::Minutes => seconds / SECONDS_PER_MINUTE,
            TimeUnit::Hours => seconds / SECONDS_PER_HOUR,
            TimeUnit::Days => self.hours_to_days(seconds / SECONDS_PER_HOUR),
        };
        debug!("Business time {} -> {}: {} {:?}", start, end, value, unit);
        Ok(value)
    }

    pub fn compute_business_days_in_interval<T: TimeZone>(
        &self,
        start: &DateTime<T>,
        end: &DateTime<T>,
    ) -> Result<f64> {
        self.compute_business_time_in_interval(start, end, TimeUnit::Days)
    }

    pub fn compute_business_hours_in_interval<T: TimeZone>(
        &self,
        start: &DateTime<T>,
        end: &DateTime<T>,
    ) -> Result<f64> {
        self.compute_business_time_in_interval(start, end, TimeUnit::Hours)
    }

    pub fn compute_business_minutes_in_interval<T: TimeZone>(
        &self,
        start: &DateTime<T>,
        end: &DateTime<T>,
    ) -> Result<f64> {
        self.compute_business_time_in_interval(start, end, TimeUnit::Minutes)
    }

    pub fn compute_business_seconds_in_interval<T: TimeZone>(
        &self,
        start: &DateTime<T>,
        end: &DateTime<T>,
    ) -> Result<f64> {
        self.compute_business_time_in_interval(start, end, TimeUnit::Seconds)
    }

    /// Sum of in-window time between two ordered local instants
    fn business_time_between(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> Result<TimeDelta> {
        let (mut day, mut cursor) = self.snap_local(start, Direction::Forward)?;
        let (end_day, end) = self.snap_local(end, Direction::Forward)?;

        let mut total = TimeDelta::zero();
        let mut guard = IdleGuard::default();
        while cursor < end {
            if !self.is_business_date(day) {
                guard.idle()?;
                day = self.step(day, Direction::Forward)?;
                cursor = self.window_start(day)?;
                continue;
            }
            guard.reset();

            if day == end_day {
                total += end.signed_duration_since(cursor);
                break;
            }

            total += self.window_end(day)?.signed_duration_since(cursor);
            trace!("Accumulated {} through {}", total, day);
            day = self.step(day, Direction::Forward)?;
            cursor = self.window_start(day)?;
        }

        Ok(total)
    }

    // === Duration shifting ===

    /// Move `instant` forward by `seconds` of business time.
    ///
    /// Zero returns the input untouched. Any other result is snapped into
    /// business time and floored to the whole minute.
    pub fn add_business_seconds_to_date<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        seconds: i64,
    ) -> Result<DateTime<T>> {
        self.shift(instant, seconds, Direction::Forward)
    }

    /// Move `instant` backward by `seconds` of business time; see [`Self::add_business_seconds_to_date`]
    pub fn remove_business_seconds_from_date<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        seconds: i64,
    ) -> Result<DateTime<T>> {
        self.shift(instant, seconds, Direction::Backward)
    }

    /// Fractional hours are rounded to the nearest second, and never below one
    /// second unless exactly zero hours were asked for
    pub fn add_business_hours_to_date<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        hours: f64,
    ) -> Result<DateTime<T>> {
        self.shift(instant, hours_to_seconds(hours)?, Direction::Forward)
    }

    pub fn remove_business_hours_from_date<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        hours: f64,
    ) -> Result<DateTime<T>> {
        self.shift(instant, hours_to_seconds(hours)?, Direction::Backward)
    }

    fn shift<T: TimeZone>(
        &self,
        instant: &DateTime<T>,
        seconds: i64,
        direction: Direction,
    ) -> Result<DateTime<T>> {
        if seconds < 0 {
            return Err(BusinessTimeError::InvalidArgument(format!(
                "business duration must not be negative, got {}s",
                seconds
            )));
        }
        if seconds == 0 {
            return Ok(instant.clone());
        }

        let amount = TimeDelta::try_seconds(seconds).ok_or_else(|| {
            BusinessTimeError::InvalidArgument(format!("duration of {}s is out of range", seconds))
        })?;
        let local = self.localize(instant);
        let shifted = truncate_to_minute(self.shift_local(local, amount, direction)?);
        debug!("Shifted {} {:?} by {}s to {}", local, direction, seconds, shifted);
        Ok(shifted.with_timezone(&instant.timezone()))
    }

    /// Walk day by day in `direction`, consuming each business window until `amount` is spent
    fn shift_local(
        &self,
        local: DateTime<Tz>,
        amount: TimeDelta,
        direction: Direction,
    ) -> Result<DateTime<Tz>> {
        let (mut day, mut cursor) = self.snap_local(local, direction)?;
        let mut remaining = amount;
        let mut guard = IdleGuard::default();

        while remaining > TimeDelta::zero() {
            if !self.is_business_date(day) {
                guard.idle()?;
                day = self.step(day, direction)?;
                cursor = self.entry_boundary(day, direction)?;
                continue;
            }
            guard.reset();

            let available = match direction {
                Direction::Forward => self.window_end(day)?.signed_duration_since(cursor),
                Direction::Backward => cursor.signed_duration_since(self.window_start(day)?),
            }
            .max(TimeDelta::zero());

            if remaining <= available {
                let moved = match direction {
                    Direction::Forward => cursor.checked_add_signed(remaining),
                    Direction::Backward => cursor.checked_sub_signed(remaining),
                };
                cursor = moved.ok_or_else(|| {
                    BusinessTimeError::InvalidInstant(format!("{} shifted out of range", cursor))
                })?;
                remaining = TimeDelta::zero();
            } else {
                remaining -= available;
                day = self.step(day, direction)?;
                cursor = self.entry_boundary(day, direction)?;
                trace!("Carrying {} into {}", remaining, day);
            }
        }

        Ok(cursor)
    }
}

impl fmt::Display for BusinessTimeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<&str> = self.business_days().into_iter().map(weekday_name).collect();
        let holidays: Vec<String> = self.holidays().iter().map(Holiday::to_string).collect();
        write!(
            f,
            "{} [{:02}:00-{:02}:00] on {} (holidays: {})",
            self.timezone,
            self.start_hour,
            self.end_hour,
            days.join(","),
            if holidays.is_empty() {
                "none".to_string()
            } else {
                holidays.join(",")
            }
        )
    }
}

/// Counts consecutive non-business days seen by a day-walking loop
#[derive(Debug, Default)]
struct IdleGuard {
    idle_days: u32,
}

impl IdleGuard {
    fn idle(&mut self) -> Result<()> {
        self.idle_days += 1;
        if self.idle_days > MAX_IDLE_DAYS {
            return Err(BusinessTimeError::NoBusinessDay {
                days: MAX_IDLE_DAYS,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.idle_days = 0;
    }
}

/// Drop seconds and sub-second precision
fn truncate_to_minute(instant: DateTime<Tz>) -> DateTime<Tz> {
    let excess = TimeDelta::seconds(i64::from(instant.second()))
        + TimeDelta::nanoseconds(i64::from(instant.nanosecond()));
    instant.checked_sub_signed(excess).unwrap_or(instant)
}

fn delta_as_seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

fn hours_to_seconds(hours: f64) -> Result<i64> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(BusinessTimeError::InvalidArgument(format!(
            "business hours must be a finite, non-negative number, got {}",
            hours
        )));
    }
    let seconds = (hours * SECONDS_PER_HOUR).round() as i64;
    if hours > 0.0 {
        Ok(seconds.max(1))
    } else {
        Ok(seconds)
    }
}
