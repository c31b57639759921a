/// Wait-time helpers built on the engine
/// Answers "how long until business time resumes" for a given moment.

use chrono::{DateTime, TimeDelta, TimeZone};
use std::time::Duration;
use tracing::debug;

use crate::calendar::Direction;
use crate::engine::BusinessTimeEngine;
use crate::error::Result;

/// Time until the next business window opens.
/// Returns None if `now` is already inside business time.
pub fn time_until_business_time<T: TimeZone>(
    engine: &BusinessTimeEngine,
    now: &DateTime<T>,
) -> Result<Option<Duration>> {
    if engine.is_business_time(now)? {
        return Ok(None);
    }

    let mut opens = engine.snap_into_business_time(now, Direction::Forward)?;

    // Snapping forward from the end boundary of a window returns that same boundary
    if opens <= *now {
        let past_close = opens + TimeDelta::seconds(1);
        opens = engine.snap_into_business_time(&past_close, Direction::Forward)?;
    }

    let wait = opens.clone().signed_duration_since(now);
    debug!("Business time resumes at {} UTC ({}s away)", opens.naive_utc(), wait.num_seconds());
    Ok(Some(wait.to_std().unwrap_or(Duration::ZERO)))
}

/// Format duration for logging
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}
