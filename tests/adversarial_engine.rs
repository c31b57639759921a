//! Adversarial Property-Based Tests for the Business-Time Engine
//!
//! # Attack Plan
//!
//! 1. **Arbitrary Instants**: Seconds-resolution instants over two years,
//!    including nights, weekends, holidays and both DST transitions.
//!
//! 2. **Arbitrary Offsets**: The same instants seen from a random fixed
//!    offset, so the caller's zone never matches the configured one.
//!
//! 3. **Schedules**: Partial windows, whole-day windows, a single business day.
//!
//! 4. **Durations**: Zero, sub-minute, multi-week shifts.
//!
//! # Invariants
//!
//! - Snapping is idempotent and lands on a business day
//! - Interval business time is non-negative, monotonic in `end`, additive
//! - Shifting forward then back restores minute-aligned in-window instants
//! - Zero-length shifts return the input untouched
//! - Holidays always win over the weekly pattern
//! - Results keep the caller's offset

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Europe::Rome;
use proptest::prelude::*;

use businesstime::{BusinessTimeEngine, Direction};

const WEEKDAYS: [&str; 5] = ["monday", "tuesday", "wednesday", "thursday", "friday"];

// ============================================================================
// ADVERSARIAL GENERATORS
// ============================================================================

fn rome_office() -> BusinessTimeEngine {
    BusinessTimeEngine::new("Europe/Rome", &WEEKDAYS, 10, 19, &["01/01", "25/12", "26/12"]).unwrap()
}

fn rome_full_day() -> BusinessTimeEngine {
    BusinessTimeEngine::new("Europe/Rome", &WEEKDAYS, 0, 24, &["25/12"]).unwrap()
}

fn wednesdays_only() -> BusinessTimeEngine {
    BusinessTimeEngine::new("America/New_York", &["wednesday"], 22, 24, &["04/07"]).unwrap()
}

/// Pick one of the schedules above
fn schedule() -> impl Strategy<Value = BusinessTimeEngine> {
    prop_oneof![
        Just(()).prop_map(|_| rome_office()),
        Just(()).prop_map(|_| rome_full_day()),
        Just(()).prop_map(|_| wednesdays_only()),
    ]
}

/// Instants across 2020-2021 seen from an arbitrary whole-quarter-hour offset
fn instant() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (1_577_836_800i64..1_640_995_200i64, -48i32..=56i32).prop_map(|(secs, quarters)| {
        let offset = FixedOffset::east_opt(quarters * 900).unwrap();
        Utc.timestamp_opt(secs, 0).unwrap().with_timezone(&offset)
    })
}

/// Minute-aligned instants strictly inside the Rome office window on a business day
fn office_instant() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (0i64..730, 0i64..540)
        .prop_map(|(day, minute)| {
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + TimeDelta::days(day);
            let opening = Rome
                .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
                .single()
                .unwrap();
            (opening + TimeDelta::minutes(minute)).fixed_offset()
        })
        .prop_filter("must fall on a business day", |x| rome_office().is_business_day(x))
}

/// Second-resolution instants at least a minute past opening in the Rome office window
fn office_instant_with_seconds() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (office_instant(), 0i64..60)
        .prop_filter("must be past the first minute", |(x, _)| {
            rome_office().is_business_time(&(*x - TimeDelta::minutes(1))).unwrap()
        })
        .prop_map(|(x, second)| x + TimeDelta::seconds(second))
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Backward)]
}

// ============================================================================
// INVARIANT: SNAPPING IS IDEMPOTENT
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_snap_idempotent(engine in schedule(), x in instant(), dir in direction()) {
        let once = engine.snap_into_business_time(&x, dir).unwrap();
        let twice = engine.snap_into_business_time(&once, dir).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_snap_inside_window_is_identity(x in office_instant(), dir in direction()) {
        let engine = rome_office();
        prop_assert_eq!(engine.snap_into_business_time(&x, dir).unwrap(), x);
    }

    #[test]
    fn prop_snap_keeps_caller_offset(engine in schedule(), x in instant(), dir in direction()) {
        let snapped = engine.snap_into_business_time(&x, dir).unwrap();
        prop_assert_eq!(snapped.offset(), x.offset());
    }
}

// ============================================================================
// INVARIANT: INTERVALS ARE NON-NEGATIVE, MONOTONIC AND ADDITIVE
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_interval_non_negative(engine in schedule(), a in instant(), b in instant()) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let seconds = engine.compute_business_seconds_in_interval(&start, &end).unwrap();
        prop_assert!(seconds >= 0.0);
    }

    #[test]
    fn prop_interval_rejects_reversed(engine in schedule(), a in instant(), b in instant()) {
        prop_assume!(a != b);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(engine.compute_business_seconds_in_interval(&end, &start).is_err());
    }

    #[test]
    fn prop_interval_monotonic_in_end(
        engine in schedule(),
        a in instant(),
        b in instant(),
        c in instant(),
    ) {
        let mut points = [a, b, c];
        points.sort();
        let [start, near, far] = points;
        let short = engine.compute_business_seconds_in_interval(&start, &near).unwrap();
        let long = engine.compute_business_seconds_in_interval(&start, &far).unwrap();
        prop_assert!(long >= short, "{} < {}", long, short);
    }

    #[test]
    fn prop_interval_additive(
        engine in schedule(),
        a in instant(),
        b in instant(),
        c in instant(),
    ) {
        let mut points = [a, b, c];
        points.sort();
        let [start, mid, end] = points;
        let whole = engine.compute_business_seconds_in_interval(&start, &end).unwrap();
        let first = engine.compute_business_seconds_in_interval(&start, &mid).unwrap();
        let second = engine.compute_business_seconds_in_interval(&mid, &end).unwrap();
        prop_assert!((whole - (first + second)).abs() < 1e-6, "{} != {} + {}", whole, first, second);
    }

    #[test]
    fn prop_units_agree(engine in schedule(), a in instant(), b in instant()) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let seconds = engine.compute_business_seconds_in_interval(&start, &end).unwrap();
        let minutes = engine.compute_business_minutes_in_interval(&start, &end).unwrap();
        let hours = engine.compute_business_hours_in_interval(&start, &end).unwrap();
        let days = engine.compute_business_days_in_interval(&start, &end).unwrap();
        prop_assert!((seconds / 60.0 - minutes).abs() < 1e-6);
        prop_assert!((seconds / 3600.0 - hours).abs() < 1e-6);
        prop_assert!((engine.hours_to_days(hours) - days).abs() < 1e-9);
    }
}

// ============================================================================
// INVARIANT: SHIFTING
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_round_trip_restores_instant(x in office_instant(), minutes in 1i64..20_000) {
        let engine = rome_office();
        let seconds = minutes * 60;
        let forward = engine.add_business_seconds_to_date(&x, seconds).unwrap();
        let back = engine.remove_business_seconds_from_date(&forward, seconds).unwrap();
        prop_assert_eq!(back, x);
    }

    #[test]
    fn prop_shift_matches_interval(x in office_instant(), minutes in 1i64..20_000) {
        let engine = rome_office();
        let seconds = minutes * 60;
        let forward = engine.add_business_seconds_to_date(&x, seconds).unwrap();
        let measured = engine.compute_business_seconds_in_interval(&x, &forward).unwrap();
        prop_assert!((measured - seconds as f64).abs() < 1e-6, "{} != {}", measured, seconds);
    }

    #[test]
    fn prop_round_trip_stays_in_same_window(x in office_instant_with_seconds(), seconds in 1i64..200_000) {
        let engine = rome_office();
        let forward = engine.add_business_seconds_to_date(&x, seconds).unwrap();
        let back = engine.remove_business_seconds_from_date(&forward, seconds).unwrap();
        let drift = (back - x).num_seconds().abs();
        prop_assert!(back <= x);
        prop_assert!(drift < 120, "drifted {}s", drift);
        prop_assert!(engine.is_business_time(&back).unwrap());
    }

    #[test]
    fn prop_shift_results_are_minute_aligned(
        engine in schedule(),
        x in instant(),
        seconds in 1i64..500_000,
        dir in direction(),
    ) {
        let shifted = match dir {
            Direction::Forward => engine.add_business_seconds_to_date(&x, seconds).unwrap(),
            Direction::Backward => engine.remove_business_seconds_from_date(&x, seconds).unwrap(),
        };
        prop_assert_eq!(shifted.timestamp() % 60, 0);
        prop_assert_eq!(shifted.timestamp_subsec_nanos(), 0);
        prop_assert_eq!(shifted.offset(), x.offset());
    }

    #[test]
    fn prop_zero_shift_is_passthrough(engine in schedule(), x in instant(), nanos in 0u32..1_000_000_000) {
        let x = x + TimeDelta::nanoseconds(i64::from(nanos));
        prop_assert_eq!(engine.add_business_seconds_to_date(&x, 0).unwrap(), x);
        prop_assert_eq!(engine.remove_business_seconds_from_date(&x, 0).unwrap(), x);
        prop_assert_eq!(engine.add_business_hours_to_date(&x, 0.0).unwrap(), x);
    }

    #[test]
    fn prop_negative_shift_rejected(engine in schedule(), x in instant(), seconds in i64::MIN..0) {
        prop_assert!(engine.add_business_seconds_to_date(&x, seconds).is_err());
        prop_assert!(engine.remove_business_seconds_from_date(&x, seconds).is_err());
    }
}

// ============================================================================
// INVARIANT: HOLIDAYS WIN
// ============================================================================

proptest! {
    #[test]
    fn prop_holiday_precedence(day in 0i64..366) {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + TimeDelta::days(day);
        let holiday = date.format("%d/%m").to_string();
        let every_day = [
            "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        ];
        let engine = BusinessTimeEngine::new("Europe/Rome", &every_day, 9, 17, &[holiday.as_str()]).unwrap();
        let noon = Rome
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap();
        prop_assert!(!engine.is_business_day(&noon));
        prop_assert!(engine.is_business_day(&(noon + TimeDelta::days(1))));
    }
}

// ============================================================================
// NEGATIVE ASSERTIONS: CONFIGURATION
// ============================================================================

proptest! {
    #[test]
    fn prop_new_never_panics(
        tz in ".*",
        days in proptest::collection::vec(".*", 0..8),
        start in 0u32..40,
        end in 0u32..40,
        holidays in proptest::collection::vec(".*", 0..8),
    ) {
        let _ = BusinessTimeEngine::new(&tz, days.as_slice(), start, end, holidays.as_slice());
    }

    #[test]
    fn prop_degenerate_window_rejected(hour in 0u32..=24) {
        prop_assert!(BusinessTimeEngine::new("UTC", &WEEKDAYS, hour, hour, &["25/12"]).is_err());
    }
}

// ============================================================================
// CONCRETE SCENARIOS
// ============================================================================

#[test]
fn test_wednesday_late_window_spans_midnight_boundary() {
    let engine = wednesdays_only();
    // 2021-03-17 is a Wednesday; the window is 22:00-24:00 New York time
    let start: DateTime<FixedOffset> = DateTime::parse_from_rfc3339("2021-03-17T23:30:00-04:00").unwrap();
    let end: DateTime<FixedOffset> = DateTime::parse_from_rfc3339("2021-03-24T22:30:00-04:00").unwrap();
    let hours = engine.compute_business_hours_in_interval(&start, &end).unwrap();
    assert!((hours - 1.0).abs() < 1e-9, "got {}", hours);

    let shifted = engine.add_business_seconds_to_date(&start, 3600).unwrap();
    assert_eq!(shifted.to_rfc3339(), "2021-03-24T22:30:00-04:00");

    let back = engine.remove_business_seconds_from_date(&shifted, 3600).unwrap();
    assert_eq!(back, start);
}

#[test]
fn test_independent_engines_across_threads() {
    let handles: Vec<_> = ["Europe/Rome", "Asia/Tokyo", "America/Los_Angeles"]
        .into_iter()
        .map(|tz| {
            std::thread::spawn(move || {
                let engine = BusinessTimeEngine::new(tz, &WEEKDAYS, 9, 17, &["25/12"]).unwrap();
                let monday = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
                let friday = Utc.with_ymd_and_hms(2021, 3, 6, 0, 0, 0).unwrap();
                engine.compute_business_hours_in_interval(&monday, &friday).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let hours = handle.join().unwrap();
        assert!(hours > 0.0 && hours <= 40.0, "got {}", hours);
    }
}
