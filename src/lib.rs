//! businesstime - business hours arithmetic
//!
//! Counts the business time between two instants and shifts instants by a
//! business-time duration, given a weekly pattern of business days, a daily
//! window, recurring holidays and an IANA timezone.

pub mod calendar;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod schedule;

pub use calendar::{compute_working_hours, parse_instant, Direction, Holiday, TimeUnit};
pub use engine::BusinessTimeEngine;
pub use error::{BusinessTimeError, Result};
