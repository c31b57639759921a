use anyhow::{bail, Context, Result};
#[cfg(test)]
use std::collections::HashMap;
use std::env;

use crate::calendar::{parse_weekday, Holiday};
use crate::engine::BusinessTimeEngine;

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_BUSINESS_DAYS: &str = "monday,tuesday,wednesday,thursday,friday";
pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 17;

#[derive(Debug, Clone)]
pub struct Config {
    // IANA zone all business decisions are taken in
    pub timezone: String,

    // Lowercase weekday names, e.g. "monday"
    pub business_days: Vec<String>,

    // Daily window, whole hours in [0, 24]
    pub start_hour: u32,
    pub end_hour: u32,

    // Recurring DD/MM dates
    pub holidays: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            timezone: get("BUSINESS_TIMEZONE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),

            business_days: split_list(
                &get("BUSINESS_DAYS").unwrap_or_else(|| DEFAULT_BUSINESS_DAYS.to_string()),
            )
            .into_iter()
            .map(|d| d.to_lowercase())
            .collect(),

            start_hour: match get("BUSINESS_START_HOUR") {
                Some(s) => s
                    .trim()
                    .parse()
                    .context("BUSINESS_START_HOUR must be a whole hour between 0 and 24")?,
                None => DEFAULT_START_HOUR,
            },
            end_hour: match get("BUSINESS_END_HOUR") {
                Some(s) => s
                    .trim()
                    .parse()
                    .context("BUSINESS_END_HOUR must be a whole hour between 0 and 24")?,
                None => DEFAULT_END_HOUR,
            },

            holidays: split_list(&get("BUSINESS_HOLIDAYS").unwrap_or_default()),
        })
    }

    /// Create config from a HashMap (convenience for testing)
    #[cfg(test)]
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(format!(
                "BUSINESS_TIMEZONE '{}' is not an IANA timezone (e.g. Europe/Rome).",
                self.timezone
            ));
        }

        if self.business_days.is_empty() {
            errors.push("BUSINESS_DAYS must list at least one weekday.".to_string());
        }
        for day in &self.business_days {
            if parse_weekday(day).is_err() {
                errors.push(format!(
                    "BUSINESS_DAYS entry '{}' is not a weekday name (monday..sunday).",
                    day
                ));
            }
        }

        if self.start_hour > 24 || self.end_hour > 24 {
            errors.push(format!(
                "BUSINESS_START_HOUR/BUSINESS_END_HOUR must be within 0-24, got {}-{}.",
                self.start_hour, self.end_hour
            ));
        } else if self.start_hour >= self.end_hour {
            errors.push(format!(
                "BUSINESS_START_HOUR ({}) must be earlier than BUSINESS_END_HOUR ({}).",
                self.start_hour, self.end_hour
            ));
        }

        for holiday in &self.holidays {
            if holiday.parse::<Holiday>().is_err() {
                errors.push(format!(
                    "BUSINESS_HOLIDAYS entry '{}' invalid. Expected DD/MM.",
                    holiday
                ));
            }
        }

        if errors.is_empty() {
            // Anything left (e.g. holidays covering the whole year) surfaces from the engine itself
            self.build_engine().map(|_| ())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }

    /// Construct the engine described by this configuration
    pub fn build_engine(&self) -> Result<BusinessTimeEngine> {
        BusinessTimeEngine::new(
            &self.timezone,
            self.business_days.as_slice(),
            self.start_hour,
            self.end_hour,
            self.holidays.as_slice(),
        )
        .context("Invalid business time configuration")
    }
}

/// Split a comma separated list, dropping blank entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn hour_parsing_never_panics(start in ".*", end in ".*") {
            let mut env: HashMap<&str, String> = HashMap::new();
            env.insert("BUSINESS_START_HOUR", start);
            env.insert("BUSINESS_END_HOUR", end);
            if let Ok(config) = Config::from_getter(|key| env.get(key).cloned()) {
                let _ = config.validate();
            }
        }

        #[test]
        fn valid_windows_build(start in 0u32..24u32, len in 1u32..=24u32) {
            let end = (start + len).min(24);
            prop_assume!(end > start);
            let mut env: HashMap<&str, String> = HashMap::new();
            env.insert("BUSINESS_START_HOUR", start.to_string());
            env.insert("BUSINESS_END_HOUR", end.to_string());
            let config = Config::from_getter(|key| env.get(key).cloned()).unwrap();
            prop_assert!(config.validate().is_ok());
            prop_assert_eq!(config.build_engine().unwrap().working_hours(), end - start);
        }
    }
}
