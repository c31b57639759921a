//! Error types returned by the business-time engine

use thiserror::Error;

/// Everything that can go wrong while configuring or querying the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusinessTimeError {
    /// Interval start lies after its end
    #[error("Ordering error: start {start} is after end {end}")]
    Ordering { start: String, end: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    /// Caller passed a negative or non-finite duration
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A day-walking loop gave up; unreachable for validated configurations
    #[error("No business day found within {days} days")]
    NoBusinessDay { days: u32 },
}

/// Result type alias for business-time operations
pub type Result<T> = std::result::Result<T, BusinessTimeError>;
