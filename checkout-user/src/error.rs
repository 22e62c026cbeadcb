use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Invalid wait-time bounds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaitTimeError {
    #[error("Wait time bounds must be non-negative durations, got [{min}, {max}]")]
    InvalidBound { min: f64, max: f64 },

    #[error("Wait time min {min} is greater than max {max}")]
    MinAboveMax { min: f64, max: f64 },
}

/// Errors raised while declaring a user profile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: &'static str },

    #[error("Invalid wait time: {0}")]
    WaitTime(#[from] WaitTimeError),

    #[error("Task {name:?} must have a weight of at least 1")]
    ZeroWeight { name: &'static str },

    #[error("User {name:?} declares no tasks")]
    NoTasks { name: String },
}

/// A failed request, as classified for the run report.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid request uri {uri:?}")]
    InvalidUri {
        uri: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected status {0}")]
    Status(StatusCode),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("User class {0:?} is already registered")]
    Duplicate(String),

    #[error("Unknown user class {name:?}, known: {known}")]
    Unknown { name: String, known: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid duration {0:?}, use forms like 30s, 5m, 1h or 1h30m")]
    InvalidDuration(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}
