use crate::error::ConfigError;
use crate::scenario::RunOptions;
use clap::Parser;
use std::time::Duration;

/// Drive simulated users against an HTTP target and report round-trip times.
#[derive(Debug, Parser)]
#[command(name = "checkout-user", version)]
pub struct Cli {
    /// Origin to send requests to, overrides the user class host
    #[arg(long, env = "CHECKOUT_HOST")]
    pub host: Option<String>,

    /// Number of concurrent simulated users
    #[arg(short, long, env = "CHECKOUT_USERS", default_value_t = 1)]
    pub users: usize,

    /// Users started per second
    #[arg(short = 'r', long, env = "CHECKOUT_SPAWN_RATE", default_value_t = 1.0)]
    pub spawn_rate: f64,

    /// Stop after this long, e.g. 30s, 5m, 1h30m
    #[arg(short = 't', long, env = "CHECKOUT_RUN_TIME", value_parser = parse_duration)]
    pub run_time: Option<Duration>,

    /// Tasks each user runs before stopping
    #[arg(short, long, env = "CHECKOUT_ITERATIONS")]
    pub iterations: Option<usize>,

    /// Per-request timeout, e.g. 10s
    #[arg(
        long,
        env = "CHECKOUT_REQUEST_TIMEOUT",
        value_parser = parse_duration,
        default_value = "60s"
    )]
    pub request_timeout: Duration,

    /// User class to run, defaults to the first registered one
    #[arg(long)]
    pub user_class: Option<String>,

    /// List registered user classes and exit
    #[arg(long)]
    pub list: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Record requests in memory instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::NotPositive { field: "users" });
        }
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(ConfigError::NotPositive { field: "spawn rate" });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "request timeout",
            });
        }
        if self.iterations == Some(0) {
            return Err(ConfigError::NotPositive { field: "iterations" });
        }
        Ok(RunOptions {
            users: self.users,
            spawn_rate: self.spawn_rate,
            run_time: self.run_time,
            iterations: self.iterations,
            request_timeout: self.request_timeout,
        })
    }
}

/// Parses `90`, `30s`, `5m`, `2h` and combinations such as `1h30m`.
/// A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let s = s.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let mut total = 0u64;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            _ => return Err(invalid()),
        };
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(Duration::from_secs(total))
}
