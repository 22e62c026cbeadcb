//! Simulated-user load profile for a checkout endpoint, plus the small
//! driver that runs it: users pick a weighted task, run it, idle for a
//! sampled wait, and repeat until stopped.

pub mod client;
pub mod config;
pub mod error;
pub mod profile;
pub mod registry;
pub mod scenario;
pub mod statistics;
pub mod task;
pub mod transport;
pub mod user;
pub mod wait;

pub use client::HttpClient;
pub use profile::UserBehaviorProfile;
pub use scenario::{run, RunOptions};
pub use statistics::RunReport;
pub use user::{checkout, checkout_user, HttpUser};
pub use wait::WaitTime;
