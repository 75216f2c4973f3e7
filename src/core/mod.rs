// src/core/mod.rs
//! Shared plumbing for the job-feed clients

pub mod api_client;
pub mod rate_limiter;

pub use api_client::RapidApiClient;
pub use rate_limiter::{Clock, ManualClock, RateLimiter, SystemClock};
