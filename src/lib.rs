// src/lib.rs
//! Rate-limited LinkedIn job feed: search, normalize and filter postings,
//! and look up decision makers through the RapidAPI LinkedIn data service.

use std::sync::Arc;
use tracing::info;

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod linkedin;
pub mod utils;
pub mod web;

pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
pub use web::start_web_server;

use crate::core::{RapidApiClient, RateLimiter};
use crate::linkedin::{
    filter_by_recency, DatePosted, DecisionMakerSearchClient, JobSearchClient, SearchOutcome,
};

/// Both clients wired over one API client, so they share a single rate
/// limiter.
pub struct JobFeed {
    config: ScoutConfig,
    jobs: JobSearchClient,
    decision_makers: DecisionMakerSearchClient,
}

impl JobFeed {
    pub fn new(config: ScoutConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_calls,
            config.rate_limit.window_seconds,
        )?);
        Self::with_limiter(config, limiter)
    }

    pub fn with_limiter(config: ScoutConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let api = Arc::new(RapidApiClient::new(&config.api, limiter)?);

        Ok(Self {
            jobs: JobSearchClient::from_config(&config, Arc::clone(&api)),
            decision_makers: DecisionMakerSearchClient::from_config(&config, api),
            config,
        })
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn jobs(&self) -> &JobSearchClient {
        &self.jobs
    }

    pub fn decision_makers(&self) -> &DecisionMakerSearchClient {
        &self.decision_makers
    }

    pub fn is_configured(&self) -> bool {
        self.config.api.is_configured()
    }

    /// Cities that have both a geo code and a location rule.
    pub fn sweep_cities(&self) -> Vec<String> {
        self.config
            .policy
            .rules()
            .iter()
            .filter(|rule| self.config.geo.code_for(&rule.name).is_ok())
            .map(|rule| rule.name.clone())
            .collect()
    }

    /// The daily run: every sweep city × configured role keyword, limited to
    /// postings younger than `JOBS_WINDOW_HOURS`.
    pub async fn daily_sweep(&self) -> Result<SearchOutcome> {
        let window_hours = self.config.search.window_hours;
        let cities = self.sweep_cities();
        info!(
            cities = cities.len(),
            terms = self.config.search.role_keywords.len(),
            window_hours,
            "Starting daily job sweep"
        );

        let date_posted = DatePosted::covering(window_hours);
        let mut outcome = self
            .jobs
            .search_all(
                cities.as_slice(),
                self.config.search.role_keywords.as_slice(),
                date_posted,
            )
            .await?;

        let before = outcome.records.len();
        outcome.records = filter_by_recency(outcome.records, f64::from(window_hours));
        outcome.report.outside_window += before - outcome.records.len();
        outcome.report.kept = outcome.records.len();

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ScoutConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScoutConfig::from_lookup(move |key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_sweep_cities_skip_unruled_regions() {
        let feed = JobFeed::new(config(&[])).unwrap();
        assert_eq!(
            feed.sweep_cities(),
            vec!["Melbourne", "Perth", "Brisbane", "Adelaide"]
        );
    }

    #[tokio::test]
    async fn test_daily_sweep_without_key_is_unavailable() {
        let feed = JobFeed::new(config(&[])).unwrap();
        assert!(!feed.is_configured());

        let outcome = feed.daily_sweep().await.unwrap();
        assert_eq!(outcome.status, crate::linkedin::SearchStatus::Unavailable);
        assert!(outcome.records.is_empty());
    }
}
