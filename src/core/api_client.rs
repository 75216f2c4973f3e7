// src/core/api_client.rs
//! Authenticated JSON client for the RapidAPI LinkedIn data endpoints.
//!
//! Every attempt waits for a rate-limiter slot first. Transient failures
//! (transport errors, 429, 5xx) are retried with a doubling backoff; anything
//! else is returned to the caller on the first attempt.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::rate_limiter::RateLimiter;
use crate::config::ApiConfig;
use crate::error::{Result, ScoutError};

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

pub struct RapidApiClient {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_key: Option<String>,
    max_attempts: u32,
    retry_backoff: Duration,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for RapidApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapidApiClient")
            .field("base_url", &self.base_url)
            .field("host", &self.host)
            .field("configured", &self.is_configured())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl RapidApiClient {
    pub fn new(config: &ApiConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        if config.max_attempts == 0 {
            return Err(ScoutError::config("max_attempts must be at least 1"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ScoutError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            host: config.host.clone(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            max_attempts: config.max_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            limiter,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<T, R>(&self, endpoint: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        self.execute(&url, || self.client.post(&url).json(payload))
            .await
    }

    /// GET with query parameters and decode the JSON response.
    pub async fn get_json<R>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        self.execute(&url, || self.client.get(&url).query(query))
            .await
    }

    async fn execute<R, F>(&self, url: &str, build: F) -> Result<R>
    where
        R: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let api_key = self.api_key.as_deref().ok_or(ScoutError::Unavailable)?;
        let mut attempt = 1;

        loop {
            self.limiter.acquire().await;
            debug!(url = %url, attempt, "Calling job API");

            let request = build()
                .header(API_KEY_HEADER, api_key)
                .header(API_HOST_HEADER, &self.host);

            let error = match send_once(request).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                warn!(url = %url, attempts = attempt, "Giving up on job API call: {}", error);
                return Err(ScoutError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = retry_delay(self.retry_backoff, attempt);
            warn!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Transient job API failure, retrying: {}",
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

async fn send_once<R: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<R> {
    let response = request
        .send()
        .await
        .map_err(|e| ScoutError::Transport(e.to_string()))?;

    let status = response.status();
    trace!("Response status: {}", status);

    let body = response
        .text()
        .await
        .map_err(|e| ScoutError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ScoutError::Http {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        ScoutError::UnexpectedResponse(format!("{} (body: {})", e, truncate(&body, 200)))
    })
}

/// Doubling delay after the given failed attempt, capped at `MAX_RETRY_DELAY`.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    fn config(base_url: &str, api_key: Option<&str>) -> ApiConfig {
        ApiConfig {
            api_key: api_key.map(str::to_string),
            host: "jobs.example".to_string(),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_attempts: 3,
            retry_backoff_ms: 1,
        }
    }

    fn client(base_url: &str, api_key: Option<&str>) -> RapidApiClient {
        let limiter = Arc::new(RateLimiter::new(100, 60).unwrap());
        RapidApiClient::new(&config(base_url, api_key), limiter).unwrap()
    }

    #[tokio::test]
    async fn test_sends_credential_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search-jobs")
            .match_header("x-rapidapi-key", "secret")
            .match_header("x-rapidapi-host", "jobs.example")
            .match_body(Matcher::PartialJson(serde_json::json!({"keywords": "paraplanner"})))
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let value: serde_json::Value = client
            .post_json("/search-jobs", &serde_json::json!({"keywords": "paraplanner"}))
            .await
            .unwrap();

        assert_eq!(value["data"], serde_json::json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client(&server.url(), None);
        let result: Result<serde_json::Value> = client.get_json("/get-job-details", &[]).await;

        assert!(matches!(result, Err(ScoutError::Unavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_transient_errors_then_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/check-search-status")
            .match_query(Matcher::UrlEncoded("request_id".into(), "r1".into()))
            .with_status(503)
            .with_body("busy")
            .expect(3)
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let result: Result<serde_json::Value> = client
            .get_json("/check-search-status", &[("request_id", "r1")])
            .await;

        match result {
            Err(ScoutError::RetriesExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/get-job-details")
            .with_status(404)
            .with_body("not found")
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let result: Result<serde_json::Value> = client.get_json("/get-job-details", &[]).await;

        assert!(matches!(result, Err(ScoutError::Http { status: 404, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_json_is_unexpected_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/get-search-results")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let result: Result<serde_json::Value> = client.get_json("/get-search-results", &[]).await;

        assert!(matches!(result, Err(ScoutError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn test_each_attempt_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/check-search-status")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let _: Result<serde_json::Value> = client.get_json("/check-search-status", &[]).await;

        assert_eq!(client.limiter().in_window(), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let mut server = mockito::Server::new_async().await;
        let busy = server
            .mock("GET", "/check-search-status")
            .with_status(503)
            .with_body("busy")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/check-search-status")
            .with_status(200)
            .with_body(r#"{"status": "running"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let value: serde_json::Value = client
            .get_json("/check-search-status", &[("request_id", "r1")])
            .await
            .unwrap();

        assert_eq!(value["status"], "running");
        assert_eq!(client.limiter().in_window(), 2);
        busy.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_stalled_response_times_out_and_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let stalled = server
            .mock("POST", "/search-jobs")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(1_200));
                w.write_all(br#"{"data": []}"#)
            })
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/search-jobs")
            .with_status(200)
            .with_body(r#"{"data": [{"job_title": "Paraplanner"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut config = config(&server.url(), Some("secret"));
        config.timeout_seconds = 1;
        let limiter = Arc::new(RateLimiter::new(100, 60).unwrap());
        let client = RapidApiClient::new(&config, limiter).unwrap();

        let value: serde_json::Value = client
            .post_json("/search-jobs", &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(value["data"][0]["job_title"], "Paraplanner");
        assert_eq!(client.limiter().in_window(), 2);
        stalled.assert_async().await;
        ok.assert_async().await;
    }

    #[test]
    fn test_retry_delay_doubles_up_to_cap() {
        let base = Duration::from_millis(500);
        assert_eq!(retry_delay(base, 1), Duration::from_millis(500));
        assert_eq!(retry_delay(base, 2), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 4), Duration::from_secs(4));
        assert_eq!(retry_delay(base, 10), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(base, 40), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::from_millis(u64::MAX), 3), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
