// src/linkedin/decision_makers.rs
//! Asynchronous decision-maker search: submit, poll, fetch.
//!
//! The client only records state and talks to the API. It never sleeps
//! between polls; pacing belongs to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::geo::GeoTable;
use crate::config::{DecisionMakerDefaults, ScoutConfig};
use crate::core::RapidApiClient;
use crate::error::{Result, ScoutError};

const SUBMIT_ENDPOINT: &str = "/search-decision-makers";
const STATUS_ENDPOINT: &str = "/check-search-status";
const RESULTS_ENDPOINT: &str = "/get-search-results";

/// Finished requests stay fetchable this long after their last update.
const FINISHED_RETENTION_HOURS: i64 = 1;
/// Requests nobody has polled for this long are dropped whatever their state.
const ABANDONED_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl RequestStatus {
    /// Map the API's status vocabulary onto the four states.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" | "queued" | "submitted" | "waiting" => Some(Self::Pending),
            "running" | "processing" | "in_progress" | "in progress" | "started" => {
                Some(Self::Running)
            }
            "complete" | "completed" | "done" | "finished" | "success" | "succeeded" => {
                Some(Self::Complete)
            }
            "failed" | "failure" | "error" | "cancelled" | "canceled" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionMakerRequest {
    pub request_id: String,
    pub status: RequestStatus,
    pub company_ids: BTreeSet<u64>,
    pub title_keywords: BTreeSet<String>,
    pub geo_codes: Vec<u64>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person returned by a completed search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionMakerRecord {
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "job_title", alias = "headline")]
    pub title: Option<String>,
    #[serde(default, alias = "company_name")]
    pub company: Option<String>,
    #[serde(default, alias = "linkedin_url", alias = "profile_link", alias = "url")]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    company_ids: &'a BTreeSet<u64>,
    title_keywords: &'a BTreeSet<String>,
    geo_codes: &'a [u64],
    limit: String,
}

pub struct DecisionMakerSearchClient {
    api: Arc<RapidApiClient>,
    geo: GeoTable,
    defaults: DecisionMakerDefaults,
    requests: Mutex<HashMap<String, DecisionMakerRequest>>,
}

impl DecisionMakerSearchClient {
    pub fn new(api: Arc<RapidApiClient>, geo: GeoTable, defaults: DecisionMakerDefaults) -> Self {
        Self {
            api,
            geo,
            defaults,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ScoutConfig, api: Arc<RapidApiClient>) -> Self {
        Self::new(api, config.geo.clone(), config.decision_makers.clone())
    }

    /// Start a search. Empty title or geo lists fall back to the configured
    /// defaults; every geo code must be a known region.
    pub async fn submit(
        &self,
        company_ids: &[u64],
        title_keywords: &[String],
        geo_codes: &[u64],
    ) -> Result<String> {
        let geo_codes: Vec<u64> = if geo_codes.is_empty() {
            self.defaults.geo_codes.clone()
        } else {
            geo_codes.to_vec()
        };
        for code in &geo_codes {
            self.geo.region(*code)?;
        }

        let titles: BTreeSet<String> = if title_keywords.iter().all(|t| t.trim().is_empty()) {
            self.defaults.titles.iter().cloned().collect()
        } else {
            title_keywords
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        };
        let company_ids: BTreeSet<u64> = company_ids.iter().copied().collect();

        let payload = SubmitPayload {
            company_ids: &company_ids,
            title_keywords: &titles,
            geo_codes: &geo_codes,
            limit: self.defaults.limit.to_string(),
        };

        let body: Value = self.api.post_json(SUBMIT_ENDPOINT, &payload).await?;
        let request_id = extract_request_id(&body).ok_or_else(|| {
            ScoutError::UnexpectedResponse(format!("no request_id in submit response: {}", body))
        })?;
        let status = extract_status(&body).unwrap_or(RequestStatus::Pending);

        let now = Utc::now();
        let request = DecisionMakerRequest {
            request_id: request_id.clone(),
            status,
            company_ids,
            title_keywords: titles,
            geo_codes,
            submitted_at: now,
            updated_at: now,
        };

        info!(request_id = %request_id, "Decision maker search submitted");
        let mut requests = self.lock();
        prune(&mut requests, now);
        requests.insert(request_id.clone(), request);
        Ok(request_id)
    }

    /// Ask the API once for the current status. Terminal states are answered
    /// from memory.
    pub async fn poll(&self, request_id: &str) -> Result<RequestStatus> {
        let current = self.tracked_status(request_id)?;
        if current.is_terminal() {
            return Ok(current);
        }

        let body: Value = self
            .api
            .get_json(STATUS_ENDPOINT, &[("request_id", request_id)])
            .await?;
        let status = extract_status(&body).ok_or_else(|| {
            ScoutError::UnexpectedResponse(format!("unrecognised search status: {}", body))
        })?;

        if let Some(request) = self.lock().get_mut(request_id) {
            request.status = status;
            request.updated_at = Utc::now();
        }

        match status {
            RequestStatus::Failed => {
                warn!(request_id = %request_id, "Decision maker search failed")
            }
            _ => info!(request_id = %request_id, "Decision maker search status: {}", status),
        }
        Ok(status)
    }

    /// Results of a completed search. Anything else is an error: the caller
    /// never receives partial results.
    pub async fn fetch(&self, request_id: &str) -> Result<Vec<DecisionMakerRecord>> {
        match self.tracked_status(request_id)? {
            RequestStatus::Complete => {}
            RequestStatus::Failed => return Err(ScoutError::RequestFailed(request_id.to_string())),
            status => {
                return Err(ScoutError::NotReady {
                    request_id: request_id.to_string(),
                    status,
                })
            }
        }

        let body: Value = self
            .api
            .get_json(RESULTS_ENDPOINT, &[("request_id", request_id)])
            .await?;

        let items = match body.get("results").or_else(|| body.get("data")) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(ScoutError::UnexpectedResponse(format!(
                    "results is not an array: {}",
                    other
                )))
            }
        };

        let records: Vec<DecisionMakerRecord> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(request_id = %request_id, "Skipping malformed decision maker: {}", e);
                    None
                }
            })
            .collect();

        info!(
            request_id = %request_id,
            count = records.len(),
            "Fetched decision makers"
        );
        Ok(records)
    }

    /// Snapshot of a tracked request.
    pub fn request(&self, request_id: &str) -> Option<DecisionMakerRequest> {
        self.lock().get(request_id).cloned()
    }

    fn tracked_status(&self, request_id: &str) -> Result<RequestStatus> {
        self.lock()
            .get(request_id)
            .map(|request| request.status)
            .ok_or_else(|| ScoutError::UnknownRequest(request_id.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DecisionMakerRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn prune(requests: &mut HashMap<String, DecisionMakerRequest>, now: DateTime<Utc>) {
    let before = requests.len();
    requests.retain(|_, request| {
        let idle = now - request.updated_at;
        if request.status.is_terminal() {
            idle < Duration::hours(FINISHED_RETENTION_HOURS)
        } else {
            idle < Duration::hours(ABANDONED_RETENTION_HOURS)
        }
    });

    let dropped = before - requests.len();
    if dropped > 0 {
        debug!(dropped, "Evicted stale decision maker requests");
    }
}

fn extract_request_id(body: &Value) -> Option<String> {
    let candidate = body
        .get("request_id")
        .or_else(|| body.get("data").and_then(|data| data.get("request_id")))
        .or_else(|| body.get("data"))?;

    match candidate {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn extract_status(body: &Value) -> Option<RequestStatus> {
    let candidate = body
        .get("status")
        .or_else(|| body.get("data").and_then(|data| data.get("status")))
        .or_else(|| body.get("data"))?;

    candidate.as_str().and_then(RequestStatus::parse)
}
