// src/web/types.rs
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::linkedin::{DatePosted, ParseReport, SearchStatus, SortOrder};
use crate::JobFeed;

/// Shared state managed by Rocket.
pub struct AppState {
    pub feed: JobFeed,
    pub last_run: RwLock<Option<RunSummary>>,
}

impl AppState {
    pub fn new(feed: JobFeed) -> Self {
        Self {
            feed,
            last_run: RwLock::new(None),
        }
    }
}

/// Summary of the most recent sweep.
#[derive(Debug, Clone, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: SearchStatus,
    pub jobs_found: usize,
    pub report: ParseReport,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

// Request bodies carry an optional conversation_id echoed back in the reply
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SearchRequest {
    pub keywords: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub geo_code: Option<u64>,
    #[serde(default)]
    pub date_posted: Option<DatePosted>,
    #[serde(default)]
    pub industries: Option<Vec<String>>,
    #[serde(default)]
    pub sort_by: Option<SortOrder>,
}

/// Empty body runs the configured daily sweep.
#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SweepRequest {
    #[serde(default)]
    pub cities: Option<Vec<String>>,
    #[serde(default)]
    pub terms: Option<Vec<String>>,
    #[serde(default)]
    pub date_posted: Option<DatePosted>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct DecisionMakerSubmitRequest {
    #[serde(default)]
    pub company_ids: Vec<u64>,
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub geo_codes: Vec<u64>,
}

impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl<T> ActionResponse<T> {
    pub fn success(message: String, action: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            data,
            next_actions: None,
            conversation_id,
        }
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        self.next_actions = Some(next_actions);
        self
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}
