// src/error.rs
//! Error taxonomy for the job feed.
//!
//! - configuration problems surface at construction/load time
//! - transport problems are retried by the API client before surfacing
//! - data-quality problems are per-record and never abort a batch

use thiserror::Error;

use crate::linkedin::RequestStatus;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown geo code: {0}")]
    UnknownGeoCode(u64),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    /// Rate limiter constructed with a zero quota or zero window
    #[error("Invalid rate limit: {max_calls} calls per {window_seconds}s")]
    InvalidRateLimit { max_calls: u32, window_seconds: u64 },

    /// No API key configured
    #[error("Job API unavailable: RAPIDAPI_KEY not configured")]
    Unavailable,

    #[error("Unparseable recency: {0:?}")]
    UnparseableRecency(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("HTTP {status} error: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Results requested before the remote search completed
    #[error("Decision maker search {request_id} not ready (status: {status})")]
    NotReady {
        request_id: String,
        status: RequestStatus,
    },

    /// Terminal failure; the request id must not be reused
    #[error("Decision maker search {0} failed")]
    RequestFailed(String),

    #[error("Unknown decision maker request: {0}")]
    UnknownRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScoutError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether another attempt of the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable code used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidRateLimit { .. } => "CONFIG_ERROR",
            Self::UnknownGeoCode(_) | Self::UnknownLocation(_) => "UNKNOWN_REGION",
            Self::Unavailable => "SERVICE_UNAVAILABLE",
            Self::UnparseableRecency(_) | Self::MissingField(_) => "DATA_ERROR",
            Self::Http { .. } | Self::Transport(_) | Self::RetriesExhausted { .. } => {
                "UPSTREAM_ERROR"
            }
            Self::UnexpectedResponse(_) => "UNEXPECTED_RESPONSE",
            Self::NotReady { .. } => "NOT_READY",
            Self::RequestFailed(_) => "REQUEST_FAILED",
            Self::UnknownRequest(_) => "UNKNOWN_REQUEST",
            Self::Io(_) | Self::Csv(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScoutError::Transport("timeout".into()).is_transient());
        assert!(ScoutError::Http {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(ScoutError::Http {
            status: 429,
            body: String::new()
        }
        .is_transient());
        assert!(!ScoutError::Http {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!ScoutError::Unavailable.is_transient());
    }

    #[test]
    fn test_not_ready_message_names_status() {
        let err = ScoutError::NotReady {
            request_id: "abc".into(),
            status: RequestStatus::Running,
        };
        assert_eq!(
            err.to_string(),
            "Decision maker search abc not ready (status: running)"
        );
        assert_eq!(err.code(), "NOT_READY");
    }
}
