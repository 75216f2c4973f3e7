// src/linkedin/recency.rs
//! Converts "posted X ago" phrases and posting timestamps into an age in hours.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Result, ScoutError};

const HOURS_PER_DAY: f64 = 24.0;
const HOURS_PER_WEEK: f64 = 168.0;

/// Future timestamps within this many hours are treated as clock skew.
const MAX_FUTURE_SKEW_HOURS: f64 = 1.0;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a relative phrase such as "3 days ago" into hours.
pub fn parse_recency(text: &str) -> Result<f64> {
    parse_relative(text).ok_or_else(|| ScoutError::UnparseableRecency(text.to_string()))
}

#[derive(Debug, Clone, Copy)]
pub struct RecencyParser {
    now: DateTime<Utc>,
}

impl RecencyParser {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.now
    }

    /// Accepts relative phrases and absolute timestamps (UTC when no offset
    /// is given).
    pub fn parse(&self, text: &str) -> Result<f64> {
        if let Some(hours) = parse_relative(text) {
            return Ok(hours);
        }

        let posted_at = parse_timestamp(text.trim())
            .ok_or_else(|| ScoutError::UnparseableRecency(text.to_string()))?;

        let hours = (self.now - posted_at).num_seconds() as f64 / 3600.0;
        if hours >= 0.0 {
            Ok(hours)
        } else if hours >= -MAX_FUTURE_SKEW_HOURS {
            Ok(0.0)
        } else {
            Err(ScoutError::UnparseableRecency(text.to_string()))
        }
    }
}

fn parse_relative(text: &str) -> Option<f64> {
    let lower = text.trim().to_lowercase();
    let mut tokens: Vec<&str> = lower.split_whitespace().collect();

    if matches!(tokens.first(), Some(&"posted") | Some(&"reposted")) {
        tokens.remove(0);
    }
    if tokens.last() == Some(&"ago") {
        tokens.pop();
    }

    let [count, unit] = tokens.as_slice() else {
        return None;
    };

    let count: f64 = match *count {
        "a" | "an" | "one" => 1.0,
        digits => digits.parse::<u32>().ok()? as f64,
    };

    let hours = match *unit {
        "minute" | "minutes" | "min" | "mins" => count / 60.0,
        "hour" | "hours" | "hr" | "hrs" => count,
        "day" | "days" => count * HOURS_PER_DAY,
        "week" | "weeks" => count * HOURS_PER_WEEK,
        _ => return None,
    };

    Some(hours)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
