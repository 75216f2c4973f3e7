// src/linkedin/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::geo::GeoTable;
use super::recency::RecencyParser;
use crate::error::{Result, ScoutError};
use crate::utils::{clean_text, derive_company_id, extract_requirements};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePosted {
    #[serde(rename = "Any time", alias = "any_time")]
    AnyTime,
    #[serde(rename = "Past month", alias = "past_month")]
    PastMonth,
    #[serde(rename = "Past week", alias = "past_week")]
    PastWeek,
    #[serde(rename = "Past 24 hours", alias = "past_24_hours")]
    Past24Hours,
}

impl DatePosted {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnyTime => "Any time",
            Self::PastMonth => "Past month",
            Self::PastWeek => "Past week",
            Self::Past24Hours => "Past 24 hours",
        }
    }

    /// Recency window in hours, `None` for no limit.
    pub fn max_age_hours(&self) -> Option<f64> {
        match self {
            Self::AnyTime => None,
            Self::PastMonth => Some(720.0),
            Self::PastWeek => Some(168.0),
            Self::Past24Hours => Some(24.0),
        }
    }

    /// Narrowest API bucket that still covers `hours`.
    pub fn covering(hours: u32) -> Self {
        match hours {
            0..=24 => Self::Past24Hours,
            25..=168 => Self::PastWeek,
            169..=720 => Self::PastMonth,
            _ => Self::AnyTime,
        }
    }
}

impl Default for DatePosted {
    fn default() -> Self {
        Self::Past24Hours
    }
}

impl fmt::Display for DatePosted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatePosted {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "any time" | "any" => Ok(Self::AnyTime),
            "past month" | "month" => Ok(Self::PastMonth),
            "past week" | "week" => Ok(Self::PastWeek),
            "past 24 hours" | "24h" | "day" => Ok(Self::Past24Hours),
            _ => Err(ScoutError::config(format!("Unknown date_posted window: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "Most relevant", alias = "most_relevant")]
    MostRelevant,
    #[serde(rename = "Most recent", alias = "most_recent")]
    MostRecent,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::MostRelevant
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MostRelevant => f.write_str("Most relevant"),
            Self::MostRecent => f.write_str("Most recent"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "most relevant" | "relevant" => Ok(Self::MostRelevant),
            "most recent" | "recent" => Ok(Self::MostRecent),
            _ => Err(ScoutError::config(format!("Unknown sort order: {}", s))),
        }
    }
}

/// Validated input of a job search. The geo code is checked against the
/// configured region table on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    keywords: String,
    geo_code: u64,
    date_posted: DatePosted,
    industries: BTreeSet<String>,
    sort_order: SortOrder,
}

impl SearchCriteria {
    pub fn new(keywords: &str, geo_code: u64, geo: &GeoTable) -> Result<Self> {
        geo.region(geo_code)?;

        Ok(Self {
            keywords: keywords.trim().to_string(),
            geo_code,
            date_posted: DatePosted::default(),
            industries: BTreeSet::new(),
            sort_order: SortOrder::default(),
        })
    }

    pub fn for_city(keywords: &str, city: &str, geo: &GeoTable) -> Result<Self> {
        let geo_code = geo.code_for(city)?;
        Self::new(keywords, geo_code, geo)
    }

    pub fn with_date_posted(mut self, date_posted: DatePosted) -> Self {
        self.date_posted = date_posted;
        self
    }

    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.industries = industries
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.trim().is_empty())
            .collect();
        self
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn geo_code(&self) -> u64 {
        self.geo_code
    }

    pub fn date_posted(&self) -> DatePosted {
        self.date_posted
    }

    pub fn to_request(&self) -> SearchJobsRequest {
        SearchJobsRequest {
            keywords: self.keywords.clone(),
            geo_code: self.geo_code,
            date_posted: self.date_posted,
            experience_levels: Vec::new(),
            company_ids: Vec::new(),
            title_ids: Vec::new(),
            onsite_remotes: Vec::new(),
            functions: Vec::new(),
            industries: self.industries.iter().cloned().collect(),
            job_types: Vec::new(),
            sort_by: self.sort_order,
            easy_apply: false,
            under_10_applicants: false,
            start: 0,
        }
    }
}

/// Body of `POST /search-jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchJobsRequest {
    pub keywords: String,
    pub geo_code: u64,
    pub date_posted: DatePosted,
    pub experience_levels: Vec<String>,
    pub company_ids: Vec<String>,
    pub title_ids: Vec<String>,
    pub onsite_remotes: Vec<String>,
    pub functions: Vec<String>,
    pub industries: Vec<String>,
    pub job_types: Vec<String>,
    pub sort_by: SortOrder,
    #[serde(serialize_with = "bool_as_string")]
    pub easy_apply: bool,
    #[serde(serialize_with = "bool_as_string")]
    pub under_10_applicants: bool,
    pub start: u32,
}

// The endpoint expects "true"/"false" strings for its flags.
fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

/// One item of the `data` array, as loosely typed as the API is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJob {
    #[serde(default, alias = "title")]
    pub job_title: Option<String>,
    #[serde(default, alias = "company_name")]
    pub company: Option<String>,
    #[serde(default, alias = "url")]
    pub job_url: Option<String>,
    #[serde(default, alias = "job_location")]
    pub location: Option<String>,
    #[serde(default, alias = "posted_at")]
    pub posted_time: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub company_logo: Option<String>,
    #[serde(default, alias = "company_url")]
    pub company_linkedin_url: Option<String>,
    #[serde(default, alias = "salary_range")]
    pub salary: Option<String>,
    #[serde(default, alias = "description")]
    pub job_description: Option<String>,
}

/// A normalized job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub posted_recency_hours: f64,
    pub company_id: String,
    pub requirements: BTreeSet<String>,
    pub posted_time: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| clean_text(&v))
        .filter(|v| !v.is_empty())
}

impl JobRecord {
    /// Normalize a raw item. Fails when title, company or url is missing or
    /// when the posting age cannot be derived.
    pub fn from_raw(raw: RawJob, recency: &RecencyParser) -> Result<Self> {
        let title = non_empty(raw.job_title).ok_or(ScoutError::MissingField("job_title"))?;
        let company = non_empty(raw.company).ok_or(ScoutError::MissingField("company"))?;
        let url = raw
            .job_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(ScoutError::MissingField("job_url"))?;

        let posted_time = raw.posted_time.unwrap_or_default();
        let posted_recency_hours = recency.parse(&posted_time)?;

        let description = raw
            .job_description
            .filter(|d| !d.trim().is_empty());
        let requirements = description
            .as_deref()
            .map(extract_requirements)
            .unwrap_or_default();

        Ok(Self {
            company_id: derive_company_id(&company),
            title,
            company,
            location: non_empty(raw.location).unwrap_or_default(),
            url,
            posted_recency_hours,
            requirements,
            posted_time,
            scraped_at: recency.reference_time(),
            job_type: non_empty(raw.remote),
            company_logo: non_empty(raw.company_logo),
            company_url: non_empty(raw.company_linkedin_url),
            salary: non_empty(raw.salary),
            description,
        })
    }
}

/// Whether a search result can be trusted as "what the service has".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Every call succeeded; an empty result means no postings
    Complete,
    /// Some calls of a sweep failed
    Partial,
    /// No API key configured; nothing was queried
    Unavailable,
    /// Every call failed after retries
    Failed,
}

/// Per-batch accounting of dropped items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub received: usize,
    pub malformed: usize,
    pub missing_fields: usize,
    pub unparseable_recency: usize,
    pub duplicates: usize,
    pub outside_window: usize,
    pub excluded_by_policy: usize,
    pub kept: usize,
}

impl ParseReport {
    pub fn skipped(&self) -> usize {
        self.malformed + self.missing_fields + self.unparseable_recency
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub records: Vec<JobRecord>,
    pub report: ParseReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SearchOutcome {
    pub fn unavailable() -> Self {
        Self {
            status: SearchStatus::Unavailable,
            records: Vec::new(),
            report: ParseReport::default(),
            errors: vec![ScoutError::Unavailable.to_string()],
        }
    }

    pub fn failed(error: &ScoutError) -> Self {
        Self {
            status: SearchStatus::Failed,
            records: Vec::new(),
            report: ParseReport::default(),
            errors: vec![error.to_string()],
        }
    }

    /// True only when the records reflect a fully answered query.
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }
}
