// src/linkedin/job_search.rs
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::filter::{filter_by_recency, filter_records, LocationPolicy};
use super::geo::GeoTable;
use super::recency::RecencyParser;
use super::types::{
    DatePosted, JobRecord, ParseReport, RawJob, SearchCriteria, SearchOutcome, SearchStatus,
};
use crate::config::ScoutConfig;
use crate::core::RapidApiClient;
use crate::error::{Result, ScoutError};

const SEARCH_JOBS_ENDPOINT: &str = "/search-jobs";
const JOB_DETAILS_ENDPOINT: &str = "/get-job-details";

pub struct JobSearchClient {
    api: Arc<RapidApiClient>,
    geo: GeoTable,
    policy: LocationPolicy,
    industries: Vec<String>,
}

impl JobSearchClient {
    pub fn new(api: Arc<RapidApiClient>, geo: GeoTable, policy: LocationPolicy) -> Self {
        Self {
            api,
            geo,
            policy,
            industries: Vec::new(),
        }
    }

    pub fn from_config(config: &ScoutConfig, api: Arc<RapidApiClient>) -> Self {
        Self::new(api, config.geo.clone(), config.policy.clone())
            .with_industries(config.search.industries.clone())
    }

    /// Industries applied to every criteria built by `search_all`.
    pub fn with_industries(mut self, industries: Vec<String>) -> Self {
        self.industries = industries;
        self
    }

    /// Run one search. Never fails: an unconfigured key or an exhausted
    /// retry budget is reported through `SearchOutcome::status`.
    pub async fn search(&self, criteria: &SearchCriteria) -> SearchOutcome {
        if !self.api.is_configured() {
            warn!("RAPIDAPI_KEY not configured - job search unavailable");
            return SearchOutcome::unavailable();
        }

        let items = match self.fetch_items(criteria).await {
            Ok(items) => items,
            Err(ScoutError::Unavailable) => return SearchOutcome::unavailable(),
            Err(e) => {
                error!(
                    keywords = criteria.keywords(),
                    geo_code = criteria.geo_code(),
                    "Job search failed: {}",
                    e
                );
                return SearchOutcome::failed(&e);
            }
        };

        let parser = RecencyParser::now();
        let (records, report) = self.finish(items, &parser, criteria.date_posted());

        info!(
            keywords = criteria.keywords(),
            geo_code = criteria.geo_code(),
            kept = report.kept,
            received = report.received,
            "Job search complete"
        );

        SearchOutcome {
            status: SearchStatus::Complete,
            records,
            report,
            errors: Vec::new(),
        }
    }

    /// Sweep every city × role term, merging all pages before the
    /// de-duplication, recency and location passes. Unknown cities fail fast
    /// before any call is made.
    pub async fn search_all<C, T>(
        &self,
        cities: &[C],
        terms: &[T],
        date_posted: DatePosted,
    ) -> Result<SearchOutcome>
    where
        C: AsRef<str>,
        T: AsRef<str>,
    {
        let mut plan = Vec::with_capacity(cities.len() * terms.len());
        for city in cities {
            let geo_code = self.geo.code_for(city.as_ref())?;
            for term in terms {
                plan.push(
                    SearchCriteria::new(term.as_ref(), geo_code, &self.geo)?
                        .with_date_posted(date_posted)
                        .with_industries(self.industries.iter().cloned()),
                );
            }
        }

        if !self.api.is_configured() {
            warn!("RAPIDAPI_KEY not configured - job sweep unavailable");
            return Ok(SearchOutcome::unavailable());
        }

        let mut items = Vec::new();
        let mut errors = Vec::new();

        for criteria in &plan {
            match self.fetch_items(criteria).await {
                Ok(batch) => items.extend(batch),
                Err(e) => {
                    error!(
                        keywords = criteria.keywords(),
                        geo_code = criteria.geo_code(),
                        "Job search failed during sweep: {}",
                        e
                    );
                    errors.push(format!(
                        "{} @ {}: {}",
                        criteria.keywords(),
                        criteria.geo_code(),
                        e
                    ));
                }
            }
        }

        let status = if plan.is_empty() {
            SearchStatus::Complete
        } else if errors.len() == plan.len() {
            SearchStatus::Failed
        } else if !errors.is_empty() {
            SearchStatus::Partial
        } else {
            SearchStatus::Complete
        };

        let parser = RecencyParser::now();
        let (records, report) = self.finish(items, &parser, date_posted);

        info!(
            calls = plan.len(),
            failed_calls = errors.len(),
            kept = report.kept,
            "Job sweep finished with status {:?}",
            status
        );

        Ok(SearchOutcome {
            status,
            records,
            report,
            errors,
        })
    }

    /// Look up one posting by its canonical URL. `Ok(None)` when the API does
    /// not know the posting.
    pub async fn get_job_details(&self, url: &str) -> Result<Option<JobRecord>> {
        let query = [
            ("job_url", url),
            ("include_skills", "false"),
            ("include_hiring_team", "false"),
        ];

        let body: Value = match self.api.get_json(JOB_DETAILS_ENDPOINT, &query).await {
            Ok(body) => body,
            Err(ScoutError::Http { status: 404, .. }) => {
                info!("Job details not found: {}", url);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(raw) = details_to_raw(body, url)? else {
            return Ok(None);
        };

        JobRecord::from_raw(raw, &RecencyParser::now()).map(Some)
    }

    async fn fetch_items(&self, criteria: &SearchCriteria) -> Result<Vec<Value>> {
        let body: Value = self
            .api
            .post_json(SEARCH_JOBS_ENDPOINT, &criteria.to_request())
            .await?;

        match body.get("data") {
            None | Some(Value::Null) => {
                warn!(
                    geo_code = criteria.geo_code(),
                    "Job search response has no data array"
                );
                Ok(Vec::new())
            }
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(other) => Err(ScoutError::UnexpectedResponse(format!(
                "data is not an array: {}",
                other
            ))),
        }
    }

    fn finish(
        &self,
        items: Vec<Value>,
        parser: &RecencyParser,
        date_posted: DatePosted,
    ) -> (Vec<JobRecord>, ParseReport) {
        let (mut records, mut report) = normalize_batch(items, parser);

        if let Some(max_age) = date_posted.max_age_hours() {
            let before = records.len();
            records = filter_by_recency(records, max_age);
            report.outside_window = before - records.len();
        }

        let before = records.len();
        records = filter_records(records, &self.policy);
        report.excluded_by_policy = before - records.len();
        report.kept = records.len();

        if report.skipped() > 0 {
            warn!(
                malformed = report.malformed,
                missing_fields = report.missing_fields,
                unparseable_recency = report.unparseable_recency,
                "Skipped job items that could not be normalized"
            );
        }

        (records, report)
    }
}

/// Parse raw API items into records, skipping the ones that cannot be
/// normalized and dropping repeated URLs (first occurrence wins).
pub fn normalize_batch(items: Vec<Value>, parser: &RecencyParser) -> (Vec<JobRecord>, ParseReport) {
    let mut report = ParseReport {
        received: items.len(),
        ..ParseReport::default()
    };
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for item in items {
        let raw: RawJob = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed job item: {}", e);
                report.malformed += 1;
                continue;
            }
        };

        let record = match JobRecord::from_raw(raw, parser) {
            Ok(record) => record,
            Err(e @ ScoutError::UnparseableRecency(_)) => {
                warn!("Skipping job item: {}", e);
                report.unparseable_recency += 1;
                continue;
            }
            Err(e) => {
                warn!("Skipping job item: {}", e);
                report.missing_fields += 1;
                continue;
            }
        };

        if !seen.insert(record.url.clone()) {
            report.duplicates += 1;
            continue;
        }
        records.push(record);
    }

    report.kept = records.len();
    (records, report)
}

/// The details endpoint wraps the posting in `data` and nests the company
/// name inside an object; flatten it into the search item shape.
fn details_to_raw(body: Value, url: &str) -> Result<Option<RawJob>> {
    let mut item = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(data)) => data,
            Some(Value::Null) => return Ok(None),
            Some(_) => {
                return Err(ScoutError::UnexpectedResponse(
                    "job details data is not an object".to_string(),
                ))
            }
            None => map,
        },
        Value::Null => return Ok(None),
        other => {
            return Err(ScoutError::UnexpectedResponse(format!(
                "job details is not an object: {}",
                other
            )))
        }
    };

    if item.is_empty() {
        return Ok(None);
    }

    let company_name = match item.get("company") {
        Some(Value::Object(company)) => Some(company.get("name").cloned().unwrap_or(Value::Null)),
        _ => None,
    };
    if let Some(name) = company_name {
        item.insert("company".to_string(), name);
    }
    if let Some(salary) = item.remove("salaryRange") {
        item.entry("salary").or_insert(salary);
    }
    if !item.contains_key("job_url") && !item.contains_key("url") {
        item.insert("job_url".to_string(), Value::String(url.to_string()));
    }

    serde_json::from_value(Value::Object(item))
        .map(Some)
        .map_err(|e| ScoutError::UnexpectedResponse(format!("job details: {}", e)))
}
