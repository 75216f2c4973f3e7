// src/web/handlers.rs
use chrono::Utc;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ScoutError;
use crate::linkedin::{
    DecisionMakerRecord, DecisionMakerRequest, JobRecord, SearchCriteria, SearchOutcome,
    SearchStatus,
};
use crate::web::types::*;

pub type ErrorReply = Custom<Json<StandardErrorResponse>>;
pub type ApiResult<T> = Result<Json<T>, ErrorReply>;

/// Map a library error onto an HTTP status and the error envelope.
pub fn error_reply(e: &ScoutError, conversation_id: Option<String>) -> ErrorReply {
    let (status, suggestions): (Status, Vec<&str>) = match e {
        ScoutError::Config(_)
        | ScoutError::InvalidRateLimit { .. }
        | ScoutError::UnknownGeoCode(_)
        | ScoutError::UnknownLocation(_) => (
            Status::BadRequest,
            vec!["Use one of the configured cities or geo codes"],
        ),
        ScoutError::Unavailable => (
            Status::ServiceUnavailable,
            vec!["Set RAPIDAPI_KEY and restart the service"],
        ),
        ScoutError::NotReady { .. } => (
            Status::Conflict,
            vec!["Poll the status endpoint until the search is complete"],
        ),
        ScoutError::RequestFailed(_) => (
            Status::Gone,
            vec!["Submit a new decision maker search"],
        ),
        ScoutError::UnknownRequest(_) => (
            Status::NotFound,
            vec!["Submit the search through this service first"],
        ),
        ScoutError::UnparseableRecency(_) | ScoutError::MissingField(_) => (
            Status::UnprocessableEntity,
            vec!["The upstream record is incomplete"],
        ),
        ScoutError::Http { .. }
        | ScoutError::Transport(_)
        | ScoutError::RetriesExhausted { .. }
        | ScoutError::UnexpectedResponse(_) => (
            Status::BadGateway,
            vec!["Try again in a few moments"],
        ),
        ScoutError::Io(_) | ScoutError::Csv(_) => (
            Status::InternalServerError,
            vec!["Contact support if the problem persists"],
        ),
    };

    Custom(
        status,
        Json(StandardErrorResponse::new(
            e.to_string(),
            e.code().to_string(),
            suggestions.into_iter().map(str::to_string).collect(),
            conversation_id,
        )),
    )
}

fn outcome_reply(
    outcome: SearchOutcome,
    conversation_id: Option<String>,
) -> Json<DataResponse<SearchOutcome>> {
    let message = match outcome.status {
        SearchStatus::Complete => format!("Found {} jobs", outcome.records.len()),
        SearchStatus::Partial => format!(
            "Found {} jobs; {} calls failed",
            outcome.records.len(),
            outcome.errors.len()
        ),
        SearchStatus::Unavailable => "Job API not configured".to_string(),
        SearchStatus::Failed => "Job search failed".to_string(),
    };
    let success = matches!(outcome.status, SearchStatus::Complete | SearchStatus::Partial);

    let mut response = DataResponse::success(message, outcome, conversation_id);
    response.success = success;
    Json(response)
}

pub async fn health_handler(state: &State<AppState>) -> Json<TextResponse> {
    let message = if state.feed.is_configured() {
        "OK".to_string()
    } else {
        "OK (job API key not configured)".to_string()
    };
    Json(TextResponse::success(message, None))
}

pub async fn search_handler(
    request: Json<StandardRequest<SearchRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<SearchOutcome>> {
    let request = request.into_inner();
    let conversation_id = request.conversation_id;
    let body = request.data;
    let config = state.feed.config();

    let criteria = match (&body.city, body.geo_code) {
        (_, Some(geo_code)) => SearchCriteria::new(&body.keywords, geo_code, &config.geo),
        (Some(city), None) => SearchCriteria::for_city(&body.keywords, city, &config.geo),
        (None, None) => Err(ScoutError::config("Either city or geo_code is required")),
    }
    .map_err(|e| error_reply(&e, conversation_id.clone()))?;

    let criteria = criteria
        .with_date_posted(body.date_posted.unwrap_or_default())
        .with_sort_order(body.sort_by.unwrap_or_default())
        .with_industries(body.industries.unwrap_or_else(|| config.search.industries.clone()));

    info!(
        keywords = criteria.keywords(),
        geo_code = criteria.geo_code(),
        "Manual job search requested"
    );

    let outcome = state.feed.jobs().search(&criteria).await;
    Ok(outcome_reply(outcome, conversation_id))
}

pub async fn sweep_handler(
    request: Option<Json<StandardRequest<SweepRequest>>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<SearchOutcome>> {
    let (body, conversation_id) = match request {
        Some(request) => {
            let request = request.into_inner();
            (request.data, request.conversation_id)
        }
        None => (SweepRequest::default(), None),
    };

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(run_id = %run_id, "Job sweep requested");

    let result = match (body.cities, body.terms, body.date_posted) {
        (None, None, None) => state.feed.daily_sweep().await,
        (cities, terms, date_posted) => {
            let config = state.feed.config();
            let cities = cities.unwrap_or_else(|| state.feed.sweep_cities());
            let terms = terms.unwrap_or_else(|| config.search.role_keywords.clone());
            state
                .feed
                .jobs()
                .search_all(
                    cities.as_slice(),
                    terms.as_slice(),
                    date_posted.unwrap_or_default(),
                )
                .await
        }
    };

    let outcome = result.map_err(|e| {
        warn!(run_id = %run_id, "Job sweep rejected: {}", e);
        error_reply(&e, conversation_id.clone())
    })?;

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        status: outcome.status,
        jobs_found: outcome.records.len(),
        report: outcome.report.clone(),
        errors: outcome.errors.clone(),
    };
    *state.last_run.write().await = Some(summary);

    Ok(outcome_reply(outcome, conversation_id))
}

pub async fn job_details_handler(
    url: String,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobRecord>> {
    match state.feed.jobs().get_job_details(&url).await {
        Ok(Some(record)) => Ok(Json(DataResponse::success(
            format!("{} at {}", record.title, record.company),
            record,
            None,
        ))),
        Ok(None) => Err(Custom(
            Status::NotFound,
            Json(StandardErrorResponse::new(
                format!("Job not found: {}", url),
                "JOB_NOT_FOUND".to_string(),
                vec!["Check that the URL is a canonical LinkedIn job link".to_string()],
                None,
            )),
        )),
        Err(e) => {
            error!("Job details lookup failed for {}: {}", url, e);
            Err(error_reply(&e, None))
        }
    }
}

pub async fn submit_decision_makers_handler(
    request: Json<StandardRequest<DecisionMakerSubmitRequest>>,
    state: &State<AppState>,
) -> ApiResult<ActionResponse<DecisionMakerRequest>> {
    let request = request.into_inner();
    let conversation_id = request.conversation_id;
    let body = request.data;
    let client = state.feed.decision_makers();

    let request_id = client
        .submit(&body.company_ids, &body.title_keywords, &body.geo_codes)
        .await
        .map_err(|e| {
            error!("Decision maker submit failed: {}", e);
            error_reply(&e, conversation_id.clone())
        })?;

    let tracked = client.request(&request_id).ok_or_else(|| {
        error_reply(&ScoutError::UnknownRequest(request_id.clone()), conversation_id.clone())
    })?;

    Ok(Json(
        ActionResponse::success(
            format!("Decision maker search {} submitted", request_id),
            "decision_makers_submitted".to_string(),
            tracked,
            conversation_id,
        )
        .with_next_actions(vec![
            format!("/api/decision-makers/{}/status", request_id),
            format!("/api/decision-makers/{}/results", request_id),
        ]),
    ))
}

pub async fn decision_maker_status_handler(
    request_id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<DecisionMakerRequest>> {
    let client = state.feed.decision_makers();
    let status = client
        .poll(request_id)
        .await
        .map_err(|e| error_reply(&e, None))?;

    let tracked = client
        .request(request_id)
        .ok_or_else(|| error_reply(&ScoutError::UnknownRequest(request_id.to_string()), None))?;

    Ok(Json(DataResponse::success(
        format!("Search {} is {}", request_id, status),
        tracked,
        None,
    )))
}

pub async fn decision_maker_results_handler(
    request_id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<DecisionMakerRecord>>> {
    let people = state
        .feed
        .decision_makers()
        .fetch(request_id)
        .await
        .map_err(|e| error_reply(&e, None))?;

    Ok(Json(DataResponse::success(
        format!("Found {} decision makers", people.len()),
        people,
        None,
    )))
}

pub async fn jobs_status_handler(state: &State<AppState>) -> Json<DataResponse<Option<RunSummary>>> {
    let last_run = state.last_run.read().await.clone();
    let message = match &last_run {
        Some(run) => format!("Last sweep {} found {} jobs", run.run_id, run.jobs_found),
        None => "No sweep has run yet".to_string(),
    };
    Json(DataResponse::success(message, last_run, None))
}
