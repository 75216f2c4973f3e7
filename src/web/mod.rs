// src/web/mod.rs
//! Manual HTTP surface for triggering searches outside the daily schedule.

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::info;

use crate::config::ScoutConfig;
use crate::JobFeed;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/health")]
pub async fn health(state: &State<AppState>) -> Json<TextResponse> {
    handlers::health_handler(state).await
}

#[post("/search", data = "<request>")]
pub async fn search(
    request: Json<StandardRequest<SearchRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<crate::linkedin::SearchOutcome>> {
    handlers::search_handler(request, state).await
}

#[post("/sweep", data = "<request>")]
pub async fn sweep(
    request: Option<Json<StandardRequest<SweepRequest>>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<crate::linkedin::SearchOutcome>> {
    handlers::sweep_handler(request, state).await
}

#[get("/jobs/details?<url>")]
pub async fn job_details(
    url: String,
    state: &State<AppState>,
) -> ApiResult<DataResponse<crate::linkedin::JobRecord>> {
    handlers::job_details_handler(url, state).await
}

#[post("/decision-makers", data = "<request>")]
pub async fn submit_decision_makers(
    request: Json<StandardRequest<DecisionMakerSubmitRequest>>,
    state: &State<AppState>,
) -> ApiResult<ActionResponse<crate::linkedin::DecisionMakerRequest>> {
    handlers::submit_decision_makers_handler(request, state).await
}

#[get("/decision-makers/<request_id>/status")]
pub async fn decision_maker_status(
    request_id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<crate::linkedin::DecisionMakerRequest>> {
    handlers::decision_maker_status_handler(request_id, state).await
}

#[get("/decision-makers/<request_id>/results")]
pub async fn decision_maker_results(
    request_id: &str,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<crate::linkedin::DecisionMakerRecord>>> {
    handlers::decision_maker_results_handler(request_id, state).await
}

#[get("/status/jobs")]
pub async fn jobs_status(state: &State<AppState>) -> Json<DataResponse<Option<RunSummary>>> {
    handlers::jobs_status_handler(state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Route not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["See /api/health for a liveness check".to_string()],
        None,
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body does not match the expected shape".to_string(),
        "BAD_REQUEST".to_string(),
        vec!["Verify field names and types".to_string()],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket_with(rocket::Config::figment(), state)
}

fn rocket_with(figment: Figment, state: AppState) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Cors)
        .manage(state)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                health,
                search,
                sweep,
                job_details,
                submit_decision_makers,
                decision_maker_status,
                decision_maker_results,
                jobs_status,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ScoutConfig, port: u16) -> Result<()> {
    let configured = config.api.is_configured();
    let feed = JobFeed::new(config).context("Failed to build job feed")?;

    info!("Starting job feed API server on port {}", port);
    if !configured {
        info!("RAPIDAPI_KEY not set - searches will report status unavailable");
    }

    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"));

    let _rocket = rocket_with(figment, AppState::new(feed))
        .launch()
        .await
        .context("Rocket server failed")?;

    Ok(())
}
