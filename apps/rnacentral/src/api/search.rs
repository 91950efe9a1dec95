//! Sequence search endpoints.
//!
//! Jobs are addressed by an `id` query parameter, matching the polling
//! urls handed out on submission.

use axum::extract::{Form, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rnacentral_core::PageRequest;
use rnacentral_core::search::{JobStatus, ResultOrdering, SearchHit, validate_query};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, ApiResult, AppState, PageBody};
use crate::jobs::{Dashboard, QueryInfo};

const BASE: &str = "/api/v1/sequence-search";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/sequence-search/submit",
            get(submit_get).post(submit_post),
        )
        .route("/api/v1/sequence-search/status", get(status))
        .route("/api/v1/sequence-search/cancel", get(cancel))
        .route("/api/v1/sequence-search/results", get(results))
        .route("/api/v1/sequence-search/query", get(query_info))
        .route("/api/v1/sequence-search/dashboard", get(dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    pub q: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobParams {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultParams {
    pub id: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Required job id. Missing is a client error; an id that is not a uuid
/// cannot name a job.
fn job_id(raw: Option<&str>) -> ApiResult<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("Job id not specified"))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Job not found"))
}

// =============================================================================
// SUBMIT / CANCEL
// =============================================================================

async fn submit(state: AppState, params: SubmitParams) -> ApiResult<(StatusCode, Json<Value>)> {
    let sequence = params.q.unwrap_or_default().trim().to_string();
    validate_query(&sequence)?;
    let description = params.description.unwrap_or_default();

    let id = state.jobs.submit(&sequence, &description).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "url": state.url(&format!("{BASE}/status?id={id}")),
        })),
    ))
}

async fn submit_get(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    submit(state, params).await
}

async fn submit_post(
    State(state): State<AppState>,
    Form(params): Form<SubmitParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    submit(state, params).await
}

async fn cancel(
    State(state): State<AppState>,
    Query(params): Query<JobParams>,
) -> ApiResult<Json<Value>> {
    let id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("Job id not specified"))?;
    // Any failure to cancel, unknown jobs included, is a server error.
    let id = Uuid::parse_str(id).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.jobs.cancel(id).await?;
    info!(job = %id, "Cancel requested");
    Ok(Json(json!({ "status": "ok" })))
}

// =============================================================================
// STATUS / RESULTS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub id: Uuid,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expiration: DateTime<Utc>,
    pub url: String,
}

async fn status(
    State(state): State<AppState>,
    Query(params): Query<JobParams>,
) -> ApiResult<Json<StatusBody>> {
    let id = job_id(params.id.as_deref())?;
    let job = state
        .jobs
        .status(id)
        .await
        .ok_or(ApiError::NotFound("Job not found"))?;
    Ok(Json(StatusBody {
        id: job.id,
        status: job.status,
        enqueued_at: job.enqueued_at,
        ended_at: job.ended_at,
        expiration: job.expiration,
        url: state.url(&format!("{BASE}/results?id={id}")),
    }))
}

/// Paginated hits of a job, sorted by `ordering`.
///
/// An unknown or expired job id is a 404 rather than an empty page.
async fn results(
    State(state): State<AppState>,
    Query(params): Query<ResultParams>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<PageBody<SearchHit>>> {
    let id = job_id(params.id.as_deref())?;
    let mut hits = state
        .jobs
        .results(id)
        .await
        .ok_or(ApiError::NotFound("Job not found"))?;
    ResultOrdering::parse(params.ordering.as_deref()).sort(&mut hits);
    let page = PageRequest::new(params.page, params.page_size).paginate(hits)?;
    Ok(Json(PageBody::new(
        page,
        &state.url(&format!("{BASE}/results")),
        query.as_deref(),
    )))
}

async fn query_info(
    State(state): State<AppState>,
    Query(params): Query<JobParams>,
) -> ApiResult<Json<QueryInfo>> {
    let id = job_id(params.id.as_deref())?;
    let info = state
        .jobs
        .query(id)
        .await
        .ok_or(ApiError::NotFound("Job not found"))?;
    Ok(Json(info))
}

async fn dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    Json(state.jobs.dashboard().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_requires_value() {
        assert!(matches!(job_id(None), Err(ApiError::BadRequest(_))));
        assert!(matches!(job_id(Some("  ")), Err(ApiError::BadRequest(_))));
        assert!(matches!(job_id(Some("nope")), Err(ApiError::NotFound(_))));
        let id = Uuid::new_v4();
        assert!(matches!(job_id(Some(&id.to_string())), Ok(parsed) if parsed == id));
    }
}
