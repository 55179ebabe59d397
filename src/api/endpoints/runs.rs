//! Run endpoints.
//!
//! - `GET  /api/runs/by-file/:file_id`: latest run for a file
//! - `POST /api/runs`: start a run
//! - `POST /api/runs/:id/{advance,complete,fail,retry}`: lifecycle events

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::db::repository::latest_run_by_file;
use crate::models::{Stage, WorkflowRun};
use crate::pipeline::workflow::{apply_run_event, start_run, RunEvent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    pub file_id: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub stage: Stage,
}

/// `GET /api/runs/by-file/:file_id`
pub async fn latest_by_file(
    State(ctx): State<ApiContext>,
    Path(file_id): Path<String>,
) -> Result<Json<WorkflowRun>, ApiError> {
    let conn = ctx.open_db()?;
    let run = latest_run_by_file(&conn, &file_id)?
        .ok_or_else(|| ApiError::NotFound(format!("no run for file {file_id}")))?;
    Ok(Json(run))
}

/// `POST /api/runs`: new run in EXTRACTION/RUNNING owned by the caller.
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<WorkflowRun>), ApiError> {
    if request.file_id.trim().is_empty() {
        return Err(ApiError::BadRequest("'fileId' must not be empty".into()));
    }
    let conn = ctx.open_db()?;
    let run = start_run(
        &conn,
        &identity.user_id,
        request.file_id.trim(),
        request.correlation_id,
    )?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// `POST /api/runs/:id/advance` with `{ "stage": "NORMALIZATION" }`.
pub async fn advance(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<WorkflowRun>, ApiError> {
    apply(&ctx, &id, RunEvent::Advance(request.stage))
}

/// `POST /api/runs/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowRun>, ApiError> {
    apply(&ctx, &id, RunEvent::Complete)
}

/// `POST /api/runs/:id/fail`
pub async fn fail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowRun>, ApiError> {
    apply(&ctx, &id, RunEvent::Fail)
}

/// `POST /api/runs/:id/retry`
pub async fn retry(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowRun>, ApiError> {
    apply(&ctx, &id, RunEvent::Retry)
}

fn apply(ctx: &ApiContext, id: &Uuid, event: RunEvent) -> Result<Json<WorkflowRun>, ApiError> {
    let conn = ctx.open_db()?;
    let run = apply_run_event(&conn, id, event)?;
    Ok(Json(run))
}
