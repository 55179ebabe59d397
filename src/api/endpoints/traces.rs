//! Trace query endpoint.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::list_traces_by_correlation;
use crate::models::AiTrace;

/// `GET /api/traces/:correlation_id`: newest first, empty when none exist.
pub async fn by_correlation(
    State(ctx): State<ApiContext>,
    Path(correlation_id): Path<String>,
) -> Result<Json<Vec<AiTrace>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(list_traces_by_correlation(&conn, &correlation_id)?))
}
