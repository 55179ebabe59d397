//! Artifact query endpoints.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    get_extraction, get_normalization, get_prescription, latest_artifacts_by_file,
};
use crate::models::{ArtifactTriple, Extraction, Normalization, Prescription};

/// `GET /api/artifacts/by-file/:file_id`: latest extraction with its derived artifacts.
pub async fn latest_by_file(
    State(ctx): State<ApiContext>,
    Path(file_id): Path<String>,
) -> Result<Json<ArtifactTriple>, ApiError> {
    let conn = ctx.open_db()?;
    let triple = latest_artifacts_by_file(&conn, &file_id)?
        .ok_or_else(|| ApiError::NotFound(format!("no artifacts for file {file_id}")))?;
    Ok(Json(triple))
}

/// `GET /api/extractions/:id`
pub async fn extraction(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Extraction>, ApiError> {
    let conn = ctx.open_db()?;
    get_extraction(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("extraction {id}")))
}

/// `GET /api/normalizations/:id`
pub async fn normalization(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Normalization>, ApiError> {
    let conn = ctx.open_db()?;
    get_normalization(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("normalization {id}")))
}

/// `GET /api/prescriptions/:id`
pub async fn prescription(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.open_db()?;
    get_prescription(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("prescription {id}")))
}
