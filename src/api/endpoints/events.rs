//! Upload-event ingest.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::trigger::FileUploadedEvent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAccepted {
    pub file_id: String,
    pub queued: bool,
}

/// `POST /api/events/file-uploaded`: validate and queue for the dispatcher.
/// Waits for queue space when the dispatcher is saturated.
pub async fn file_uploaded(
    State(ctx): State<ApiContext>,
    Json(event): Json<FileUploadedEvent>,
) -> Result<(StatusCode, Json<EventAccepted>), ApiError> {
    event.validate().map_err(ApiError::BadRequest)?;
    let file_id = event.id.clone();

    ctx.events.send(event).await.map_err(|_| ApiError::Unavailable)?;
    tracing::info!(file_id = %file_id, "Upload event queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            file_id,
            queued: true,
        }),
    ))
}
