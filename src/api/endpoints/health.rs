//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::db::sqlite::count_tables;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database_ready: bool,
    pub accepting_events: bool,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus database and dispatcher reachability.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let database_ready = ctx
        .open_db()
        .ok()
        .and_then(|conn| count_tables(&conn).ok())
        .is_some_and(|count| count > 0);

    Json(HealthResponse {
        status: "ok",
        database_ready,
        accepting_events: !ctx.events.is_closed(),
        version: crate::config::APP_VERSION,
    })
}
