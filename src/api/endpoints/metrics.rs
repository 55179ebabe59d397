//! Pipeline counters endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::pipeline::extraction::CounterSnapshot;
use crate::pipeline::workflow::StageCounterSnapshot;

#[derive(Serialize)]
pub struct MetricsResponse {
    pub extraction: CounterSnapshot,
    pub stages: StageCounterSnapshot,
}

/// `GET /api/pipeline/metrics`: counters since process start.
pub async fn snapshot(State(ctx): State<ApiContext>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        extraction: ctx.counters.extraction.snapshot(),
        stages: ctx.counters.stages.snapshot(),
    })
}
