//! API router.
//!
//! Routes are nested under `/api/`. Middleware uses `Extension<ApiContext>`
//! (outermost layer); handlers use `State<ApiContext>`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// `/api/health` is open. Every other route requires a gateway identity;
/// run lifecycle routes additionally require an operator role.
pub fn api_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let lifecycle = Router::new()
        .route("/runs", post(endpoints::runs::start))
        .route("/runs/:id/advance", post(endpoints::runs::advance))
        .route("/runs/:id/complete", post(endpoints::runs::complete))
        .route("/runs/:id/fail", post(endpoints::runs::fail))
        .route("/runs/:id/retry", post(endpoints::runs::retry))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(
            middleware::identity::require_operator,
        ));

    let protected = Router::new()
        .route(
            "/runs/by-file/:file_id",
            get(endpoints::runs::latest_by_file),
        )
        .route(
            "/artifacts/by-file/:file_id",
            get(endpoints::artifacts::latest_by_file),
        )
        .route("/extractions/:id", get(endpoints::artifacts::extraction))
        .route(
            "/normalizations/:id",
            get(endpoints::artifacts::normalization),
        )
        .route(
            "/prescriptions/:id",
            get(endpoints::artifacts::prescription),
        )
        .route(
            "/traces/:correlation_id",
            get(endpoints::traces::by_correlation),
        )
        .route("/pipeline/metrics", get(endpoints::metrics::snapshot))
        .route(
            "/events/file-uploaded",
            post(endpoints::events::file_uploaded),
        )
        .with_state(ctx.clone())
        .merge(lifecycle)
        // Innermost first, outermost last.
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(
            middleware::identity::require_identity,
        ))
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
}
