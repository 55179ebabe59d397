//! Access logging middleware.
//!
//! Logs every API request with user, method, path and response status.
//! Runs after the identity layer has injected `Identity`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::Identity;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user_id = req
        .extensions()
        .get::<Identity>()
        .map(|identity| identity.user_id.clone())
        .unwrap_or_default();

    let response = next.run(req).await;

    tracing::info!(
        user_id = %user_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "API access"
    );

    response
}
