//! Gateway identity middleware.
//!
//! The gateway authenticates callers and forwards `X-User-Id` and
//! `X-User-Roles`. These layers turn the headers into an `Identity`
//! extension and enforce the role required for lifecycle operations.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{Identity, OPERATOR_ROLES};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

/// Require a caller identity. Missing or blank `X-User-Id` → 401.
pub async fn require_identity(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string);

    let Some(user_id) = user_id else {
        return ApiError::Unauthorized.into_response();
    };

    let roles = req
        .headers()
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok());
    let identity = Identity::new(&user_id, roles);

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Require an operator role. Runs inside `require_identity`.
pub async fn require_operator(req: Request<axum::body::Body>, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<Identity>() else {
        return ApiError::Unauthorized.into_response();
    };

    if !identity.is_operator() {
        tracing::warn!(
            user_id = %identity.user_id,
            path = %req.uri().path(),
            "Lifecycle operation denied"
        );
        return ApiError::Forbidden(format!(
            "requires one of the roles: {}",
            OPERATOR_ROLES.join(", ")
        ))
        .into_response();
    }

    next.run(req).await
}
