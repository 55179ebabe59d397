//! Shared types for the API layer.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::mpsc;

use crate::api::error::ApiError;
use crate::db::sqlite::open_database;
use crate::pipeline::trigger::FileUploadedEvent;
use crate::pipeline::PipelineCounters;

/// Roles allowed to drive run lifecycle operations.
pub const OPERATOR_ROLES: &[&str] = &["clinician", "admin"];

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub db_path: Arc<PathBuf>,
    pub events: mpsc::Sender<FileUploadedEvent>,
    pub counters: Arc<PipelineCounters>,
}

impl ApiContext {
    pub fn new(
        db_path: PathBuf,
        events: mpsc::Sender<FileUploadedEvent>,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            db_path: Arc::new(db_path),
            events,
            counters,
        }
    }

    /// Per-request connection. Workers hold their own.
    pub fn open_db(&self) -> Result<Connection, ApiError> {
        open_database(&self.db_path).map_err(ApiError::from)
    }
}

/// Caller identity injected by the gateway, placed in request extensions
/// by the identity middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl Identity {
    /// Parse the `X-User-Roles` header value: comma-separated, case-insensitive.
    pub fn new(user_id: &str, roles_header: Option<&str>) -> Self {
        let roles = roles_header
            .unwrap_or_default()
            .split(',')
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
            .collect();
        Self {
            user_id: user_id.trim().to_string(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_operator(&self) -> bool {
        OPERATOR_ROLES.iter().any(|role| self.has_role(role))
    }
}
