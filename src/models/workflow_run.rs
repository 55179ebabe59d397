use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RunStatus, Stage};

/// The (stage, status) pair the state machine operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub stage: Stage,
    pub status: RunStatus,
}

impl RunState {
    pub const INITIAL: RunState = RunState {
        stage: Stage::Extraction,
        status: RunStatus::Running,
    };

    /// Status implied by a stage: DONE → COMPLETED, ERROR → FAILED, otherwise RUNNING.
    pub fn at(stage: Stage) -> Self {
        let status = match stage {
            Stage::Done => RunStatus::Completed,
            Stage::Error => RunStatus::Failed,
            _ => RunStatus::Running,
        };
        Self { stage, status }
    }
}

/// One end-to-end execution of the pipeline for an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: Uuid,
    pub user_id: String,
    pub file_id: String,
    pub current_stage: Stage,
    pub status: RunStatus,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    /// New run in EXTRACTION/RUNNING. A correlation id is generated when none is supplied.
    pub fn start(user_id: &str, file_id: &str, correlation_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            file_id: file_id.to_string(),
            current_stage: RunState::INITIAL.stage,
            status: RunState::INITIAL.status,
            correlation_id: correlation_id
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> RunState {
        RunState {
            stage: self.current_stage,
            status: self.status,
        }
    }

    /// Return the run with `state` applied and `updated_at` bumped.
    pub fn with_state(mut self, state: RunState) -> Self {
        self.current_stage = state.stage;
        self.status = state.status;
        self.updated_at = Utc::now();
        self
    }
}
