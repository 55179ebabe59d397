//! Operator lifecycle operations on runs: start, advance, complete, fail, retry.

use rusqlite::Connection;
use uuid::Uuid;

use super::state::{transition, RunEvent};
use super::PipelineError;
use crate::db::repository::{get_run, insert_run, update_run_state};
use crate::db::DatabaseError;
use crate::models::WorkflowRun;

pub fn start_run(
    conn: &Connection,
    user_id: &str,
    file_id: &str,
    correlation_id: Option<String>,
) -> Result<WorkflowRun, PipelineError> {
    let run = WorkflowRun::start(user_id, file_id, correlation_id);
    insert_run(conn, &run)?;
    tracing::info!(run_id = %run.id, file_id, "Run started");
    Ok(run)
}

/// Load the run, apply `event` through the state machine and persist the result.
pub fn apply_run_event(
    conn: &Connection,
    run_id: &Uuid,
    event: RunEvent,
) -> Result<WorkflowRun, PipelineError> {
    let run = get_run(conn, run_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "WorkflowRun".into(),
        id: run_id.to_string(),
    })?;

    let from = run.state();
    let next = transition(from, event)?;
    let run = run.with_state(next);
    update_run_state(conn, &run)?;

    tracing::info!(
        run_id = %run.id,
        event = ?event,
        from = %from.stage,
        to = %next.stage,
        status = %next.status,
        "Run state changed"
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{RunStatus, Stage};
    use crate::pipeline::workflow::TransitionError;

    #[test]
    fn start_then_advance_persists() {
        let conn = open_memory_database().unwrap();
        let run = start_run(&conn, "u1", "f1", Some("corr".into())).unwrap();
        let run = apply_run_event(&conn, &run.id, RunEvent::Advance(Stage::Normalization)).unwrap();
        assert_eq!(run.current_stage, Stage::Normalization);

        let stored = get_run(&conn, &run.id).unwrap().unwrap();
        assert_eq!(stored.current_stage, Stage::Normalization);
        assert_eq!(stored.correlation_id, "corr");
    }

    #[test]
    fn advance_after_completion_conflicts() {
        let conn = open_memory_database().unwrap();
        let run = start_run(&conn, "u1", "f1", None).unwrap();
        apply_run_event(&conn, &run.id, RunEvent::Complete).unwrap();

        let err = apply_run_event(&conn, &run.id, RunEvent::Advance(Stage::Prescription)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transition(TransitionError::NotRunning { .. })
        ));
        let stored = get_run(&conn, &run.id).unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
    }

    #[test]
    fn retry_resets_failed_run() {
        let conn = open_memory_database().unwrap();
        let run = start_run(&conn, "u1", "f1", None).unwrap();
        apply_run_event(&conn, &run.id, RunEvent::Fail).unwrap();
        let run = apply_run_event(&conn, &run.id, RunEvent::Retry).unwrap();
        assert_eq!(run.current_stage, Stage::Extraction);
        assert_eq!(run.status, RunStatus::Running);
    }

    #[test]
    fn unknown_run_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = apply_run_event(&conn, &Uuid::new_v4(), RunEvent::Fail).unwrap_err();
        assert!(matches!(err, PipelineError::Database(DatabaseError::NotFound { .. })));
    }
}
