use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const RUN_COLUMNS: &str =
    "id, user_id, file_id, current_stage, status, correlation_id, created_at, updated_at";

pub fn insert_run(conn: &Connection, run: &WorkflowRun) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO workflow_runs (id, user_id, file_id, current_stage, status, correlation_id,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            run.id.to_string(),
            run.user_id,
            run.file_id,
            run.current_stage.as_str(),
            run.status.as_str(),
            run.correlation_id,
            format_timestamp(&run.created_at),
            format_timestamp(&run.updated_at),
        ],
    )?;
    Ok(())
}

/// Persist the run's current stage/status. The only mutation a run row ever sees.
pub fn update_run_state(conn: &Connection, run: &WorkflowRun) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE workflow_runs SET current_stage = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            run.id.to_string(),
            run.current_stage.as_str(),
            run.status.as_str(),
            format_timestamp(&run.updated_at),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "WorkflowRun".into(),
            id: run.id.to_string(),
        });
    }
    Ok(())
}

pub fn get_run(conn: &Connection, id: &Uuid) -> Result<Option<WorkflowRun>, DatabaseError> {
    query_one_run(
        conn,
        &format!("SELECT {RUN_COLUMNS} FROM workflow_runs WHERE id = ?1"),
        &id.to_string(),
    )
}

/// Most recently created run for a file.
pub fn latest_run_by_file(
    conn: &Connection,
    file_id: &str,
) -> Result<Option<WorkflowRun>, DatabaseError> {
    query_one_run(
        conn,
        &format!(
            "SELECT {RUN_COLUMNS} FROM workflow_runs WHERE file_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ),
        file_id,
    )
}

pub fn list_runs_by_correlation(
    conn: &Connection,
    correlation_id: &str,
) -> Result<Vec<WorkflowRun>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RUN_COLUMNS} FROM workflow_runs WHERE correlation_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt
        .query_map(params![correlation_id], read_run_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(run_from_row).collect()
}

fn query_one_run(
    conn: &Connection,
    sql: &str,
    key: &str,
) -> Result<Option<WorkflowRun>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let result = stmt.query_row(params![key], read_run_row);

    match result {
        Ok(row) => Ok(Some(run_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct RunRow {
    id: String,
    user_id: String,
    file_id: String,
    current_stage: String,
    status: String,
    correlation_id: String,
    created_at: String,
    updated_at: String,
}

fn read_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
    Ok(RunRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_id: row.get(2)?,
        current_stage: row.get(3)?,
        status: row.get(4)?,
        correlation_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn run_from_row(row: RunRow) -> Result<WorkflowRun, DatabaseError> {
    Ok(WorkflowRun {
        id: parse_uuid(&row.id)?,
        user_id: row.user_id,
        file_id: row.file_id,
        current_stage: Stage::from_str(&row.current_stage)?,
        status: RunStatus::from_str(&row.status)?,
        correlation_id: row.correlation_id,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_get_run() {
        let conn = open_memory_database().unwrap();
        let run = WorkflowRun::start("user-1", "file-1", Some("corr-1".into()));
        insert_run(&conn, &run).unwrap();

        let loaded = get_run(&conn, &run.id).unwrap().unwrap();
        assert_eq!(loaded.file_id, "file-1");
        assert_eq!(loaded.correlation_id, "corr-1");
        assert_eq!(loaded.current_stage, Stage::Extraction);
        assert_eq!(loaded.status, RunStatus::Running);
    }

    #[test]
    fn missing_run_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_run(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn latest_run_by_file_picks_newest() {
        let conn = open_memory_database().unwrap();
        let first = WorkflowRun::start("user-1", "file-1", None);
        insert_run(&conn, &first).unwrap();
        let second = WorkflowRun::start("user-1", "file-1", None);
        insert_run(&conn, &second).unwrap();
        insert_run(&conn, &WorkflowRun::start("user-1", "file-2", None)).unwrap();

        let latest = latest_run_by_file(&conn, "file-1").unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(latest_run_by_file(&conn, "file-9").unwrap().is_none());
    }

    #[test]
    fn update_state_persists_stage_and_status() {
        let conn = open_memory_database().unwrap();
        let run = WorkflowRun::start("user-1", "file-1", None);
        insert_run(&conn, &run).unwrap();

        let run = run.with_state(RunState::at(Stage::Error));
        update_run_state(&conn, &run).unwrap();

        let loaded = get_run(&conn, &run.id).unwrap().unwrap();
        assert_eq!(loaded.current_stage, Stage::Error);
        assert_eq!(loaded.status, RunStatus::Failed);
    }

    #[test]
    fn update_unknown_run_is_not_found() {
        let conn = open_memory_database().unwrap();
        let run = WorkflowRun::start("user-1", "file-1", None);
        assert!(matches!(
            update_run_state(&conn, &run),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn generated_correlation_id_when_blank() {
        let run = WorkflowRun::start("user-1", "file-1", Some("  ".into()));
        assert!(Uuid::parse_str(&run.correlation_id).is_ok());
    }
}
