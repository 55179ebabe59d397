use rusqlite::Connection;

use super::{insert_extraction, insert_normalization, insert_prescription, update_run_state};
use crate::db::DatabaseError;
use crate::models::*;

/// Artifact produced at a stage boundary.
#[derive(Debug, Clone, Copy)]
pub enum StageArtifact<'a> {
    Extraction(&'a Extraction),
    Normalization(&'a Normalization),
    Prescription(&'a Prescription),
}

/// Persist a stage artifact and the run's new state atomically.
/// Either both land or neither does; the last committed stage is the checkpoint.
pub fn commit_stage(
    conn: &Connection,
    artifact: StageArtifact<'_>,
    run: &WorkflowRun,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    match artifact {
        StageArtifact::Extraction(e) => insert_extraction(&tx, e)?,
        StageArtifact::Normalization(n) => insert_normalization(&tx, n)?,
        StageArtifact::Prescription(p) => insert_prescription(&tx, p)?,
    }
    update_run_state(&tx, run)?;
    tx.commit()?;
    Ok(())
}
