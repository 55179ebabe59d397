use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

// ── Extractions ──────────────────────────────────────────────────────────

pub fn insert_extraction(conn: &Connection, extraction: &Extraction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO extractions (id, file_id, raw_text, engine, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            extraction.id.to_string(),
            extraction.file_id,
            extraction.raw_text,
            extraction.engine,
            extraction.confidence as f64,
            format_timestamp(&extraction.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_extraction(conn: &Connection, id: &Uuid) -> Result<Option<Extraction>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, file_id, raw_text, engine, confidence, created_at
         FROM extractions WHERE id = ?1",
        params![id.to_string()],
        read_extraction_row,
    );
    optional(result).and_then(|row| row.map(extraction_from_row).transpose())
}

pub fn latest_extraction_by_file(
    conn: &Connection,
    file_id: &str,
) -> Result<Option<Extraction>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, file_id, raw_text, engine, confidence, created_at
         FROM extractions WHERE file_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        params![file_id],
        read_extraction_row,
    );
    optional(result).and_then(|row| row.map(extraction_from_row).transpose())
}

struct ExtractionRow {
    id: String,
    file_id: String,
    raw_text: String,
    engine: String,
    confidence: f64,
    created_at: String,
}

fn read_extraction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExtractionRow> {
    Ok(ExtractionRow {
        id: row.get(0)?,
        file_id: row.get(1)?,
        raw_text: row.get(2)?,
        engine: row.get(3)?,
        confidence: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn extraction_from_row(row: ExtractionRow) -> Result<Extraction, DatabaseError> {
    Ok(Extraction {
        id: parse_uuid(&row.id)?,
        file_id: row.file_id,
        raw_text: row.raw_text,
        engine: row.engine,
        confidence: row.confidence as f32,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

// ── Normalizations ───────────────────────────────────────────────────────

pub fn insert_normalization(
    conn: &Connection,
    normalization: &Normalization,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO normalizations (id, extraction_id, payload, method, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            normalization.id.to_string(),
            normalization.extraction_id.to_string(),
            serde_json::to_string(&normalization.payload)?,
            normalization.method.as_str(),
            normalization.confidence as f64,
            format_timestamp(&normalization.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_normalization(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Normalization>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, extraction_id, payload, method, confidence, created_at
         FROM normalizations WHERE id = ?1",
        params![id.to_string()],
        read_normalization_row,
    );
    optional(result).and_then(|row| row.map(normalization_from_row).transpose())
}

pub fn latest_normalization_by_extraction(
    conn: &Connection,
    extraction_id: &Uuid,
) -> Result<Option<Normalization>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, extraction_id, payload, method, confidence, created_at
         FROM normalizations WHERE extraction_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        params![extraction_id.to_string()],
        read_normalization_row,
    );
    optional(result).and_then(|row| row.map(normalization_from_row).transpose())
}

struct NormalizationRow {
    id: String,
    extraction_id: String,
    payload: String,
    method: String,
    confidence: f64,
    created_at: String,
}

fn read_normalization_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NormalizationRow> {
    Ok(NormalizationRow {
        id: row.get(0)?,
        extraction_id: row.get(1)?,
        payload: row.get(2)?,
        method: row.get(3)?,
        confidence: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn normalization_from_row(row: NormalizationRow) -> Result<Normalization, DatabaseError> {
    Ok(Normalization {
        id: parse_uuid(&row.id)?,
        extraction_id: parse_uuid(&row.extraction_id)?,
        payload: serde_json::from_str(&row.payload)?,
        method: NormalizationMethod::from_str(&row.method)?,
        confidence: row.confidence as f32,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

// ── Prescriptions ────────────────────────────────────────────────────────

pub fn insert_prescription(
    conn: &Connection,
    prescription: &Prescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, normalization_id, generated_text, parameters,
         guardrail_status, model_id, prompt_version, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            prescription.id.to_string(),
            prescription.normalization_id.to_string(),
            prescription.generated_text,
            serde_json::to_string(&prescription.parameters)?,
            prescription.guardrail_status.as_str(),
            prescription.model_id,
            prescription.prompt_version,
            format_timestamp(&prescription.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, normalization_id, generated_text, parameters, guardrail_status,
         model_id, prompt_version, created_at
         FROM prescriptions WHERE id = ?1",
        params![id.to_string()],
        read_prescription_row,
    );
    optional(result).and_then(|row| row.map(prescription_from_row).transpose())
}

pub fn latest_prescription_by_normalization(
    conn: &Connection,
    normalization_id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, normalization_id, generated_text, parameters, guardrail_status,
         model_id, prompt_version, created_at
         FROM prescriptions WHERE normalization_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        params![normalization_id.to_string()],
        read_prescription_row,
    );
    optional(result).and_then(|row| row.map(prescription_from_row).transpose())
}

struct PrescriptionRow {
    id: String,
    normalization_id: String,
    generated_text: String,
    parameters: String,
    guardrail_status: String,
    model_id: String,
    prompt_version: String,
    created_at: String,
}

fn read_prescription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        normalization_id: row.get(1)?,
        generated_text: row.get(2)?,
        parameters: row.get(3)?,
        guardrail_status: row.get(4)?,
        model_id: row.get(5)?,
        prompt_version: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: parse_uuid(&row.id)?,
        normalization_id: parse_uuid(&row.normalization_id)?,
        generated_text: row.generated_text,
        parameters: serde_json::from_str(&row.parameters)?,
        guardrail_status: GuardrailStatus::from_str(&row.guardrail_status)?,
        model_id: row.model_id,
        prompt_version: row.prompt_version,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

// ── Latest triple ────────────────────────────────────────────────────────

/// Latest extraction for the file, plus the normalization and prescription
/// derived from it. `None` when the file has no extraction yet.
pub fn latest_artifacts_by_file(
    conn: &Connection,
    file_id: &str,
) -> Result<Option<ArtifactTriple>, DatabaseError> {
    let Some(extraction) = latest_extraction_by_file(conn, file_id)? else {
        return Ok(None);
    };
    let normalization = latest_normalization_by_extraction(conn, &extraction.id)?;
    let prescription = match &normalization {
        Some(n) => latest_prescription_by_normalization(conn, &n.id)?,
        None => None,
    };
    Ok(Some(ArtifactTriple {
        extraction,
        normalization,
        prescription,
    }))
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>, DatabaseError> {
    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
