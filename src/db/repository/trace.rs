use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::AiTrace;

/// Append a trace entry. Traces are never updated or deleted.
pub fn insert_trace(conn: &Connection, trace: &AiTrace) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ai_traces (id, correlation_id, agent, input_summary, output_summary,
         latency_ms, guardrail_blocked, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            trace.id.to_string(),
            trace.correlation_id,
            trace.agent,
            trace.input_summary,
            trace.output_summary,
            trace.latency_ms as i64,
            trace.guardrail_blocked as i32,
            format_timestamp(&trace.created_at),
        ],
    )?;
    Ok(())
}

/// All traces for a correlation id, newest first.
pub fn list_traces_by_correlation(
    conn: &Connection,
    correlation_id: &str,
) -> Result<Vec<AiTrace>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, correlation_id, agent, input_summary, output_summary, latency_ms,
         guardrail_blocked, created_at
         FROM ai_traces WHERE correlation_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt
        .query_map(params![correlation_id], |row| {
            Ok(TraceRow {
                id: row.get(0)?,
                correlation_id: row.get(1)?,
                agent: row.get(2)?,
                input_summary: row.get(3)?,
                output_summary: row.get(4)?,
                latency_ms: row.get(5)?,
                guardrail_blocked: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(trace_from_row).collect()
}

struct TraceRow {
    id: String,
    correlation_id: String,
    agent: String,
    input_summary: String,
    output_summary: String,
    latency_ms: i64,
    guardrail_blocked: i32,
    created_at: String,
}

fn trace_from_row(row: TraceRow) -> Result<AiTrace, DatabaseError> {
    Ok(AiTrace {
        id: parse_uuid(&row.id)?,
        correlation_id: row.correlation_id,
        agent: row.agent,
        input_summary: row.input_summary,
        output_summary: row.output_summary,
        latency_ms: row.latency_ms.max(0) as u64,
        guardrail_blocked: row.guardrail_blocked != 0,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
