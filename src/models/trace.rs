use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum characters kept from an agent's input or output.
pub const TRACE_SUMMARY_MAX_CHARS: usize = 500;

/// Audit record of one agent invocation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTrace {
    pub id: Uuid,
    pub correlation_id: String,
    pub agent: String,
    pub input_summary: String,
    pub output_summary: String,
    pub latency_ms: u64,
    pub guardrail_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl AiTrace {
    pub fn new(
        correlation_id: &str,
        agent: &str,
        input: &str,
        output: &str,
        latency_ms: u64,
        guardrail_blocked: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: correlation_id.to_string(),
            agent: agent.to_string(),
            input_summary: truncate_summary(input),
            output_summary: truncate_summary(output),
            latency_ms,
            guardrail_blocked,
            created_at: Utc::now(),
        }
    }
}

/// Truncate on a char boundary, marking the cut with an ellipsis.
pub fn truncate_summary(text: &str) -> String {
    match text.char_indices().nth(TRACE_SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
