use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{GuardrailStatus, NormalizationMethod};

/// Text extracted from a source file. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub id: Uuid,
    pub file_id: String,
    pub raw_text: String,
    pub engine: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// Structured findings derived from an extraction. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalization {
    pub id: Uuid,
    pub extraction_id: Uuid,
    pub payload: serde_json::Value,
    pub method: NormalizationMethod,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// Generated treatment draft. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub normalization_id: Uuid,
    pub generated_text: String,
    pub parameters: serde_json::Value,
    pub guardrail_status: GuardrailStatus,
    pub model_id: String,
    pub prompt_version: String,
    pub created_at: DateTime<Utc>,
}

/// Latest artifacts for a file. Downstream artifacts are absent until their stage ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactTriple {
    pub extraction: Extraction,
    pub normalization: Option<Normalization>,
    pub prescription: Option<Prescription>,
}
