//! Normalization stage: raw extracted text → structured clinical findings.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};

use super::llm::{clean_model_output, extract_json_object, LlmClient};
use super::stage::{AgentInvocation, StageError, StageOutput};
use crate::models::{NormalizationMethod, Stage};

pub const NORMALIZER_AGENT: &str = "normalizer";
pub const LLM_NORMALIZATION_CONFIDENCE: f32 = 0.85;
pub const DETERMINISTIC_NORMALIZATION_CONFIDENCE: f32 = 0.70;

const LIST_FIELDS: [&str; 4] = ["findings", "contraindications", "conditions", "codes"];

const NORMALIZATION_SYSTEM: &str = "You are a clinical documentation assistant. \
Extract structured information from the clinical text you are given. \
Respond with a single JSON object and nothing else. The object has exactly these keys: \
\"findings\" (array of strings: objective and subjective clinical findings), \
\"contraindications\" (array of strings), \
\"conditions\" (array of strings: diagnosed or suspected conditions), \
\"codes\" (array of objects with \"system\" and \"code\", e.g. ICD-10). \
Use empty arrays when the text contains nothing for a key. Do not invent information.";

/// Structured findings produced by the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFindings {
    pub payload: Value,
    pub method: NormalizationMethod,
    pub confidence: f32,
}

pub trait NormalizationStage {
    fn normalize(&self, raw_text: &str) -> Result<StageOutput<NormalizedFindings>, StageError>;
}

/// LLM-backed normalizer with a deterministic fallback. With no client
/// configured every call takes the deterministic path.
pub struct Normalizer {
    llm: Option<Arc<dyn LlmClient + Send + Sync>>,
    model: String,
}

impl Normalizer {
    pub fn deterministic() -> Self {
        Self {
            llm: None,
            model: String::new(),
        }
    }

    pub fn with_llm(client: Arc<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm: Some(client),
            model: model.to_string(),
        }
    }

    fn normalize_with_llm(
        &self,
        client: &(dyn LlmClient + Send + Sync),
        raw_text: &str,
    ) -> Result<Value, String> {
        let prompt = format!("Clinical text:\n<<<\n{raw_text}\n>>>");
        let response = client
            .generate(&self.model, &prompt, NORMALIZATION_SYSTEM)
            .map_err(|e| e.to_string())?;
        parse_findings(&clean_model_output(&response))
    }
}

impl NormalizationStage for Normalizer {
    fn normalize(&self, raw_text: &str) -> Result<StageOutput<NormalizedFindings>, StageError> {
        let start = Instant::now();
        let mut degraded = false;

        let findings = match &self.llm {
            Some(client) => match self.normalize_with_llm(client.as_ref(), raw_text) {
                Ok(payload) => NormalizedFindings {
                    payload,
                    method: NormalizationMethod::Llm,
                    confidence: LLM_NORMALIZATION_CONFIDENCE,
                },
                Err(reason) => {
                    tracing::warn!(%reason, "LLM normalization failed, using deterministic fallback");
                    degraded = true;
                    deterministic_findings(raw_text)
                }
            },
            None => deterministic_findings(raw_text),
        };

        let output = serde_json::to_string(&findings.payload)
            .map_err(|e| StageError::new(Stage::Normalization, e.to_string()))?;

        Ok(StageOutput {
            invocation: AgentInvocation {
                agent: NORMALIZER_AGENT,
                input: raw_text.to_string(),
                output,
                latency_ms: start.elapsed().as_millis() as u64,
                guardrail_blocked: false,
                degraded,
            },
            value: findings,
        })
    }
}

/// Raw text as the only finding.
pub fn deterministic_findings(raw_text: &str) -> NormalizedFindings {
    NormalizedFindings {
        payload: json!({
            "findings": [raw_text],
            "contraindications": [],
            "conditions": [],
        }),
        method: NormalizationMethod::Deterministic,
        confidence: DETERMINISTIC_NORMALIZATION_CONFIDENCE,
    }
}

/// Parse model output into the findings shape. Missing list keys default to
/// empty arrays; anything that is not a JSON object, or a list key holding a
/// non-array, is rejected.
pub fn parse_findings(response: &str) -> Result<Value, String> {
    let json = extract_json_object(response).ok_or("no JSON object in response")?;
    let value: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let Value::Object(mut object) = value else {
        return Err("response JSON is not an object".into());
    };

    let mut normalized = Map::new();
    for key in LIST_FIELDS {
        match object.remove(key) {
            None | Some(Value::Null) => {
                normalized.insert(key.to_string(), Value::Array(Vec::new()));
            }
            Some(list @ Value::Array(_)) => {
                normalized.insert(key.to_string(), list);
            }
            Some(_) => return Err(format!("'{key}' is not an array")),
        }
    }
    Ok(Value::Object(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::mock::MockLlmClient;

    const TEXT: &str = "Dx: rotator cuff tendinopathy. Avoid overhead lifting. \"Pain\" 6/10.";

    #[test]
    fn deterministic_when_no_client() {
        let out = Normalizer::deterministic().normalize(TEXT).unwrap();
        assert_eq!(out.value.method, NormalizationMethod::Deterministic);
        assert!((out.value.confidence - 0.70).abs() < f32::EPSILON);
        assert_eq!(out.value.payload["findings"][0], TEXT);
        assert_eq!(out.value.payload["contraindications"], json!([]));
        assert_eq!(out.value.payload["conditions"], json!([]));
        assert_eq!(out.invocation.agent, NORMALIZER_AGENT);
        assert!(!out.invocation.degraded);
    }

    #[test]
    fn deterministic_payload_escapes_raw_text() {
        let out = Normalizer::deterministic().normalize(TEXT).unwrap();
        assert!(out.invocation.output.contains("\\\"Pain\\\""));
    }

    #[test]
    fn llm_json_is_used() {
        let client = Arc::new(MockLlmClient::new(
            "```json\n{\"findings\":[\"tendinopathy\"],\"contraindications\":[\"overhead lifting\"],\
             \"conditions\":[\"rotator cuff tendinopathy\"],\"codes\":[{\"system\":\"ICD-10\",\"code\":\"M75.1\"}]}\n```",
        ));
        let normalizer = Normalizer::with_llm(client.clone(), "medgemma");
        let out = normalizer.normalize(TEXT).unwrap();

        assert_eq!(out.value.method, NormalizationMethod::Llm);
        assert!((out.value.confidence - 0.85).abs() < f32::EPSILON);
        assert_eq!(out.value.payload["contraindications"][0], "overhead lifting");
        assert_eq!(out.value.payload["codes"][0]["code"], "M75.1");
        assert_eq!(client.call_count(), 1);
        assert!(client.last_prompt().unwrap().contains("rotator cuff"));
    }

    #[test]
    fn llm_failure_falls_back() {
        let normalizer = Normalizer::with_llm(Arc::new(MockLlmClient::unreachable()), "medgemma");
        let out = normalizer.normalize(TEXT).unwrap();
        assert_eq!(out.value.method, NormalizationMethod::Deterministic);
        assert_eq!(out.value.payload["findings"][0], TEXT);
        assert!(out.invocation.degraded);
    }

    #[test]
    fn unparseable_llm_output_falls_back() {
        let normalizer =
            Normalizer::with_llm(Arc::new(MockLlmClient::new("I cannot help with that.")), "m");
        let out = normalizer.normalize(TEXT).unwrap();
        assert_eq!(out.value.method, NormalizationMethod::Deterministic);
    }

    #[test]
    fn missing_keys_default_to_empty_arrays() {
        let value = parse_findings("{\"findings\": [\"edema\"]}").unwrap();
        assert_eq!(value["findings"][0], "edema");
        assert_eq!(value["conditions"], json!([]));
        assert_eq!(value["codes"], json!([]));
    }

    #[test]
    fn wrong_shapes_rejected() {
        assert!(parse_findings("[1, 2]").is_err());
        assert!(parse_findings("{\"findings\": \"edema\"}").is_err());
        assert!(parse_findings("{\"findings\": [}").is_err());
    }
}
