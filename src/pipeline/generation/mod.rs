//! Generation stage: normalized findings → phased treatment draft, followed by
//! the output guardrail.

pub mod guardrail;

pub use guardrail::*;

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use super::llm::{clean_model_output, extract_json_object, LlmClient};
use super::stage::{AgentInvocation, StageError, StageOutput};
use crate::models::{GuardrailStatus, Stage};

pub const GENERATOR_AGENT: &str = "generator";
pub const PROMPT_VERSION: &str = "treatment-plan-v1";
pub const STUB_MODEL_ID: &str = "stub";
pub const ERROR_MODEL_ID: &str = "error";

const FAILURE_PLACEHOLDER: &str =
    "Treatment draft unavailable: generation failed. Review the normalized findings manually.";

const GENERATION_SYSTEM: &str = "You are a rehabilitation and treatment planning assistant \
drafting a plan for clinician review. Never include personal identifiers or credentials.";

/// Generated draft after the guardrail ran.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentDraft {
    pub text: String,
    pub parameters: Value,
    pub model_id: String,
    pub prompt_version: String,
    pub guardrail_status: GuardrailStatus,
}

pub trait GenerationStage {
    fn generate(&self, normalized: &Value) -> Result<StageOutput<TreatmentDraft>, StageError>;
}

/// Builds the fixed instruction prompt around the normalized payload.
pub fn build_generation_prompt(normalized: &Value) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string_pretty(normalized)?;
    Ok(format!(
        "Using the normalized clinical findings below, draft a phased treatment plan.\n\
         Return a JSON object with key \"phases\": an array where each phase has \
         \"name\", \"durationWeeks\", \"goals\" (array of strings), \"interventions\" \
         (array of strings) and \"progressionCriteria\" (array of strings). \
         Respect every listed contraindication.\n\n\
         Normalized findings:\n{payload}"
    ))
}

/// Generator backed by an LLM, or a canned plan when generation is disabled.
pub struct Generator {
    llm: Option<Arc<dyn LlmClient + Send + Sync>>,
    model: String,
}

impl Generator {
    pub fn stub() -> Self {
        Self {
            llm: None,
            model: STUB_MODEL_ID.to_string(),
        }
    }

    pub fn with_llm(client: Arc<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm: Some(client),
            model: model.to_string(),
        }
    }
}

impl GenerationStage for Generator {
    fn generate(&self, normalized: &Value) -> Result<StageOutput<TreatmentDraft>, StageError> {
        let start = Instant::now();
        let prompt = build_generation_prompt(normalized)
            .map_err(|e| StageError::new(Stage::Prescription, e.to_string()))?;

        let (text, model_id) = match &self.llm {
            None => (stub_plan(normalized), STUB_MODEL_ID.to_string()),
            Some(client) => match client.generate(&self.model, &prompt, GENERATION_SYSTEM) {
                Ok(raw) => (clean_model_output(&raw), self.model.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "Treatment draft generation failed");
                    (FAILURE_PLACEHOLDER.to_string(), ERROR_MODEL_ID.to_string())
                }
            },
        };

        let parameters = extract_json_object(&text)
            .and_then(|json| serde_json::from_str::<Value>(json).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}));

        let verdict = evaluate_guardrail(&text);
        if verdict.is_blocked() {
            tracing::warn!(matched = ?verdict.matched, "Guardrail blocked treatment draft");
        }

        Ok(StageOutput {
            invocation: AgentInvocation {
                agent: GENERATOR_AGENT,
                input: prompt,
                output: text.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
                guardrail_blocked: verdict.is_blocked(),
                degraded: model_id == ERROR_MODEL_ID,
            },
            value: TreatmentDraft {
                text,
                parameters,
                model_id,
                prompt_version: PROMPT_VERSION.to_string(),
                guardrail_status: verdict.status,
            },
        })
    }
}

/// Canned three-phase plan. Only counts from the payload are embedded, so
/// document content never reaches the guardrail through the stub.
fn stub_plan(normalized: &Value) -> String {
    let count = |key: &str| normalized[key].as_array().map_or(0, Vec::len);
    let plan = json!({
        "phases": [
            {
                "name": "Protection",
                "durationWeeks": 2,
                "goals": ["Reduce pain and inflammation", "Protect affected tissue"],
                "interventions": ["Relative rest", "Gentle isometric exercise"],
                "progressionCriteria": ["Pain at rest below 3/10"]
            },
            {
                "name": "Restoration",
                "durationWeeks": 4,
                "goals": ["Restore range of motion", "Rebuild baseline strength"],
                "interventions": ["Progressive mobility work", "Low-load strengthening"],
                "progressionCriteria": ["Range of motion within 80% of unaffected side"]
            },
            {
                "name": "Return to function",
                "durationWeeks": 4,
                "goals": ["Return to daily and work activities"],
                "interventions": ["Functional and task-specific training"],
                "progressionCriteria": ["Clinician sign-off"]
            }
        ],
        "basis": {
            "findings": count("findings"),
            "contraindications": count("contraindications"),
            "conditions": count("conditions"),
        },
        "note": "Placeholder plan produced without a language model; clinician review required."
    });
    plan.to_string()
}
