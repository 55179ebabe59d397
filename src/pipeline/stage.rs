use thiserror::Error;

use crate::models::Stage;

/// An unhandled failure inside a stage's orchestration. Stage implementations
/// absorb provider and model errors themselves; this is what is left.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {reason}")]
pub struct StageError {
    pub stage: Stage,
    pub reason: String,
}

impl StageError {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// One agent call, as reported to the trace recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInvocation {
    pub agent: &'static str,
    pub input: String,
    pub output: String,
    pub latency_ms: u64,
    pub guardrail_blocked: bool,
    /// The agent fell back or failed and the stage used a degraded result.
    pub degraded: bool,
}

/// A stage's value plus the agent invocation that produced it.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub value: T,
    pub invocation: AgentInvocation,
}
