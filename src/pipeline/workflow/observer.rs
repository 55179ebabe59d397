use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::repository::insert_trace;
use crate::models::{AiTrace, RunStatus, Stage, WorkflowRun};
use crate::pipeline::stage::AgentInvocation;

/// What the runner reports after each stage boundary.
#[derive(Debug, Clone, Copy)]
pub struct StageReport<'a> {
    /// Run as persisted after the stage.
    pub run: &'a WorkflowRun,
    /// Stage that just ran.
    pub stage: Stage,
    pub invocation: Option<&'a AgentInvocation>,
    /// Set when the stage ended the run with an error.
    pub failure: Option<&'a str>,
}

/// Side channel invoked by the runner after every stage. Must not fail the run.
pub trait PipelineObserver {
    fn on_stage(&self, conn: &Connection, report: &StageReport<'_>);
}

/// Stage-level counters alongside the extraction counters.
#[derive(Debug, Default)]
pub struct StageCounters {
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    normalization_fallbacks: AtomicU64,
    generation_failures: AtomicU64,
    guardrail_blocks: AtomicU64,
    trace_write_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounterSnapshot {
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub normalization_fallbacks: u64,
    pub generation_failures: u64,
    pub guardrail_blocks: u64,
    pub trace_write_failures: u64,
}

impl StageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StageCounterSnapshot {
        StageCounterSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            normalization_fallbacks: self.normalization_fallbacks.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            guardrail_blocks: self.guardrail_blocks.load(Ordering::Relaxed),
            trace_write_failures: self.trace_write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Default observer: appends an AiTrace per agent invocation, logs the
/// boundary and keeps stage counters.
pub struct TraceRecorder {
    counters: Arc<StageCounters>,
}

impl TraceRecorder {
    pub fn new(counters: Arc<StageCounters>) -> Self {
        Self { counters }
    }
}

impl PipelineObserver for TraceRecorder {
    fn on_stage(&self, conn: &Connection, report: &StageReport<'_>) {
        let run = report.run;

        if let Some(inv) = report.invocation {
            let trace = AiTrace::new(
                &run.correlation_id,
                inv.agent,
                &inv.input,
                &inv.output,
                inv.latency_ms,
                inv.guardrail_blocked,
            );
            if let Err(e) = insert_trace(conn, &trace) {
                self.counters.trace_write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(run_id = %run.id, agent = inv.agent, error = %e, "Failed to record trace");
            }

            if inv.guardrail_blocked {
                self.counters.guardrail_blocks.fetch_add(1, Ordering::Relaxed);
            }
            if inv.degraded {
                let counter = match report.stage {
                    Stage::Normalization => &self.counters.normalization_fallbacks,
                    _ => &self.counters.generation_failures,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }

        match run.status {
            RunStatus::Completed => {
                self.counters.runs_completed.fetch_add(1, Ordering::Relaxed);
            }
            RunStatus::Failed => {
                self.counters.runs_failed.fetch_add(1, Ordering::Relaxed);
            }
            RunStatus::Running => {}
        }

        match report.failure {
            Some(reason) => tracing::error!(
                run_id = %run.id,
                stage = %report.stage,
                %reason,
                "Pipeline run failed"
            ),
            None => tracing::info!(
                run_id = %run.id,
                stage = %report.stage,
                next_stage = %run.current_stage,
                status = %run.status,
                latency_ms = report.invocation.map(|i| i.latency_ms),
                "Stage complete"
            ),
        }
    }
}
