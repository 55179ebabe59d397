use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use super::observer::{PipelineObserver, StageReport};
use super::state::{transition, RunEvent};
use super::PipelineError;
use crate::db::repository::{commit_stage, insert_run, update_run_state, StageArtifact};
use crate::models::*;
use crate::pipeline::extraction::{ExtractionInput, TextExtractionOrchestrator};
use crate::pipeline::generation::GenerationStage;
use crate::pipeline::normalization::NormalizationStage;
use crate::pipeline::stage::{AgentInvocation, StageError};
use crate::pipeline::trigger::{verify_integrity, FileUploadedEvent, ObjectStore};

/// Drives one uploaded file through extraction, normalization and generation.
/// Stateless between executions; every call gets its own connection.
pub struct PipelineRunner {
    store: Arc<dyn ObjectStore + Send + Sync>,
    extractor: TextExtractionOrchestrator,
    normalizer: Box<dyn NormalizationStage + Send + Sync>,
    generator: Box<dyn GenerationStage + Send + Sync>,
    observer: Box<dyn PipelineObserver + Send + Sync>,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn ObjectStore + Send + Sync>,
        extractor: TextExtractionOrchestrator,
        normalizer: Box<dyn NormalizationStage + Send + Sync>,
        generator: Box<dyn GenerationStage + Send + Sync>,
        observer: Box<dyn PipelineObserver + Send + Sync>,
    ) -> Self {
        Self {
            store,
            extractor,
            normalizer,
            generator,
            observer,
        }
    }

    /// Execute the pipeline for one delivered event.
    ///
    /// Returns the run in its final state (COMPLETED or FAILED). `Err` only
    /// when the run itself could not be created or its failure recorded.
    pub fn execute(
        &self,
        conn: &Connection,
        event: &FileUploadedEvent,
    ) -> Result<WorkflowRun, PipelineError> {
        event.validate().map_err(PipelineError::InvalidEvent)?;

        let mut run = WorkflowRun::start(&event.user_id, &event.id, None);
        insert_run(conn, &run)?;

        let _span = tracing::info_span!(
            "pipeline_run",
            run_id = %run.id,
            file_id = %run.file_id,
            correlation_id = %run.correlation_id
        )
        .entered();
        tracing::info!("Pipeline run started");

        // A panicking stage must still leave the run in a terminal state.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_stages(conn, &mut run, event)))
            .unwrap_or_else(|payload| {
                tracing::error!(
                    stage = %run.current_stage,
                    panic = panic_message(payload.as_ref()),
                    "Pipeline stage panicked"
                );
                Err(StageError::new(run.current_stage, "stage panicked").into())
            });

        match outcome {
            Ok(()) => Ok(run),
            Err(e) => self.fail_run(conn, run, &e),
        }
    }

    fn run_stages(
        &self,
        conn: &Connection,
        run: &mut WorkflowRun,
        event: &FileUploadedEvent,
    ) -> Result<(), PipelineError> {
        // ── Extraction ──
        let bytes = self.store.fetch(&event.bucket, &event.path)?;
        verify_integrity(event, &bytes);

        let extracted = self.extractor.extract(ExtractionInput {
            bytes: &bytes,
            file_name: event.display_name(),
            content_type: event.file_type.as_deref(),
        });
        let extraction = Extraction {
            id: Uuid::new_v4(),
            file_id: event.id.clone(),
            raw_text: extracted.text,
            engine: extracted.engine,
            confidence: extracted.confidence,
            created_at: Utc::now(),
        };
        self.commit(conn, run, StageArtifact::Extraction(&extraction))?;
        self.report(conn, run, Stage::Extraction, None);

        // ── Normalization ──
        let normalized = self.normalizer.normalize(&extraction.raw_text)?;
        let normalization = Normalization {
            id: Uuid::new_v4(),
            extraction_id: extraction.id,
            payload: normalized.value.payload,
            method: normalized.value.method,
            confidence: normalized.value.confidence,
            created_at: Utc::now(),
        };
        self.commit(conn, run, StageArtifact::Normalization(&normalization))?;
        self.report(conn, run, Stage::Normalization, Some(&normalized.invocation));

        // ── Generation ──
        let generated = self.generator.generate(&normalization.payload)?;
        let draft = generated.value;
        let prescription = Prescription {
            id: Uuid::new_v4(),
            normalization_id: normalization.id,
            generated_text: draft.text,
            parameters: draft.parameters,
            guardrail_status: draft.guardrail_status,
            model_id: draft.model_id,
            prompt_version: draft.prompt_version,
            created_at: Utc::now(),
        };
        self.commit(conn, run, StageArtifact::Prescription(&prescription))?;
        self.report(conn, run, Stage::Prescription, Some(&generated.invocation));

        Ok(())
    }

    /// Persist the artifact and the forward transition together; only then
    /// does the in-memory run move.
    fn commit(
        &self,
        conn: &Connection,
        run: &mut WorkflowRun,
        artifact: StageArtifact<'_>,
    ) -> Result<(), PipelineError> {
        let next = transition(run.state(), RunEvent::StageSucceeded)?;
        let updated = run.clone().with_state(next);
        commit_stage(conn, artifact, &updated)?;
        *run = updated;
        Ok(())
    }

    fn report(
        &self,
        conn: &Connection,
        run: &WorkflowRun,
        stage: Stage,
        invocation: Option<&AgentInvocation>,
    ) {
        self.observer.on_stage(
            conn,
            &StageReport {
                run,
                stage,
                invocation,
                failure: None,
            },
        );
    }

    fn fail_run(
        &self,
        conn: &Connection,
        run: WorkflowRun,
        error: &PipelineError,
    ) -> Result<WorkflowRun, PipelineError> {
        let stage = run.current_stage;
        let next = transition(run.state(), RunEvent::Fail)?;
        let failed = run.with_state(next);
        update_run_state(conn, &failed)?;

        let reason = error.to_string();
        self.observer.on_stage(
            conn,
            &StageReport {
                run: &failed,
                stage,
                invocation: None,
                failure: Some(&reason),
            },
        );
        Ok(failed)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
