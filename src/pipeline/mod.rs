pub mod dispatcher;
pub mod extraction;
pub mod generation;
pub mod llm;
pub mod normalization;
pub mod stage;
pub mod trigger;
pub mod workflow;

use std::sync::Arc;

use crate::config::AppConfig;
use extraction::{
    CloudOcrClient, ExtractionCounters, PdfTextLayer, ProviderRegistry, TesseractCli,
    TextExtractionOrchestrator,
};
use generation::Generator;
use llm::{LlmClient, LlmError, OllamaClient};
use normalization::Normalizer;
use trigger::LocalObjectStore;
use workflow::{PipelineRunner, StageCounters, TraceRecorder};

/// Counters shared between the pipeline and the metrics endpoint.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    pub extraction: Arc<ExtractionCounters>,
    pub stages: Arc<StageCounters>,
}

/// Assemble the production runner from configuration.
///
/// Builds blocking HTTP clients, so call it off the async runtime.
pub fn build_runner(
    config: &AppConfig,
    counters: &PipelineCounters,
) -> Result<PipelineRunner, LlmError> {
    let mut registry = ProviderRegistry::new()
        .register(Arc::new(TesseractCli::new(config.extraction.local.clone())));
    if let Some(cloud) = &config.extraction.cloud {
        match CloudOcrClient::new(cloud) {
            Ok(client) => registry = registry.register(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "Cloud OCR client unavailable, images use local OCR"),
        }
    }
    tracing::info!(engines = ?registry.names(), "OCR engines registered");

    let extractor = TextExtractionOrchestrator::new(
        registry,
        Box::new(PdfTextLayer),
        &config.extraction,
        counters.extraction.clone(),
    );

    let llm_config = &config.llm;
    let client: Option<Arc<dyn LlmClient + Send + Sync>> =
        if llm_config.normalization_enabled || llm_config.generation_enabled {
            Some(Arc::new(OllamaClient::from_config(llm_config)?))
        } else {
            None
        };

    let normalizer = match (&client, llm_config.normalization_enabled) {
        (Some(c), true) => Normalizer::with_llm(c.clone(), &llm_config.model),
        _ => Normalizer::deterministic(),
    };
    let generator = match (&client, llm_config.generation_enabled) {
        (Some(c), true) => Generator::with_llm(c.clone(), &llm_config.model),
        _ => Generator::stub(),
    };

    Ok(PipelineRunner::new(
        Arc::new(LocalObjectStore::new(&config.storage_root)),
        extractor,
        Box::new(normalizer),
        Box::new(generator),
        Box::new(TraceRecorder::new(counters.stages.clone())),
    ))
}
