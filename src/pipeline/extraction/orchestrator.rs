use std::sync::Arc;
use std::time::Instant;

use super::counters::ExtractionCounters;
use super::quality::{evaluate_quality, QualityThresholds};
use super::types::{
    select_ocr_engine, DocumentKind, ExtractedText, ProviderRegistry, TextLayerReader,
    CLOUD_OCR_ENGINE, LOCAL_OCR_ENGINE, NATIVE_TEXT_CONFIDENCE, NATIVE_TEXT_ENGINE,
    PLAIN_TEXT_CONFIDENCE, PLAIN_TEXT_ENGINE,
};
use super::OcrEnginePreference;
use crate::config::ExtractionConfig;

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// One file handed to the extraction stage.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub bytes: &'a [u8],
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
}

/// Declared content type wins; the filename extension is only consulted when
/// the content type is missing, generic or not a MIME type at all (`"pdf"`).
pub fn classify_document(content_type: Option<&str>, file_name: &str) -> DocumentKind {
    let declared = content_type
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|ct| ct.contains('/') && ct != GENERIC_CONTENT_TYPE);

    match declared {
        Some(ct) => kind_of_mime(&ct),
        None => mime_guess::from_path(file_name)
            .first()
            .map(|m| kind_of_mime(m.essence_str()))
            .unwrap_or(DocumentKind::Other),
    }
}

fn kind_of_mime(mime: &str) -> DocumentKind {
    if mime == "application/pdf" {
        DocumentKind::Pdf
    } else if mime.starts_with("image/") {
        DocumentKind::Image
    } else {
        DocumentKind::Other
    }
}

/// Chooses the extraction path per document kind, applies the quality
/// heuristic and the single cloud→local fallback. Never fails: provider
/// errors become empty, zero-confidence results.
pub struct TextExtractionOrchestrator {
    registry: ProviderRegistry,
    text_layer: Box<dyn TextLayerReader + Send + Sync>,
    image_engine: OcrEnginePreference,
    min_ocr_confidence: f32,
    thresholds: QualityThresholds,
    counters: Arc<ExtractionCounters>,
}

impl TextExtractionOrchestrator {
    pub fn new(
        registry: ProviderRegistry,
        text_layer: Box<dyn TextLayerReader + Send + Sync>,
        config: &ExtractionConfig,
        counters: Arc<ExtractionCounters>,
    ) -> Self {
        Self {
            registry,
            text_layer,
            image_engine: config.image_engine,
            min_ocr_confidence: config.min_ocr_confidence,
            thresholds: config.quality.clone(),
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<ExtractionCounters> {
        &self.counters
    }

    pub fn extract(&self, input: ExtractionInput<'_>) -> ExtractedText {
        let kind = classify_document(input.content_type, input.file_name);
        let start = Instant::now();

        let result = match kind {
            DocumentKind::Pdf => self.extract_pdf(input.bytes),
            DocumentKind::Image => self.extract_with_ocr(input.bytes, DocumentKind::Image),
            DocumentKind::Other => self.extract_other(input.bytes),
        };

        tracing::info!(
            kind = ?kind,
            engine = %result.engine,
            confidence = result.confidence,
            text_len = result.text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Text extraction finished"
        );
        result
    }

    fn extract_pdf(&self, bytes: &[u8]) -> ExtractedText {
        match self.text_layer.read_text(bytes) {
            Ok(text) => match evaluate_quality(&text, &self.thresholds) {
                Ok(()) => {
                    self.counters.record_native_text_hit();
                    return ExtractedText {
                        text,
                        engine: NATIVE_TEXT_ENGINE.to_string(),
                        confidence: NATIVE_TEXT_CONFIDENCE,
                    };
                }
                Err(reason) => {
                    self.counters.record_rejection();
                    tracing::debug!(reason = reason.as_str(), "PDF text layer rejected, using OCR");
                }
            },
            Err(e) => {
                self.counters.record_provider_failure();
                tracing::warn!(error = %e, "PDF text layer unreadable, using OCR");
            }
        }
        self.extract_with_ocr(bytes, DocumentKind::Pdf)
    }

    fn extract_other(&self, bytes: &[u8]) -> ExtractedText {
        if let Ok(text) = std::str::from_utf8(bytes) {
            match evaluate_quality(text, &self.thresholds) {
                Ok(()) => {
                    self.counters.record_plain_text_hit();
                    return ExtractedText {
                        text: text.to_string(),
                        engine: PLAIN_TEXT_ENGINE.to_string(),
                        confidence: PLAIN_TEXT_CONFIDENCE,
                    };
                }
                Err(reason) => {
                    self.counters.record_rejection();
                    tracing::debug!(reason = reason.as_str(), "Plain text rejected, using OCR");
                }
            }
        }
        self.extract_with_ocr(bytes, DocumentKind::Other)
    }

    fn extract_with_ocr(&self, bytes: &[u8], kind: DocumentKind) -> ExtractedText {
        let mut engine = select_ocr_engine(kind, self.image_engine);
        if engine == CLOUD_OCR_ENGINE && !self.registry.contains(CLOUD_OCR_ENGINE) {
            tracing::warn!("Cloud OCR preferred but not configured, using local engine");
            engine = LOCAL_OCR_ENGINE;
        }

        let result = self.call_provider(engine, bytes, kind);

        let weak = result.text.trim().is_empty() || result.confidence < self.min_ocr_confidence;
        if engine == CLOUD_OCR_ENGINE && kind == DocumentKind::Image && weak {
            self.counters.record_fallback();
            tracing::info!(
                cloud_confidence = result.confidence,
                min_confidence = self.min_ocr_confidence,
                "Cloud OCR result too weak, falling back to local engine"
            );
            return self.call_provider(LOCAL_OCR_ENGINE, bytes, kind);
        }
        result
    }

    fn call_provider(&self, engine: &str, bytes: &[u8], kind: DocumentKind) -> ExtractedText {
        let Some(provider) = self.registry.get(engine) else {
            self.counters.record_provider_failure();
            tracing::error!(engine, "OCR engine not registered");
            return ExtractedText::empty(engine);
        };

        match provider.recognize(bytes, kind) {
            Ok(out) => {
                self.counters.record_ocr_success();
                ExtractedText {
                    text: out.text,
                    engine: engine.to_string(),
                    confidence: out.confidence.clamp(0.0, 1.0),
                }
            }
            Err(e) => {
                self.counters.record_provider_failure();
                tracing::warn!(engine, error = %e, "OCR provider failed");
                ExtractedText::empty(engine)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::AppConfig;
    use crate::pipeline::extraction::types::{OcrOutput, OcrProvider};
    use crate::pipeline::extraction::ExtractionError;

    pub(crate) const CLINICAL_TEXT: &str =
        "Assessment: chronic lateral epicondylitis, right elbow. Grip strength reduced.";

    /// OCR provider returning a fixed result and counting calls.
    pub(crate) struct CountingOcr {
        name: &'static str,
        output: Option<OcrOutput>,
        pub(crate) calls: AtomicUsize,
    }

    impl CountingOcr {
        pub(crate) fn returning(name: &'static str, text: &str, confidence: f32) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: Some(OcrOutput {
                    text: text.to_string(),
                    confidence,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrProvider for CountingOcr {
        fn name(&self) -> &str {
            self.name
        }

        fn recognize(&self, _: &[u8], _: DocumentKind) -> Result<OcrOutput, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output
                .clone()
                .ok_or_else(|| ExtractionError::OcrProcessing("engine crashed".into()))
        }
    }

    pub(crate) struct FixedTextLayer {
        text: Option<String>,
    }

    impl FixedTextLayer {
        pub(crate) fn with_text(text: &str) -> Box<Self> {
            Box::new(Self {
                text: Some(text.to_string()),
            })
        }

        pub(crate) fn unreadable() -> Box<Self> {
            Box::new(Self { text: None })
        }
    }

    impl TextLayerReader for FixedTextLayer {
        fn read_text(&self, _: &[u8]) -> Result<String, ExtractionError> {
            self.text
                .clone()
                .ok_or_else(|| ExtractionError::PdfParsing("no xref table".into()))
        }
    }

    fn extraction_config(preference: OcrEnginePreference) -> ExtractionConfig {
        let mut config = AppConfig::default().extraction;
        config.image_engine = preference;
        config.min_ocr_confidence = 0.2;
        config
    }

    fn orchestrator(
        local: &Arc<CountingOcr>,
        cloud: Option<&Arc<CountingOcr>>,
        layer: Box<FixedTextLayer>,
        preference: OcrEnginePreference,
    ) -> TextExtractionOrchestrator {
        let mut registry = ProviderRegistry::new().register(local.clone());
        if let Some(cloud) = cloud {
            registry = registry.register(cloud.clone());
        }
        TextExtractionOrchestrator::new(
            registry,
            layer,
            &extraction_config(preference),
            Arc::new(ExtractionCounters::new()),
        )
    }

    fn input<'a>(bytes: &'a [u8], name: &'a str, ct: Option<&'a str>) -> ExtractionInput<'a> {
        ExtractionInput {
            bytes,
            file_name: name,
            content_type: ct,
        }
    }

    #[test]
    fn classification_prefers_declared_content_type() {
        assert_eq!(classify_document(Some("application/pdf"), "scan.png"), DocumentKind::Pdf);
        assert_eq!(classify_document(Some("image/jpeg"), "report.pdf"), DocumentKind::Image);
        assert_eq!(classify_document(Some("text/plain"), "report.pdf"), DocumentKind::Other);
        assert_eq!(
            classify_document(Some("application/pdf; charset=binary"), "x"),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn classification_falls_back_to_extension_for_generic_types() {
        assert_eq!(classify_document(None, "scan.PDF"), DocumentKind::Pdf);
        assert_eq!(
            classify_document(Some("application/octet-stream"), "xray.png"),
            DocumentKind::Image
        );
        assert_eq!(classify_document(Some(""), "photo.jpg"), DocumentKind::Image);
        assert_eq!(classify_document(None, "notes"), DocumentKind::Other);
    }

    #[test]
    fn bare_type_labels_fall_back_to_extension() {
        assert_eq!(classify_document(Some("pdf"), "scan.pdf"), DocumentKind::Pdf);
        assert_eq!(classify_document(Some("PNG"), "xray.png"), DocumentKind::Image);
        assert_eq!(classify_document(Some("pdf"), "notes"), DocumentKind::Other);
    }

    #[test]
    fn bare_pdf_label_reads_text_layer() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "ocr", 0.9);
        let orch = orchestrator(
            &local,
            None,
            FixedTextLayer::with_text(CLINICAL_TEXT),
            OcrEnginePreference::Local,
        );

        let out = orch.extract(input(b"%PDF-1.7", "scan.pdf", Some("pdf")));
        assert_eq!(out.engine, NATIVE_TEXT_ENGINE);
        assert_eq!(local.call_count(), 0);
    }

    #[test]
    fn native_pdf_text_skips_ocr() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "ocr", 0.9);
        let cloud = CountingOcr::returning(CLOUD_OCR_ENGINE, "ocr", 0.9);
        let orch = orchestrator(
            &local,
            Some(&cloud),
            FixedTextLayer::with_text(CLINICAL_TEXT),
            OcrEnginePreference::Cloud,
        );

        let out = orch.extract(input(b"%PDF-1.7", "report.pdf", Some("application/pdf")));
        assert_eq!(out.engine, NATIVE_TEXT_ENGINE);
        assert!((out.confidence - 0.95).abs() < f32::EPSILON);
        assert_eq!(out.text, CLINICAL_TEXT);
        assert_eq!(local.call_count(), 0);
        assert_eq!(cloud.call_count(), 0);
        assert_eq!(orch.counters().snapshot().native_text_hits, 1);
    }

    #[test]
    fn scanned_pdf_uses_local_once_regardless_of_preference() {
        for preference in [OcrEnginePreference::Local, OcrEnginePreference::Cloud] {
            let local = CountingOcr::returning(LOCAL_OCR_ENGINE, CLINICAL_TEXT, 0.05);
            let cloud = CountingOcr::returning(CLOUD_OCR_ENGINE, "cloud text", 0.99);
            let orch = orchestrator(&local, Some(&cloud), FixedTextLayer::with_text("  \n"), preference);

            let out = orch.extract(input(b"%PDF-1.4", "scan.pdf", Some("application/pdf")));
            assert_eq!(out.engine, LOCAL_OCR_ENGINE);
            assert_eq!(local.call_count(), 1);
            assert_eq!(cloud.call_count(), 0);
        }
    }

    #[test]
    fn unreadable_text_layer_goes_to_ocr() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, CLINICAL_TEXT, 0.8);
        let orch = orchestrator(&local, None, FixedTextLayer::unreadable(), OcrEnginePreference::Local);

        let out = orch.extract(input(b"%PDF", "scan.pdf", None));
        assert_eq!(out.engine, LOCAL_OCR_ENGINE);
        assert_eq!(local.call_count(), 1);
        assert_eq!(orch.counters().snapshot().provider_failures, 1);
    }

    #[test]
    fn weak_cloud_result_falls_back_to_local_once() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "local text", 0.6);
        let cloud = CountingOcr::returning(CLOUD_OCR_ENGINE, "cloud text", 0.1);
        let orch = orchestrator(
            &local,
            Some(&cloud),
            FixedTextLayer::unreadable(),
            OcrEnginePreference::Cloud,
        );

        let out = orch.extract(input(b"\x89PNG", "scan.png", Some("image/png")));
        assert_eq!(cloud.call_count(), 1);
        assert_eq!(local.call_count(), 1);
        assert_eq!(out.text, "local text");
        assert_eq!(out.engine, LOCAL_OCR_ENGINE);
        assert_eq!(orch.counters().snapshot().cross_provider_fallbacks, 1);
    }

    #[test]
    fn confident_cloud_result_is_kept() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "local text", 0.6);
        let cloud = CountingOcr::returning(CLOUD_OCR_ENGINE, "cloud text", 0.9);
        let orch = orchestrator(
            &local,
            Some(&cloud),
            FixedTextLayer::unreadable(),
            OcrEnginePreference::Cloud,
        );

        let out = orch.extract(input(b"\x89PNG", "scan.png", Some("image/png")));
        assert_eq!(out.engine, CLOUD_OCR_ENGINE);
        assert_eq!(local.call_count(), 0);
    }

    #[test]
    fn failed_cloud_call_falls_back_and_failed_local_is_empty() {
        let local = CountingOcr::failing(LOCAL_OCR_ENGINE);
        let cloud = CountingOcr::failing(CLOUD_OCR_ENGINE);
        let orch = orchestrator(
            &local,
            Some(&cloud),
            FixedTextLayer::unreadable(),
            OcrEnginePreference::Cloud,
        );

        let out = orch.extract(input(b"\x89PNG", "scan.jpg", None));
        assert_eq!(cloud.call_count(), 1);
        assert_eq!(local.call_count(), 1);
        assert!(out.text.is_empty());
        assert_eq!(out.confidence, 0.0);
        assert_eq!(orch.counters().snapshot().provider_failures, 2);
    }

    #[test]
    fn local_preference_never_touches_cloud() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "", 0.0);
        let cloud = CountingOcr::returning(CLOUD_OCR_ENGINE, "cloud", 0.9);
        let orch = orchestrator(
            &local,
            Some(&cloud),
            FixedTextLayer::unreadable(),
            OcrEnginePreference::Local,
        );

        orch.extract(input(b"\x89PNG", "scan.png", Some("image/png")));
        assert_eq!(local.call_count(), 1);
        assert_eq!(cloud.call_count(), 0);
    }

    #[test]
    fn unconfigured_cloud_uses_local() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "local text", 0.7);
        let orch = orchestrator(&local, None, FixedTextLayer::unreadable(), OcrEnginePreference::Cloud);

        let out = orch.extract(input(b"\x89PNG", "scan.png", Some("image/png")));
        assert_eq!(out.engine, LOCAL_OCR_ENGINE);
        assert_eq!(local.call_count(), 1);
    }

    #[test]
    fn meaningful_plain_text_accepted() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "ocr", 0.9);
        let orch = orchestrator(&local, None, FixedTextLayer::unreadable(), OcrEnginePreference::Local);

        let out = orch.extract(input(CLINICAL_TEXT.as_bytes(), "notes.txt", Some("text/plain")));
        assert_eq!(out.engine, PLAIN_TEXT_ENGINE);
        assert!((out.confidence - 0.99).abs() < f32::EPSILON);
        assert_eq!(local.call_count(), 0);
    }

    #[test]
    fn binary_other_input_goes_to_local_ocr() {
        let local = CountingOcr::returning(LOCAL_OCR_ENGINE, "ocr text", 0.5);
        let orch = orchestrator(&local, None, FixedTextLayer::unreadable(), OcrEnginePreference::Cloud);

        let out = orch.extract(input(&[0xff, 0xfe, 0x00, 0x81], "blob.bin", None));
        assert_eq!(out.engine, LOCAL_OCR_ENGINE);
        assert_eq!(local.call_count(), 1);
    }
}
