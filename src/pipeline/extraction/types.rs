use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ExtractionError, OcrEnginePreference};

pub const NATIVE_TEXT_ENGINE: &str = "native-text";
pub const PLAIN_TEXT_ENGINE: &str = "plain-text";
pub const LOCAL_OCR_ENGINE: &str = "local-ocr";
pub const CLOUD_OCR_ENGINE: &str = "cloud-ocr";

/// Confidence reported for a PDF text layer that passes the quality heuristic.
pub const NATIVE_TEXT_CONFIDENCE: f32 = 0.95;
/// Confidence reported for UTF-8 plain text that passes the quality heuristic.
pub const PLAIN_TEXT_CONFIDENCE: f32 = 0.99;

/// Coarse input classification driving the extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
    Other,
}

/// Output of the extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub engine: String,
    pub confidence: f32,
}

impl ExtractedText {
    /// Result recorded when a provider call failed.
    pub fn empty(engine: &str) -> Self {
        Self {
            text: String::new(),
            engine: engine.to_string(),
            confidence: 0.0,
        }
    }
}

/// Raw result of one OCR call.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

/// OCR capability: bytes in, text and confidence out.
pub trait OcrProvider {
    fn name(&self) -> &str;

    fn recognize(&self, bytes: &[u8], kind: DocumentKind) -> Result<OcrOutput, ExtractionError>;
}

/// Reads the embedded text layer of a searchable PDF.
pub trait TextLayerReader {
    fn read_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError>;
}

pub type SharedOcrProvider = Arc<dyn OcrProvider + Send + Sync>;

/// OCR providers keyed by engine name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, SharedOcrProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the provider's own name, replacing any previous entry.
    pub fn register(mut self, provider: SharedOcrProvider) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SharedOcrProvider> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Engine used for OCR given the document kind and the configured image preference.
pub fn select_ocr_engine(kind: DocumentKind, preference: OcrEnginePreference) -> &'static str {
    match (kind, preference) {
        (DocumentKind::Image, OcrEnginePreference::Cloud) => CLOUD_OCR_ENGINE,
        _ => LOCAL_OCR_ENGINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl OcrProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn recognize(&self, _: &[u8], _: DocumentKind) -> Result<OcrOutput, ExtractionError> {
            Ok(OcrOutput {
                text: String::new(),
                confidence: 0.0,
            })
        }
    }

    #[test]
    fn pdfs_always_select_local() {
        assert_eq!(select_ocr_engine(DocumentKind::Pdf, OcrEnginePreference::Cloud), LOCAL_OCR_ENGINE);
        assert_eq!(select_ocr_engine(DocumentKind::Pdf, OcrEnginePreference::Local), LOCAL_OCR_ENGINE);
    }

    #[test]
    fn images_follow_preference() {
        assert_eq!(select_ocr_engine(DocumentKind::Image, OcrEnginePreference::Cloud), CLOUD_OCR_ENGINE);
        assert_eq!(select_ocr_engine(DocumentKind::Image, OcrEnginePreference::Local), LOCAL_OCR_ENGINE);
        assert_eq!(select_ocr_engine(DocumentKind::Other, OcrEnginePreference::Cloud), LOCAL_OCR_ENGINE);
    }

    #[test]
    fn registry_keys_by_provider_name() {
        let registry = ProviderRegistry::new()
            .register(Arc::new(Named(LOCAL_OCR_ENGINE)))
            .register(Arc::new(Named(CLOUD_OCR_ENGINE)));
        assert!(registry.contains(LOCAL_OCR_ENGINE));
        assert_eq!(registry.get(CLOUD_OCR_ENGINE).map(|p| p.name()), Some(CLOUD_OCR_ENGINE));
        assert_eq!(registry.names(), vec![CLOUD_OCR_ENGINE, LOCAL_OCR_ENGINE]);
        assert!(registry.get("paddle").is_none());
    }

    #[test]
    fn engine_preference_parses_case_insensitively() {
        assert_eq!("Cloud".parse::<OcrEnginePreference>(), Ok(OcrEnginePreference::Cloud));
        assert_eq!("local".parse::<OcrEnginePreference>(), Ok(OcrEnginePreference::Local));
        assert!("tesseract".parse::<OcrEnginePreference>().is_err());
    }
}
