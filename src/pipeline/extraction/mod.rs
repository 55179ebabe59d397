pub mod cloud_ocr;
pub mod counters;
pub mod local_ocr;
pub mod native_text;
pub mod orchestrator;
pub mod quality;
pub mod types;

pub use cloud_ocr::*;
pub use counters::*;
pub use local_ocr::*;
pub use native_text::*;
pub use orchestrator::*;
pub use quality::*;
pub use types::*;

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Cloud OCR request failed: {0}")]
    CloudRequest(String),

    #[error("Cloud OCR returned an unusable response: {0}")]
    CloudResponse(String),

    #[error("External tool not available: {0}")]
    ToolMissing(String),
}

/// Which OCR engine images go to. PDFs always use the local engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrEnginePreference {
    Local,
    Cloud,
}

impl FromStr for OcrEnginePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(format!("unknown OCR engine preference: {other}")),
        }
    }
}
