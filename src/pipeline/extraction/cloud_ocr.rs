//! Cloud document-text-detection engine (images only).

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::{DocumentKind, OcrOutput, OcrProvider, CLOUD_OCR_ENGINE};
use super::ExtractionError;
use crate::config::CloudOcrConfig;

pub struct CloudOcrClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl CloudOcrClient {
    pub fn new(config: &CloudOcrConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::CloudRequest(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ResponseError>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<PageAnnotation>,
}

#[derive(Deserialize)]
struct PageAnnotation {
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct ResponseError {
    #[serde(default)]
    message: String,
}

impl OcrProvider for CloudOcrClient {
    fn name(&self) -> &str {
        CLOUD_OCR_ENGINE
    }

    fn recognize(&self, bytes: &[u8], kind: DocumentKind) -> Result<OcrOutput, ExtractionError> {
        if kind == DocumentKind::Pdf {
            return Err(ExtractionError::CloudRequest(
                "cloud engine accepts images only".into(),
            ));
        }

        let body = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(bytes),
                },
                features: [Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
            }],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::CloudRequest(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::CloudRequest(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ExtractionError::CloudResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(ExtractionError::CloudRequest(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        parse_annotate_response(&text)
    }
}

/// Text comes from the first response's full annotation; confidence is the mean
/// page confidence (0.0 when the engine reports none).
pub fn parse_annotate_response(body: &str) -> Result<OcrOutput, ExtractionError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::CloudResponse(e.to_string()))?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Err(ExtractionError::CloudResponse("no responses".into()));
    };
    if let Some(err) = first.error {
        return Err(ExtractionError::CloudResponse(err.message));
    }
    let Some(annotation) = first.full_text_annotation else {
        // No text detected in the image.
        return Ok(OcrOutput {
            text: String::new(),
            confidence: 0.0,
        });
    };

    let confidences: Vec<f32> = annotation.pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    Ok(OcrOutput {
        text: annotation.text,
        confidence: confidence.clamp(0.0, 1.0),
    })
}
