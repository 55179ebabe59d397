use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::pipeline::extraction::quality::QualityThresholds;
use crate::pipeline::extraction::OcrEnginePreference;

/// Application-level constants
pub const APP_NAME: &str = "clinidraft";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable prefix for every setting below.
const ENV_PREFIX: &str = "CLINIDRAFT_";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,clinidraft_lib=debug,clinidraft=debug"
}

/// Get the application data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Local OCR (Tesseract + Poppler) settings.
#[derive(Debug, Clone)]
pub struct LocalOcrConfig {
    pub tesseract_bin: String,
    pub pdftoppm_bin: String,
    pub lang: String,
    pub dpi: u32,
}

/// Cloud document-analysis engine settings. Absent when no endpoint is configured.
#[derive(Debug, Clone)]
pub struct CloudOcrConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Extraction stage settings.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub image_engine: OcrEnginePreference,
    /// OCR results below this confidence count as low-confidence.
    pub min_ocr_confidence: f32,
    pub quality: QualityThresholds,
    pub local: LocalOcrConfig,
    pub cloud: Option<CloudOcrConfig>,
}

/// Language model settings shared by normalization and generation.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub normalization_enabled: bool,
    pub generation_enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Full runtime configuration, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub storage_root: PathBuf,
    pub workers: usize,
    pub extraction: ExtractionConfig,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            db_path: data_dir.join("pipeline.db"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8088)),
            storage_root: data_dir.join("objects"),
            workers: 4,
            extraction: ExtractionConfig {
                image_engine: OcrEnginePreference::Local,
                min_ocr_confidence: 0.2,
                quality: QualityThresholds::default(),
                local: LocalOcrConfig {
                    tesseract_bin: "tesseract".into(),
                    pdftoppm_bin: "pdftoppm".into(),
                    lang: "eng".into(),
                    dpi: 300,
                },
                cloud: None,
            },
            llm: LlmConfig {
                normalization_enabled: false,
                generation_enabled: false,
                base_url: "http://localhost:11434".into(),
                model: "medgemma".into(),
                timeout_secs: 300,
            },
        }
    }
}

impl AppConfig {
    /// Build configuration from `CLINIDRAFT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in production).
    /// Unparseable values keep the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(path) = get("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(root) = get("STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        parse_into(&get, "BIND_ADDR", &mut config.bind_addr);
        parse_into(&get, "WORKERS", &mut config.workers);
        config.workers = config.workers.max(1);

        let extraction = &mut config.extraction;
        parse_into(&get, "IMAGE_OCR_ENGINE", &mut extraction.image_engine);
        parse_into(&get, "OCR_MIN_CONFIDENCE", &mut extraction.min_ocr_confidence);
        parse_into(&get, "QUALITY_MIN_CHARS", &mut extraction.quality.min_non_whitespace_chars);
        parse_into(&get, "QUALITY_MIN_ALPHA_RATIO", &mut extraction.quality.min_alpha_ratio);
        parse_into(&get, "QUALITY_MIN_DISTINCT", &mut extraction.quality.min_distinct_chars);
        parse_into(&get, "QUALITY_MIN_NON_WS_RATIO", &mut extraction.quality.min_non_whitespace_ratio);
        if let Some(bin) = get("TESSERACT_BIN") {
            extraction.local.tesseract_bin = bin;
        }
        if let Some(bin) = get("PDFTOPPM_BIN") {
            extraction.local.pdftoppm_bin = bin;
        }
        if let Some(lang) = get("OCR_LANG") {
            extraction.local.lang = lang;
        }
        parse_into(&get, "OCR_DPI", &mut extraction.local.dpi);

        if let Some(endpoint) = get("CLOUD_OCR_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            let mut cloud = CloudOcrConfig {
                endpoint,
                api_key: get("CLOUD_OCR_API_KEY"),
                timeout_secs: 60,
            };
            parse_into(&get, "CLOUD_OCR_TIMEOUT_SECS", &mut cloud.timeout_secs);
            extraction.cloud = Some(cloud);
        }

        let llm = &mut config.llm;
        parse_into(&get, "LLM_NORMALIZATION", &mut llm.normalization_enabled);
        parse_into(&get, "LLM_GENERATION", &mut llm.generation_enabled);
        if let Some(url) = get("LLM_BASE_URL") {
            llm.base_url = url;
        }
        if let Some(model) = get("LLM_MODEL") {
            llm.model = model;
        }
        parse_into(&get, "LLM_TIMEOUT_SECS", &mut llm.timeout_secs);

        config
    }
}

fn parse_into<T, G>(get: &G, name: &str, slot: &mut T)
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(
            variable = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            "Invalid configuration value, keeping default"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.extraction.image_engine, OcrEnginePreference::Local);
        assert!((config.extraction.min_ocr_confidence - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.extraction.quality.min_non_whitespace_chars, 30);
        assert!(config.extraction.cloud.is_none());
        assert!(!config.llm.normalization_enabled);
        assert!(!config.llm.generation_enabled);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("CLINIDRAFT_IMAGE_OCR_ENGINE", "cloud"),
            ("CLINIDRAFT_OCR_MIN_CONFIDENCE", "0.35"),
            ("CLINIDRAFT_CLOUD_OCR_ENDPOINT", "https://ocr.example.test/v1/images:annotate"),
            ("CLINIDRAFT_LLM_GENERATION", "true"),
            ("CLINIDRAFT_QUALITY_MIN_CHARS", "50"),
            ("CLINIDRAFT_BIND_ADDR", "0.0.0.0:9000"),
        ]);
        assert_eq!(config.extraction.image_engine, OcrEnginePreference::Cloud);
        assert!((config.extraction.min_ocr_confidence - 0.35).abs() < f32::EPSILON);
        assert!(config.extraction.cloud.is_some());
        assert!(config.llm.generation_enabled);
        assert_eq!(config.extraction.quality.min_non_whitespace_chars, 50);
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = config_from(&[
            ("CLINIDRAFT_OCR_MIN_CONFIDENCE", "high"),
            ("CLINIDRAFT_IMAGE_OCR_ENGINE", "quantum"),
            ("CLINIDRAFT_WORKERS", "0"),
        ]);
        assert!((config.extraction.min_ocr_confidence - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.extraction.image_engine, OcrEnginePreference::Local);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn blank_cloud_endpoint_leaves_cloud_unconfigured() {
        let config = config_from(&[("CLINIDRAFT_CLOUD_OCR_ENDPOINT", "  ")]);
        assert!(config.extraction.cloud.is_none());
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }
}
