use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-path extraction counters. Observability only; never read by the pipeline.
#[derive(Debug, Default)]
pub struct ExtractionCounters {
    native_text_hits: AtomicU64,
    plain_text_hits: AtomicU64,
    ocr_successes: AtomicU64,
    cross_provider_fallbacks: AtomicU64,
    heuristic_rejections: AtomicU64,
    provider_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub native_text_hits: u64,
    pub plain_text_hits: u64,
    pub ocr_successes: u64,
    pub cross_provider_fallbacks: u64,
    pub heuristic_rejections: u64,
    pub provider_failures: u64,
}

impl ExtractionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_native_text_hit(&self) {
        self.native_text_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plain_text_hit(&self) {
        self.plain_text_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ocr_success(&self) {
        self.ocr_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.cross_provider_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.heuristic_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            native_text_hits: self.native_text_hits.load(Ordering::Relaxed),
            plain_text_hits: self.plain_text_hits.load(Ordering::Relaxed),
            ocr_successes: self.ocr_successes.load(Ordering::Relaxed),
            cross_provider_fallbacks: self.cross_provider_fallbacks.load(Ordering::Relaxed),
            heuristic_rejections: self.heuristic_rejections.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let counters = ExtractionCounters::new();
        counters.record_native_text_hit();
        counters.record_fallback();
        counters.record_fallback();
        counters.record_provider_failure();

        let snap = counters.snapshot();
        assert_eq!(snap.native_text_hits, 1);
        assert_eq!(snap.cross_provider_fallbacks, 2);
        assert_eq!(snap.provider_failures, 1);
        assert_eq!(snap.ocr_successes, 0);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(ExtractionCounters::new().snapshot()).unwrap();
        assert_eq!(json["crossProviderFallbacks"], 0);
        assert_eq!(json["heuristicRejections"], 0);
    }
}
