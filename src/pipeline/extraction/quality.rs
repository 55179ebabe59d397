//! Quality heuristic: decides whether extracted text is meaningful enough to
//! skip OCR (or to accept as plain text).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// All thresholds are configurable; defaults match the production tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub min_non_whitespace_chars: usize,
    /// Alphabetic characters / all characters.
    pub min_alpha_ratio: f32,
    pub min_distinct_chars: usize,
    /// Non-whitespace characters / all characters.
    pub min_non_whitespace_ratio: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_non_whitespace_chars: 30,
            min_alpha_ratio: 0.15,
            min_distinct_chars: 10,
            min_non_whitespace_ratio: 0.30,
        }
    }
}

/// Why a text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Blank,
    TooShort,
    LowAlphaRatio,
    LowDistinctChars,
    MostlyWhitespace,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::TooShort => "too_short",
            Self::LowAlphaRatio => "low_alpha_ratio",
            Self::LowDistinctChars => "low_distinct_chars",
            Self::MostlyWhitespace => "mostly_whitespace",
        }
    }
}

/// Character statistics of a text after control characters are stripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    pub total: usize,
    pub non_whitespace: usize,
    pub alphabetic: usize,
    pub distinct: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let mut stats = TextStats {
            total: 0,
            non_whitespace: 0,
            alphabetic: 0,
            distinct: 0,
        };
        let mut seen = HashSet::new();
        for c in text.chars().filter(|c| !(c.is_control() && !c.is_whitespace())) {
            stats.total += 1;
            if c.is_whitespace() {
                continue;
            }
            stats.non_whitespace += 1;
            if c.is_alphabetic() {
                stats.alphabetic += 1;
            }
            seen.insert(c);
        }
        stats.distinct = seen.len();
        stats
    }
}

/// Classify `text`. `Ok(())` means meaningful.
pub fn evaluate_quality(text: &str, thresholds: &QualityThresholds) -> Result<(), RejectReason> {
    let stats = TextStats::of(text);

    if stats.non_whitespace == 0 {
        return Err(RejectReason::Blank);
    }
    if stats.non_whitespace < thresholds.min_non_whitespace_chars {
        return Err(RejectReason::TooShort);
    }
    let total = stats.total as f32;
    if (stats.alphabetic as f32 / total) < thresholds.min_alpha_ratio {
        return Err(RejectReason::LowAlphaRatio);
    }
    if stats.distinct < thresholds.min_distinct_chars {
        return Err(RejectReason::LowDistinctChars);
    }
    if (stats.non_whitespace as f32 / total) < thresholds.min_non_whitespace_ratio {
        return Err(RejectReason::MostlyWhitespace);
    }
    Ok(())
}

pub fn is_meaningful_text(text: &str, thresholds: &QualityThresholds) -> bool {
    evaluate_quality(text, thresholds).is_ok()
}
