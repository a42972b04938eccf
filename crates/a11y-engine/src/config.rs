//! Tunable detection heuristics
//!
//! The numeric defaults are empirically chosen. They are kept as named
//! values so they can be tuned per deployment without touching the rules.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Minimum OCR confidence (0-100) before recognized text is trusted
pub const OCR_CONFIDENCE_THRESHOLD: f32 = 40.0;

/// Text blocks at least this tall count as "large text"
pub const LARGE_TEXT_MIN_HEIGHT_PX: u32 = 24;

/// Per-channel bucket size used when counting pixel colors
pub const COLOR_QUANTIZATION_STEP: u8 = 30;

/// Pixels with alpha below this are ignored when sampling colors
pub const ALPHA_VISIBILITY_THRESHOLD: u8 = 128;

/// WCAG AA minimum for normal text
pub const NORMAL_TEXT_MIN_CONTRAST: f64 = 4.5;

/// WCAG AA minimum for large text
pub const LARGE_TEXT_MIN_CONTRAST: f64 = 3.0;

/// Sample every Nth pixel when the fallback estimate runs on a large image
pub const FALLBACK_SAMPLE_STRIDE: u32 = 10;

/// Images up to this many pixels are scanned in full by the fallback estimate
pub const FALLBACK_FULL_SCAN_MAX_PIXELS: u64 = 250_000;

/// Link text at or above this many characters is never considered vague
pub const VAGUE_LINK_MAX_LEN: usize = 20;

pub const VAGUE_LINK_PHRASES: &[&str] = &["click", "here", "link", "more", "read"];

/// Rule tags passed to the generic DOM accessibility engine
pub const GENERIC_RULE_TAGS: &[&str] = &["wcag2a", "wcag2aa", "wcag21a", "wcag21aa"];

/// Generic rules that overlap the custom analyzers
pub const DISABLED_GENERIC_RULES: &[&str] = &[
    "image-alt",
    "empty-heading",
    "heading-order",
    "page-has-heading-one",
    "link-name",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub ocr_confidence_threshold: f32,
    pub large_text_min_height_px: u32,
    pub color_quantization_step: u8,
    pub alpha_visibility_threshold: u8,
    pub normal_text_min_contrast: f64,
    pub large_text_min_contrast: f64,
    pub fallback_sample_stride: u32,
    pub fallback_full_scan_max_pixels: u64,
    pub vague_link_max_len: usize,
    pub vague_link_phrases: Vec<String>,
    pub generic_rule_tags: Vec<String>,
    pub disabled_generic_rules: Vec<String>,
    /// Run OCR on images missing alt text to pre-fill a suggestion
    pub ocr_alt_suggestions: bool,
    /// Directory relative image paths are resolved against
    pub base_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ocr_confidence_threshold: OCR_CONFIDENCE_THRESHOLD,
            large_text_min_height_px: LARGE_TEXT_MIN_HEIGHT_PX,
            color_quantization_step: COLOR_QUANTIZATION_STEP,
            alpha_visibility_threshold: ALPHA_VISIBILITY_THRESHOLD,
            normal_text_min_contrast: NORMAL_TEXT_MIN_CONTRAST,
            large_text_min_contrast: LARGE_TEXT_MIN_CONTRAST,
            fallback_sample_stride: FALLBACK_SAMPLE_STRIDE,
            fallback_full_scan_max_pixels: FALLBACK_FULL_SCAN_MAX_PIXELS,
            vague_link_max_len: VAGUE_LINK_MAX_LEN,
            vague_link_phrases: VAGUE_LINK_PHRASES.iter().map(|s| s.to_string()).collect(),
            generic_rule_tags: GENERIC_RULE_TAGS.iter().map(|s| s.to_string()).collect(),
            disabled_generic_rules: DISABLED_GENERIC_RULES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ocr_alt_suggestions: true,
            base_path: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Parse a JSON config; omitted fields keep their defaults
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.ocr_confidence_threshold) {
            return Err(EngineError::Config(format!(
                "ocr_confidence_threshold must be within 0-100, got {}",
                self.ocr_confidence_threshold
            )));
        }
        if self.color_quantization_step == 0 {
            return Err(EngineError::Config(
                "color_quantization_step must be greater than zero".to_string(),
            ));
        }
        if self.fallback_sample_stride == 0 {
            return Err(EngineError::Config(
                "fallback_sample_stride must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("normal_text_min_contrast", self.normal_text_min_contrast),
            ("large_text_min_contrast", self.large_text_min_contrast),
        ] {
            if !(1.0..=21.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be within 1-21, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
