//! Text contrast inside images
//!
//! OCR locates text blocks; the two most frequent colors inside each block
//! stand in for foreground and background. When OCR is missing or fails the
//! whole image is reduced to its two dominant colors instead. Both paths are
//! estimates, which is why failures here never produce an issue.

use async_trait::async_trait;
use image::RgbaImage;
use shared_types::{Cell, Issue};
use tracing::{debug, warn};

use super::{AnalysisContext, CellAnalyzer};
use crate::color::{contrast_ratio, dominant_colors, SamplingOptions};
use crate::config::AnalyzerConfig;
use crate::error::{EngineError, Result};
use crate::imaging::{recognize_once, OcrEngine, PageSegMode};
use crate::patterns::{find_images, ImageRef};

/// Lowest contrast found among an image's text blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastMeasurement {
    pub min_ratio: f64,
    /// At least one measured block met the large-text height
    pub has_large_text: bool,
}

impl ContrastMeasurement {
    pub fn required_ratio(&self, config: &AnalyzerConfig) -> f64 {
        if self.has_large_text {
            config.large_text_min_contrast
        } else {
            config.normal_text_min_contrast
        }
    }

    pub fn passes(&self, config: &AnalyzerConfig) -> bool {
        self.min_ratio >= self.required_ratio(config)
    }

    pub fn violation_id(&self) -> &'static str {
        if self.has_large_text {
            "color-insufficient-cc-large"
        } else {
            "color-insufficient-cc-normal"
        }
    }
}

fn sampling(config: &AnalyzerConfig, stride: u32) -> SamplingOptions {
    SamplingOptions {
        quantization_step: config.color_quantization_step,
        alpha_threshold: config.alpha_visibility_threshold,
        stride,
    }
}

/// Measure text contrast through OCR text blocks.
///
/// `Ok(None)` means the image is treated as accessible: OCR confidence was
/// below the threshold, or no block had two distinguishable colors.
pub async fn measure_text_contrast(
    img: &RgbaImage,
    ocr: &dyn OcrEngine,
    config: &AnalyzerConfig,
) -> Result<Option<ContrastMeasurement>> {
    let output = recognize_once(ocr, img, PageSegMode::SparseText).await?;
    if output.confidence < config.ocr_confidence_threshold {
        debug!(
            confidence = output.confidence,
            "OCR confidence too low, assuming image is accessible"
        );
        return Ok(None);
    }

    let (width, height) = img.dimensions();
    let mut measurement: Option<ContrastMeasurement> = None;

    for block in &output.blocks {
        let bbox = block.bbox.clamp_to(width, height);
        if bbox.width() == 0 || bbox.height() == 0 {
            continue;
        }
        let Some((first, second)) = dominant_colors(img, Some(bbox), sampling(config, 1)) else {
            continue;
        };
        let ratio = contrast_ratio(first, second);
        let large = bbox.height() >= config.large_text_min_height_px;

        measurement = Some(match measurement {
            None => ContrastMeasurement {
                min_ratio: ratio,
                has_large_text: large,
            },
            Some(m) => ContrastMeasurement {
                min_ratio: m.min_ratio.min(ratio),
                has_large_text: m.has_large_text || large,
            },
        });
    }

    Ok(measurement)
}

/// Whole-image estimate from the two dominant colors. Small images are
/// scanned in full, larger ones sampled on a grid.
pub fn estimate_image_contrast(img: &RgbaImage, config: &AnalyzerConfig) -> Option<f64> {
    let (width, height) = img.dimensions();
    let pixels = width as u64 * height as u64;
    let stride = if pixels <= config.fallback_full_scan_max_pixels {
        1
    } else {
        config.fallback_sample_stride
    };
    let (first, second) = dominant_colors(img, None, sampling(config, stride))?;
    Some(contrast_ratio(first, second))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn contrast_issue(cell: &Cell, image: &ImageRef, violation_id: &str, ratio: f64, required: f64) -> Issue {
    let kind = if violation_id.ends_with("large") {
        "large"
    } else {
        "normal"
    };
    Issue::new(cell, violation_id, image.raw.clone())
        .at(image.start, image.end)
        .with_custom_description(format!(
            "Text in this image has a contrast ratio of {:.2}:1, below the {:.1}:1 minimum for {} text.",
            ratio, required, kind
        ))
        .with_extra("contrastRatio", round2(ratio).into())
}

pub struct ColorContrastAnalyzer;

impl ColorContrastAnalyzer {
    async fn check_image(
        &self,
        image: &ImageRef,
        url: &str,
        cell: &Cell,
        ctx: &AnalysisContext<'_>,
    ) -> Result<Option<Issue>> {
        let config = ctx.config;
        let pixels = ctx.load_image(url, cell).await?;

        if let Some(ocr) = ctx.options.ocr {
            match measure_text_contrast(&pixels, ocr, config).await {
                Ok(Some(m)) if m.passes(config) => return Ok(None),
                Ok(Some(m)) => {
                    return Ok(Some(contrast_issue(
                        cell,
                        image,
                        m.violation_id(),
                        m.min_ratio,
                        m.required_ratio(config),
                    )))
                }
                Ok(None) => return Ok(None),
                Err(e) => debug!(image = %image.raw, "Text block analysis failed, estimating: {}", e),
            }
        }

        let required = config.normal_text_min_contrast;
        Ok(estimate_image_contrast(&pixels, config)
            .filter(|ratio| *ratio < required)
            .map(|ratio| {
                contrast_issue(cell, image, "color-insufficient-cc-normal", ratio, required)
                    .with_extra("estimated", true.into())
            }))
    }
}

#[async_trait]
impl CellAnalyzer for ColorContrastAnalyzer {
    fn name(&self) -> &'static str {
        "color-contrast"
    }

    fn is_available(&self, ctx: &AnalysisContext<'_>) -> bool {
        ctx.options.image_loader.is_some()
    }

    async fn check_cell(&self, cell: &Cell, ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();

        for image in find_images(&cell.source) {
            let Some(url) = image.url.as_deref() else {
                continue;
            };
            match self.check_image(&image, url, cell, ctx).await {
                Ok(Some(issue)) => issues.push(issue),
                Ok(None) => {}
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(e) => warn!(
                    cell = cell.index,
                    image = %image.raw,
                    "Skipping contrast check: {}",
                    e
                ),
            }
        }

        Ok(issues)
    }
}
