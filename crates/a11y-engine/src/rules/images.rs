//! Missing alternative text on images

use async_trait::async_trait;
use shared_types::{Cell, Issue};
use tracing::{debug, warn};

use super::{AnalysisContext, CellAnalyzer};
use crate::error::{EngineError, Result};
use crate::imaging::{recognize_once, PageSegMode};
use crate::patterns::{find_images, visible_text, ImageRef};

/// Images whose alt text is empty or absent, anchored at the image construct
pub fn check_missing_alt(cell: &Cell) -> Vec<(ImageRef, Issue)> {
    find_images(&cell.source)
        .into_iter()
        .filter(|image| !image.has_alt_text())
        .map(|image| {
            let issue =
                Issue::new(cell, "image-missing-alt", image.raw.clone()).at(image.start, image.end);
            (image, issue)
        })
        .collect()
}

pub struct ImageAltAnalyzer {
    /// Try OCR on flagged images to pre-fill a suggested alt text
    pub ocr_suggestions: bool,
}

impl ImageAltAnalyzer {
    pub fn new() -> Self {
        Self {
            ocr_suggestions: true,
        }
    }

    /// Alt-text checks only, no image loading
    pub fn without_ocr() -> Self {
        Self {
            ocr_suggestions: false,
        }
    }

    async fn suggest_alt_text(
        &self,
        image: &ImageRef,
        cell: &Cell,
        ctx: &AnalysisContext<'_>,
    ) -> Result<Option<String>> {
        let Some(ocr) = ctx.options.ocr else {
            return Ok(None);
        };
        let Some(url) = image.url.as_deref() else {
            return Ok(None);
        };
        let pixels = ctx.load_image(url, cell).await?;
        let output = recognize_once(ocr, &pixels, PageSegMode::Auto).await?;
        let text = visible_text(&output.text);
        if output.confidence > ctx.config.ocr_confidence_threshold && !text.is_empty() {
            Ok(Some(text))
        } else {
            debug!(
                confidence = output.confidence,
                "OCR result too weak for an alt text suggestion"
            );
            Ok(None)
        }
    }
}

impl Default for ImageAltAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CellAnalyzer for ImageAltAnalyzer {
    fn name(&self) -> &'static str {
        "image-alt-text"
    }

    async fn check_cell(&self, cell: &Cell, ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let try_ocr = self.ocr_suggestions && ctx.config.ocr_alt_suggestions;

        for (image, mut issue) in check_missing_alt(cell) {
            if try_ocr {
                match self.suggest_alt_text(&image, cell, ctx).await {
                    Ok(Some(text)) => issue.suggested_fix = Some(text),
                    Ok(None) => {}
                    Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                    Err(e) => warn!(
                        cell = cell.index,
                        image = %image.raw,
                        "Alt text suggestion failed: {}",
                        e
                    ),
                }
            }
            issues.push(issue);
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::imaging::ocr::test_support::ScriptedOcr;
    use crate::imaging::test_support::{png_base64, solid};
    use crate::imaging::{DefaultImageLoader, OcrOutput};
    use crate::rules::AnalyzeOptions;
    use pretty_assertions::assert_eq;
    use shared_types::Attachments;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_markdown_alt_is_flagged() {
        let cell = Cell::markdown(0, "![](foo.png)");
        let found = check_missing_alt(&cell);
        assert_eq!(found.len(), 1);
        let issue = &found[0].1;
        assert_eq!(issue.violation_id, "image-missing-alt");
        assert_eq!(issue.issue_content_raw, "![](foo.png)");
        assert_eq!(issue.anchored_text(&cell.source), Some("![](foo.png)"));
    }

    #[test]
    fn test_described_image_passes() {
        assert!(check_missing_alt(&Cell::markdown(0, "![a cat](foo.png)")).is_empty());
        assert!(check_missing_alt(&Cell::markdown(0, r#"<img src="a.png" alt="Bar chart">"#)).is_empty());
    }

    #[test]
    fn test_html_missing_and_empty_alt() {
        let cell = Cell::markdown(4, "Text <img src=\"a.png\">\n<img src=\"b.png\" alt=\"\">\n![  ](c.png)");
        let found = check_missing_alt(&cell);
        assert_eq!(found.len(), 3);
        for (_, issue) in &found {
            assert_eq!(issue.cell_index, 4);
            assert_eq!(
                issue.anchored_text(&cell.source),
                Some(issue.issue_content_raw.as_str())
            );
        }
    }

    fn attachment_cell(source: &str) -> Cell {
        let encoded = png_base64(&solid(8, 8, [255, 255, 255, 255]));
        let mut payloads = BTreeMap::new();
        payloads.insert("image/png".to_string(), encoded);
        let mut attachments = Attachments::new();
        attachments.insert("fig.png".to_string(), payloads);
        Cell::markdown(0, source).with_attachments(attachments)
    }

    #[tokio::test]
    async fn test_confident_ocr_fills_suggestion() {
        let cell = attachment_cell("![](attachment:fig.png)");
        let ocr = ScriptedOcr::returning(OcrOutput {
            text: "Quarterly\nrevenue".to_string(),
            confidence: 72.0,
            blocks: vec![],
        });
        let loader = DefaultImageLoader::new();
        let config = AnalyzerConfig::default();
        let options = AnalyzeOptions::new().with_image_loader(&loader).with_ocr(&ocr);
        let ctx = AnalysisContext::new(&config, options);

        let issues = ImageAltAnalyzer::new().check_cell(&cell, &ctx).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].suggested_fix.as_deref(), Some("Quarterly revenue"));
        assert_eq!(ocr.terminated(), 1);
    }

    #[tokio::test]
    async fn test_low_confidence_leaves_suggestion_empty() {
        let cell = attachment_cell("![](attachment:fig.png)");
        let ocr = ScriptedOcr::returning(OcrOutput {
            text: "~~ noise".to_string(),
            confidence: 40.0,
            blocks: vec![],
        });
        let loader = DefaultImageLoader::new();
        let config = AnalyzerConfig::default();
        let ctx = AnalysisContext::new(
            &config,
            AnalyzeOptions::new().with_image_loader(&loader).with_ocr(&ocr),
        );

        let issues = ImageAltAnalyzer::new().check_cell(&cell, &ctx).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].suggested_fix.is_none());
    }

    #[tokio::test]
    async fn test_ocr_failure_is_swallowed() {
        let cell = Cell::markdown(0, "![](attachment:missing.png)");
        let ocr = ScriptedOcr::failing();
        let loader = DefaultImageLoader::new();
        let config = AnalyzerConfig::default();
        let ctx = AnalysisContext::new(
            &config,
            AnalyzeOptions::new().with_image_loader(&loader).with_ocr(&ocr),
        );

        let issues = ImageAltAnalyzer::new().check_cell(&cell, &ctx).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].suggested_fix.is_none());
        // attachment lookup failed before any worker was created
        assert_eq!(ocr.created(), 0);
    }

    #[tokio::test]
    async fn test_without_ocr_never_loads() {
        let cell = attachment_cell("![](attachment:fig.png)");
        let ocr = ScriptedOcr::failing();
        let config = AnalyzerConfig::default();
        let ctx = AnalysisContext::new(&config, AnalyzeOptions::new().with_ocr(&ocr));

        let issues = ImageAltAnalyzer::without_ocr()
            .check_cell(&cell, &ctx)
            .await
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(ocr.created(), 0);
    }
}
