//! OCR collaborator seam
//!
//! Text recognition runs behind an FFI boundary; `TesseractOcr` (feature
//! `tesseract`) is the shipped backend. Each recognition gets a fresh worker
//! that is always terminated afterwards.

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Page segmentation strategy requested from the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic layout analysis
    Auto,
    /// Find as much scattered text as possible, in no particular order
    SparseText,
}

/// Pixel rectangle, `x1`/`y1` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Clip to a `width` x `height` image
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            x0: self.x0.min(width),
            y0: self.y0.min(height),
            x1: self.x1.min(width),
            y1: self.y1.min(height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// 0-100
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    /// Overall confidence, 0-100
    pub confidence: f32,
    pub blocks: Vec<TextBlock>,
}

/// A single recognizer instance
#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &RgbaImage, mode: PageSegMode) -> Result<OcrOutput>;

    async fn terminate(self: Box<Self>) -> Result<()>;
}

/// Factory for recognizer instances
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>>;
}

/// Run one recognition on a dedicated worker.
///
/// The worker is terminated whether or not recognition succeeded; a failed
/// termination is logged and does not mask the recognition result.
pub async fn recognize_once(
    engine: &dyn OcrEngine,
    image: &RgbaImage,
    mode: PageSegMode,
) -> Result<OcrOutput> {
    let mut worker = engine.create_worker().await?;
    let result = worker.recognize(image, mode).await;
    if let Err(e) = worker.terminate().await {
        warn!("Failed to terminate OCR worker: {}", e);
    }
    result
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedOcr;
    use super::*;
    use crate::imaging::test_support::solid;

    #[tokio::test]
    async fn test_worker_terminated_after_success() {
        let engine = ScriptedOcr::returning(OcrOutput {
            text: "Revenue by quarter".to_string(),
            confidence: 91.0,
            blocks: vec![],
        });
        let img = solid(4, 4, [255, 255, 255, 255]);
        let out = recognize_once(&engine, &img, PageSegMode::Auto).await.unwrap();
        assert_eq!(out.text, "Revenue by quarter");
        assert_eq!(engine.created(), 1);
        assert_eq!(engine.terminated(), 1);
    }

    #[tokio::test]
    async fn test_worker_terminated_after_failure() {
        let engine = ScriptedOcr::failing();
        let img = solid(4, 4, [255, 255, 255, 255]);
        assert!(recognize_once(&engine, &img, PageSegMode::SparseText)
            .await
            .is_err());
        assert_eq!(engine.created(), 1);
        assert_eq!(engine.terminated(), 1);
    }

    #[test]
    fn test_bounding_box_clamp() {
        let bbox = BoundingBox::new(5, 5, 50, 40).clamp_to(20, 30);
        assert_eq!(bbox, BoundingBox::new(5, 5, 20, 30));
        assert_eq!(bbox.width(), 15);
        assert_eq!(bbox.height(), 25);
        assert_eq!(BoundingBox::new(10, 10, 5, 5).width(), 0);
    }
}
