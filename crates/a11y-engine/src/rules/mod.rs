//! Accessibility analyzers
//!
//! Each detection category implements one of two shapes: a notebook-wide
//! pass over all cells (headings) or a per-cell pass (everything else). The
//! orchestrator composes them as a fixed, ordered list.

pub mod contrast;
pub mod dom;
pub mod headings;
pub mod images;
pub mod links;
pub mod tables;

use std::path::Path;

use async_trait::async_trait;
use image::RgbaImage;
use shared_types::{Cell, Issue};
use tokio_util::sync::CancellationToken;

use crate::config::AnalyzerConfig;
use crate::error::{EngineError, Result};
use crate::imaging::{resolve_image_source, ImageLoader, OcrEngine};

pub use contrast::ColorContrastAnalyzer;
pub use dom::{DomAuditOptions, DomContext, DomFinding, GenericDomAnalyzer, HeadlessDomContext};
pub use headings::{HeadingOrderAnalyzer, HeadingStructureAnalyzer};
pub use images::ImageAltAnalyzer;
pub use links::LinkTextAnalyzer;
pub use tables::TableStructureAnalyzer;

/// Injected collaborators for one analysis run
#[derive(Clone, Copy, Default)]
pub struct AnalyzeOptions<'a> {
    /// Markdown rendering and the generic DOM rule engine
    pub dom: Option<&'a dyn DomContext>,
    /// Overrides `AnalyzerConfig::base_path` for relative image paths
    pub base_path: Option<&'a Path>,
    pub image_loader: Option<&'a dyn ImageLoader>,
    pub ocr: Option<&'a dyn OcrEngine>,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> AnalyzeOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dom(mut self, dom: &'a dyn DomContext) -> Self {
        self.dom = Some(dom);
        self
    }

    pub fn with_base_path(mut self, base_path: &'a Path) -> Self {
        self.base_path = Some(base_path);
        self
    }

    pub fn with_image_loader(mut self, loader: &'a dyn ImageLoader) -> Self {
        self.image_loader = Some(loader);
        self
    }

    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Everything an analyzer may consult while checking cells
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub config: &'a AnalyzerConfig,
    pub options: AnalyzeOptions<'a>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(config: &'a AnalyzerConfig, options: AnalyzeOptions<'a>) -> Self {
        Self { config, options }
    }

    pub fn base_path(&self) -> Option<&'a Path> {
        self.options
            .base_path
            .or(self.config.base_path.as_deref())
    }

    pub fn check_cancelled(&self) -> Result<()> {
        match self.options.cancel {
            Some(token) if token.is_cancelled() => Err(EngineError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Resolve and decode an image referenced from `cell`, checking for
    /// cancellation on both sides of the load
    pub async fn load_image(&self, url: &str, cell: &Cell) -> Result<RgbaImage> {
        let loader = self.options.image_loader.ok_or_else(|| {
            EngineError::ImageUnavailable("no image loader configured".to_string())
        })?;
        let source = resolve_image_source(url, cell, self.base_path())?;
        self.check_cancelled()?;
        let pixels = loader.load(&source).await?;
        self.check_cancelled()?;
        Ok(pixels)
    }
}

/// Analyzer over the whole ordered cell sequence
pub trait NotebookAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn check_notebook(&self, cells: &[Cell], ctx: &AnalysisContext<'_>) -> Vec<Issue>;
}

/// Analyzer over one markdown cell at a time
#[async_trait]
pub trait CellAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the collaborators this analyzer needs are present
    fn is_available(&self, _ctx: &AnalysisContext<'_>) -> bool {
        true
    }

    async fn check_cell(&self, cell: &Cell, ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>>;
}
