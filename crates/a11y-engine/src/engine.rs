//! Orchestrator
//!
//! Runs notebook-wide analyzers first, then every per-cell analyzer over
//! each markdown cell in order. Cells are processed strictly one after the
//! other; results are concatenated in discovery order.

use shared_types::{Cell, CellType, Issue};
use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::error::{EngineError, Result};
use crate::rules::{
    AnalysisContext, AnalyzeOptions, CellAnalyzer, ColorContrastAnalyzer, GenericDomAnalyzer,
    HeadingOrderAnalyzer, HeadingStructureAnalyzer, ImageAltAnalyzer, LinkTextAnalyzer,
    NotebookAnalyzer, TableStructureAnalyzer,
};

/// A11yEngine entry point
pub struct A11yEngine {
    config: AnalyzerConfig,
    notebook_analyzers: Vec<Box<dyn NotebookAnalyzer>>,
    cell_analyzers: Vec<Box<dyn CellAnalyzer>>,
}

impl A11yEngine {
    /// Every analyzer: headings, generic DOM rules, images with OCR
    /// suggestions, tables, color contrast, links
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_analyzers(
            config,
            vec![
                Box::new(HeadingStructureAnalyzer),
                Box::new(HeadingOrderAnalyzer),
            ],
            vec![
                Box::new(GenericDomAnalyzer),
                Box::new(ImageAltAnalyzer::new()),
                Box::new(TableStructureAnalyzer),
                Box::new(ColorContrastAnalyzer),
                Box::new(LinkTextAnalyzer),
            ],
        )
    }

    /// No rendering surface: skips the generic DOM rules, color contrast and
    /// OCR alt-text suggestions
    pub fn headless(config: AnalyzerConfig) -> Self {
        Self::with_analyzers(
            config,
            vec![
                Box::new(HeadingStructureAnalyzer),
                Box::new(HeadingOrderAnalyzer),
            ],
            vec![
                Box::new(ImageAltAnalyzer::without_ocr()),
                Box::new(TableStructureAnalyzer),
                Box::new(LinkTextAnalyzer),
            ],
        )
    }

    pub fn with_analyzers(
        config: AnalyzerConfig,
        notebook_analyzers: Vec<Box<dyn NotebookAnalyzer>>,
        cell_analyzers: Vec<Box<dyn CellAnalyzer>>,
    ) -> Self {
        Self {
            config,
            notebook_analyzers,
            cell_analyzers,
        }
    }

    /// Analyzer names in execution order
    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.notebook_analyzers
            .iter()
            .map(|a| a.name())
            .chain(self.cell_analyzers.iter().map(|a| a.name()))
            .collect()
    }

    pub async fn analyze(&self, cells: &[Cell], options: AnalyzeOptions<'_>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        self.analyze_into(cells, options, &mut issues).await?;
        Ok(issues)
    }

    /// Append issues to `issues` as each cell completes.
    ///
    /// On cancellation the vector keeps everything found for the cells that
    /// finished; a cell interrupted midway contributes nothing.
    pub async fn analyze_into(
        &self,
        cells: &[Cell],
        options: AnalyzeOptions<'_>,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let ctx = AnalysisContext::new(&self.config, options);
        ctx.check_cancelled()?;

        for analyzer in &self.notebook_analyzers {
            let found = analyzer.check_notebook(cells, &ctx);
            debug!(analyzer = analyzer.name(), issues = found.len(), "Notebook pass complete");
            issues.extend(found);
        }

        let available: Vec<&dyn CellAnalyzer> = self
            .cell_analyzers
            .iter()
            .map(|a| a.as_ref())
            .filter(|a| {
                let ok = a.is_available(&ctx);
                if !ok {
                    debug!(analyzer = a.name(), "Collaborator missing, analyzer skipped");
                }
                ok
            })
            .collect();

        for cell in cells {
            ctx.check_cancelled()?;
            match cell.cell_type {
                CellType::Markdown => {}
                CellType::Code => {
                    debug!(cell = cell.index, "Code cell analysis is not implemented, skipping");
                    continue;
                }
                CellType::Raw => continue,
            }

            let mut cell_issues = Vec::new();
            for analyzer in &available {
                match analyzer.check_cell(cell, &ctx).await {
                    Ok(found) => cell_issues.extend(found),
                    Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                    Err(e) => warn!(
                        cell = cell.index,
                        analyzer = analyzer.name(),
                        "Analyzer failed, continuing: {}",
                        e
                    ),
                }
            }
            debug!(cell = cell.index, issues = cell_issues.len(), "Cell analyzed");
            issues.extend(cell_issues);
        }

        info!(cells = cells.len(), issues = issues.len(), "Notebook analysis complete");
        Ok(())
    }
}

impl Default for A11yEngine {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
