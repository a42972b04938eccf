pub mod cells;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod imaging;
pub mod markdown;
pub mod patterns;
pub mod report;
pub mod rules;

pub use cells::{
    cells_from_live_editor, cells_from_notebook_json, cells_from_notebook_str, load_notebook_str,
    LiveCell, LiveNotebook,
};
pub use color::calculate_contrast;
pub use config::AnalyzerConfig;
pub use engine::A11yEngine;
pub use error::{EngineError, Result};
pub use imaging::{DefaultImageLoader, ImageLoader, ImageSource, OcrEngine, OcrWorker};
#[cfg(feature = "tesseract")]
pub use imaging::TesseractOcr;
pub use report::NotebookReport;
pub use rules::{AnalyzeOptions, DomContext, HeadlessDomContext};

use shared_types::{Cell, Issue};

/// Full analysis with default heuristics. Collaborators missing from
/// `options` switch off the analyzers that need them, except OCR: with the
/// `tesseract` feature a Tesseract recognizer is used when none is given.
pub async fn analyze(cells: &[Cell], options: AnalyzeOptions<'_>) -> Result<Vec<Issue>> {
    #[cfg(feature = "tesseract")]
    let tesseract = TesseractOcr::default();
    #[cfg(feature = "tesseract")]
    let options = match options.ocr {
        Some(_) => options,
        None => options.with_ocr(&tesseract),
    };
    A11yEngine::default().analyze(cells, options).await
}

/// Headless analysis: headings, images without OCR, tables and links
pub async fn analyze_cli(cells: &[Cell], image_loader: &dyn ImageLoader) -> Result<Vec<Issue>> {
    A11yEngine::headless(AnalyzerConfig::default())
        .analyze(cells, AnalyzeOptions::new().with_image_loader(image_loader))
        .await
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn markdown_cells() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![
                "\\PC*",
                "(#{1,6} [a-z ]{0,12}\n){1,4}",
                "\\[[a-z ]{0,10}\\]\\([a-z:/.]{0,12}\\)",
                "!\\[[a-z]{0,5}\\]\\([a-z.]{0,8}\\)",
                "<(h[1-6]|a|img|table|th|caption)( [a-z]{1,5}=\"[a-z]{0,4}\")?>[a-z]{0,6}(</(h[1-6]|a|table|th|caption)>)?",
            ],
            0..5,
        )
    }

    fn to_cells(sources: &[String]) -> Vec<Cell> {
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| Cell::markdown(i, s.clone()))
            .collect()
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #[test]
        fn offsets_always_address_issue_content(sources in markdown_cells()) {
            let cells = to_cells(&sources);
            let loader = DefaultImageLoader::new();
            let issues = block_on(analyze_cli(&cells, &loader)).unwrap();
            for issue in &issues {
                if issue.text_position().is_some() {
                    let source = &cells[issue.cell_index].source;
                    prop_assert_eq!(
                        issue.anchored_text(source),
                        Some(issue.issue_content_raw.as_str())
                    );
                }
            }
        }

        #[test]
        fn analysis_is_deterministic(sources in markdown_cells()) {
            let cells = to_cells(&sources);
            let dom = HeadlessDomContext::new();
            let options = AnalyzeOptions::new().with_dom(&dom);
            let first = block_on(analyze(&cells, options)).unwrap();
            let second = block_on(analyze(&cells, options)).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn never_panics_on_arbitrary_text(source in "\\PC*") {
            let cells = vec![Cell::markdown(0, source)];
            let loader = DefaultImageLoader::new();
            let _ = block_on(analyze_cli(&cells, &loader));
        }
    }
}
