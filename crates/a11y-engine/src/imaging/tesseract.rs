//! Tesseract-backed text recognition
//!
//! A Tesseract instance is not `Send`, so each recognition builds its own on
//! the blocking pool and the worker only carries the settings. Word rows of
//! Tesseract's TSV output are grouped into one `TextBlock` per text line.

use std::collections::BTreeMap;
use std::io::Cursor;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tesseract::Tesseract;
use tokio::task;

use super::ocr::{BoundingBox, OcrEngine, OcrOutput, OcrWorker, PageSegMode, TextBlock};
use crate::error::{EngineError, Result};

/// TSV rows at this level describe single words
const TSV_WORD_LEVEL: &str = "5";

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// tessdata directory; `None` uses the library default
    pub datapath: Option<String>,
    pub language: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            datapath: None,
            language: "eng".to_string(),
        }
    }
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    pub fn with_datapath(mut self, datapath: impl Into<String>) -> Self {
        self.datapath = Some(datapath.into());
        self
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>> {
        Ok(Box::new(TesseractWorker {
            settings: self.clone(),
        }))
    }
}

struct TesseractWorker {
    settings: TesseractOcr,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &RgbaImage, mode: PageSegMode) -> Result<OcrOutput> {
        let png = encode_png(image)?;
        let settings = self.settings.clone();
        task::spawn_blocking(move || run_tesseract(&settings, &png, mode))
            .await
            .map_err(|e| EngineError::Ocr(format!("recognition task failed: {}", e)))?
    }

    async fn terminate(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// `tessedit_pageseg_mode` value for `mode`
fn page_seg_mode_value(mode: PageSegMode) -> &'static str {
    match mode {
        PageSegMode::Auto => "3",
        PageSegMode::SparseText => "11",
    }
}

fn ocr_error(err: impl std::fmt::Display) -> EngineError {
    EngineError::Ocr(err.to_string())
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

fn run_tesseract(settings: &TesseractOcr, png: &[u8], mode: PageSegMode) -> Result<OcrOutput> {
    let mut tess = Tesseract::new(settings.datapath.as_deref(), Some(settings.language.as_str()))
        .map_err(ocr_error)?
        .set_variable("tessedit_pageseg_mode", page_seg_mode_value(mode))
        .map_err(ocr_error)?
        .set_image_from_mem(png)
        .map_err(ocr_error)?
        .recognize()
        .map_err(ocr_error)?;

    let text = tess.get_text().map_err(ocr_error)?;
    let tsv = tess.get_tsv_text(0).map_err(ocr_error)?;
    Ok(OcrOutput {
        text,
        confidence: tess.mean_text_conf() as f32,
        blocks: text_lines_from_tsv(&tsv),
    })
}

/// (page, block, paragraph, line)
type LineKey = (u32, u32, u32, u32);

fn parse_word_row(row: &str) -> Option<(LineKey, TextBlock)> {
    let cols: Vec<&str> = row.split('\t').collect();
    if cols.len() < 12 || cols[0] != TSV_WORD_LEVEL {
        return None;
    }
    let num = |i: usize| cols[i].trim().parse::<u32>().ok();
    let confidence: f32 = cols[10].trim().parse().ok()?;
    let text = cols[11..].join("\t").trim().to_string();
    if confidence < 0.0 || text.is_empty() {
        return None;
    }
    let (left, top, width, height) = (num(6)?, num(7)?, num(8)?, num(9)?);
    Some((
        (num(1)?, num(2)?, num(3)?, num(4)?),
        TextBlock {
            text,
            confidence,
            bbox: BoundingBox::new(left, top, left + width, top + height),
        },
    ))
}

fn union(a: BoundingBox, b: BoundingBox) -> BoundingBox {
    BoundingBox::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
}

/// One block per recognized line: words joined by spaces, the mean word
/// confidence and the union of the word boxes
pub fn text_lines_from_tsv(tsv: &str) -> Vec<TextBlock> {
    let mut lines: BTreeMap<LineKey, Vec<TextBlock>> = BTreeMap::new();
    for (key, word) in tsv.lines().filter_map(parse_word_row) {
        lines.entry(key).or_default().push(word);
    }

    lines
        .into_values()
        .filter_map(|words| {
            let bbox = words.iter().map(|w| w.bbox).reduce(union)?;
            let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
            let text = words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Some(TextBlock {
                text,
                confidence,
                bbox,
            })
        })
        .collect()
}
