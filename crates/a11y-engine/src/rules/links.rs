//! Non-descriptive link text

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{Cell, Issue};

use super::{AnalysisContext, CellAnalyzer};
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::patterns::find_links;

lazy_static! {
    static ref BARE_URL: Regex = Regex::new(r"(?i)^(?:https?://|ftp://|www\.)\S+$").unwrap();
}

/// True when `text` would not tell a screen reader user where the link goes:
/// empty, a bare URL, or a short string containing a vague phrase
pub fn is_non_descriptive(text: &str, config: &AnalyzerConfig) -> bool {
    let text = text.trim();
    if text.is_empty() || BARE_URL.is_match(text) {
        return true;
    }
    let lowered = text.to_lowercase();
    text.chars().count() < config.vague_link_max_len
        && config
            .vague_link_phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}

pub fn check_links(cell: &Cell, config: &AnalyzerConfig) -> Vec<Issue> {
    find_links(&cell.source)
        .into_iter()
        .filter(|link| is_non_descriptive(link.accessible_text(), config))
        .map(|link| {
            let text = link.accessible_text().to_string();
            Issue::new(cell, "link-discernible-text", link.raw.clone())
                .at(link.start, link.end)
                .with_extra("linkText", text.into())
        })
        .collect()
}

pub struct LinkTextAnalyzer;

#[async_trait]
impl CellAnalyzer for LinkTextAnalyzer {
    fn name(&self) -> &'static str {
        "link-text"
    }

    async fn check_cell(&self, cell: &Cell, ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>> {
        Ok(check_links(cell, ctx.config))
    }
}
