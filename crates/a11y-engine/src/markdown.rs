//! Heading extraction from markdown cells
//!
//! Recognizes ATX (`## Title`), setext (`Title` over `===`) and inline HTML
//! `<h1>`-`<h6>` headings in source order. Fenced and indented code blocks
//! are skipped.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::patterns::{visible_text, Syntax};

lazy_static! {
    static ref ATX_HEADING: Regex = Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").unwrap();
    static ref ATX_CLOSING: Regex = Regex::new(r"(?:^|[ \t]+)#+$").unwrap();
    static ref SETEXT_UNDERLINE: Regex = Regex::new(r"^ {0,3}(=+|-+)[ \t]*$").unwrap();
    static ref FENCE_OPEN: Regex = Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap();
    static ref BLOCK_START: Regex =
        Regex::new(r"^ {0,3}(?:[-*+][ \t]|\d{1,9}[.)][ \t]|>|<|(?:[-*_][ \t]*){3,}$)").unwrap();
    static ref HTML_HEADING: Regex =
        Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap();
    static ref LATEX_BLOCK: Regex = Regex::new(r"(?s)^\$\$.*\$\$$").unwrap();
}

/// A heading found in a cell's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingToken {
    pub level: u8,
    /// Visible text, markup stripped
    pub text: String,
    pub raw: String,
    pub start: usize,
    pub end: usize,
    pub syntax: Syntax,
}

impl HeadingToken {
    /// Trimmed, lower-cased text used to compare headings
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// An H1 whose whole text is a `$$...$$` block is a math rendering
    /// artifact rather than a section title
    pub fn is_latex_artifact(&self) -> bool {
        self.level == 1 && LATEX_BLOCK.is_match(self.text.trim())
    }
}

struct Paragraph {
    start: usize,
    lines: Vec<String>,
}

/// All headings in `source`, ordered by position
pub fn extract_headings(source: &str) -> Vec<HeadingToken> {
    let mut headings = Vec::new();
    let mut code_ranges: Vec<Range<usize>> = Vec::new();
    let mut fence: Option<(char, usize, usize)> = None;
    let mut paragraph: Option<Paragraph> = None;
    let mut offset = 0;

    for full_line in source.split_inclusive('\n') {
        let line_start = offset;
        offset += full_line.len();
        let line = full_line.trim_end_matches('\n').trim_end_matches('\r');
        let line_end = line_start + line.len();

        if let Some((ch, len, fence_start)) = fence {
            let trimmed = line.trim();
            if trimmed.len() >= len && trimmed.chars().all(|c| c == ch) {
                code_ranges.push(fence_start..line_end);
                fence = None;
            }
            continue;
        }

        if let Some(caps) = FENCE_OPEN.captures(line) {
            let marker = &caps[1];
            let ch = marker.chars().next().unwrap_or('`');
            fence = Some((ch, marker.len(), line_start));
            paragraph = None;
            continue;
        }

        if line.trim().is_empty() {
            paragraph = None;
            continue;
        }

        if paragraph.is_none() && indent_width(line) >= 4 {
            code_ranges.push(line_start..line_end);
            continue;
        }

        if let Some(caps) = ATX_HEADING.captures(line) {
            let inner = caps.get(2).map_or("", |m| m.as_str());
            let inner = ATX_CLOSING.replace(inner, "");
            headings.push(HeadingToken {
                level: caps[1].len() as u8,
                text: visible_text(&inner),
                raw: line.to_string(),
                start: line_start,
                end: line_end,
                syntax: Syntax::Markdown,
            });
            paragraph = None;
            continue;
        }

        if let (Some(para), Some(caps)) = (paragraph.as_ref(), SETEXT_UNDERLINE.captures(line)) {
            let level = if caps[1].starts_with('=') { 1 } else { 2 };
            headings.push(HeadingToken {
                level,
                text: visible_text(&para.lines.join(" ")),
                raw: source[para.start..line_end].to_string(),
                start: para.start,
                end: line_end,
                syntax: Syntax::Markdown,
            });
            paragraph = None;
            continue;
        }

        if BLOCK_START.is_match(line) {
            paragraph = None;
            continue;
        }

        match paragraph.as_mut() {
            Some(para) => para.lines.push(line.trim().to_string()),
            None => {
                paragraph = Some(Paragraph {
                    start: line_start,
                    lines: vec![line.trim().to_string()],
                })
            }
        }
    }

    // an unclosed fence runs to the end of the cell
    if let Some((_, _, fence_start)) = fence {
        code_ranges.push(fence_start..source.len());
    }

    for caps in HTML_HEADING.captures_iter(source) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        let inside_code = code_ranges
            .iter()
            .any(|r| r.start <= m.start() && m.start() < r.end);
        let overlaps = headings
            .iter()
            .any(|h: &HeadingToken| m.start() < h.end && h.start < m.end());
        if inside_code || overlaps {
            continue;
        }
        headings.push(HeadingToken {
            level: caps[1].parse().unwrap_or(1),
            text: visible_text(caps.get(2).map_or("", |t| t.as_str())),
            raw: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            syntax: Syntax::Html,
        });
    }

    headings.sort_by_key(|h| h.start);
    headings
}

/// The heading that opens `source`, when nothing but whitespace (or a LaTeX
/// artifact heading) precedes it
pub fn leading_heading(source: &str) -> Option<HeadingToken> {
    let mut cursor = 0;
    for heading in extract_headings(source) {
        if !source[cursor..heading.start].trim().is_empty() {
            return None;
        }
        if heading.is_latex_artifact() {
            cursor = heading.end;
            continue;
        }
        return Some(heading);
    }
    None
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - (width % 4),
            _ => break,
        }
    }
    width
}
