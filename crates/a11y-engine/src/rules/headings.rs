//! Heading structure checks
//!
//! Headings from every markdown cell are flattened into one document-order
//! sequence. The structure pass looks at H1/H2 usage and empty headings;
//! the order pass walks consecutive pairs looking for skipped levels.

use std::collections::HashSet;

use shared_types::{Cell, Issue};

use super::{AnalysisContext, NotebookAnalyzer};
use crate::markdown::{extract_headings, leading_heading, HeadingToken};

/// A heading together with the cell it was found in
#[derive(Debug, Clone)]
pub struct NotebookHeading<'a> {
    pub cell: &'a Cell,
    pub token: HeadingToken,
}

impl NotebookHeading<'_> {
    fn issue(&self, violation_id: &str) -> Issue {
        Issue::new(self.cell, violation_id, self.token.raw.clone())
            .at(self.token.start, self.token.end)
    }
}

/// All headings of all markdown cells in reading order, without LaTeX
/// artifact H1s
pub fn collect_headings(cells: &[Cell]) -> Vec<NotebookHeading<'_>> {
    cells
        .iter()
        .filter(|cell| cell.is_markdown())
        .flat_map(|cell| {
            extract_headings(&cell.source)
                .into_iter()
                .filter(|token| !token.is_latex_artifact())
                .map(move |token| NotebookHeading { cell, token })
        })
        .collect()
}

/// Missing/multiple H1, duplicate H2, H1 text reused by an H2, empty headings
pub fn check_heading_structure(cells: &[Cell]) -> Vec<Issue> {
    let mut issues = Vec::new();
    let headings = collect_headings(cells);

    if let Some(issue) = check_missing_h1(cells) {
        issues.push(issue);
    }

    // Every H1 after the first
    issues.extend(
        headings
            .iter()
            .filter(|h| h.token.level == 1)
            .skip(1)
            .map(|h| h.issue("heading-multiple-h1")),
    );

    // Repeated H2 text, first occurrence allowed; empty headings group too
    let mut seen_h2 = HashSet::new();
    for heading in headings.iter().filter(|h| h.token.level == 2) {
        if !seen_h2.insert(heading.token.normalized_text()) {
            issues.push(heading.issue("heading-duplicate-h2"));
        }
    }

    // H2 reusing an H1's text
    let h1_texts: HashSet<String> = headings
        .iter()
        .filter(|h| h.token.level == 1)
        .map(|h| h.token.normalized_text())
        .collect();
    issues.extend(
        headings
            .iter()
            .filter(|h| h.token.level == 2 && h1_texts.contains(&h.token.normalized_text()))
            .map(|h| h.issue("heading-duplicate-h1-h2")),
    );

    issues.extend(
        headings
            .iter()
            .filter(|h| h.token.is_empty())
            .map(|h| h.issue("heading-empty")),
    );

    issues
}

/// One notebook-wide issue, anchored at cell 0, unless the first markdown
/// cell opens with an H1
fn check_missing_h1(cells: &[Cell]) -> Option<Issue> {
    let first = cells.first()?;
    let opens_with_h1 = cells
        .iter()
        .find(|cell| cell.is_markdown())
        .and_then(|cell| leading_heading(&cell.source))
        .is_some_and(|heading| heading.level == 1);

    if opens_with_h1 {
        None
    } else {
        Some(Issue::new(first, "heading-missing-h1", ""))
    }
}

/// Headings that go deeper by more than one level than the heading before
/// them. Moving back up is never flagged.
pub fn check_heading_order(cells: &[Cell]) -> Vec<Issue> {
    collect_headings(cells)
        .windows(2)
        .filter_map(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            if current.token.level > previous.token.level + 1 {
                Some(
                    current
                        .issue("heading-wrong-order")
                        .with_previous_heading_level(previous.token.level),
                )
            } else {
                None
            }
        })
        .collect()
}

pub struct HeadingStructureAnalyzer;

impl NotebookAnalyzer for HeadingStructureAnalyzer {
    fn name(&self) -> &'static str {
        "heading-structure"
    }

    fn check_notebook(&self, cells: &[Cell], _ctx: &AnalysisContext<'_>) -> Vec<Issue> {
        check_heading_structure(cells)
    }
}

pub struct HeadingOrderAnalyzer;

impl NotebookAnalyzer for HeadingOrderAnalyzer {
    fn name(&self) -> &'static str {
        "heading-order"
    }

    fn check_notebook(&self, cells: &[Cell], _ctx: &AnalysisContext<'_>) -> Vec<Issue> {
        check_heading_order(cells)
    }
}
