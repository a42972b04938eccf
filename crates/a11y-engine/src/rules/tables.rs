//! HTML table structure checks
//!
//! Works on the cell text alone. Each `<table>` block is parsed on its own so
//! a malformed table cannot affect its neighbours; a nested table is checked
//! as its own block and does not count toward the table around it.

use async_trait::async_trait;
use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use shared_types::{Cell, Issue};

use super::{AnalysisContext, CellAnalyzer};
use crate::error::Result;
use crate::patterns::find_tables;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub header_cells: usize,
    pub captions: usize,
    pub headers_without_scope: usize,
}

/// Count header cells, captions and unscoped headers in one table block,
/// leaving out anything inside a nested table
pub fn inspect_table(html: &str) -> TableStats {
    let document = kuchiki::parse_html().one(html);
    let Some(table) = select_all(&document, "table").into_iter().next() else {
        return TableStats::default();
    };
    let own = |node: &NodeRef| owning_table(node).is_some_and(|owner| owner == table);

    let mut stats = TableStats {
        captions: select_all(&table, "caption").into_iter().filter(|c| own(c)).count(),
        ..TableStats::default()
    };

    for header in select_all(&table, "th").into_iter().filter(|h| own(h)) {
        stats.header_cells += 1;
        let scoped = header
            .as_element()
            .and_then(|el| {
                el.attributes
                    .borrow()
                    .get("scope")
                    .map(|scope| !scope.trim().is_empty())
            })
            .unwrap_or(false);
        if !scoped {
            stats.headers_without_scope += 1;
        }
    }

    stats
}

/// Nearest enclosing `<table>` element
fn owning_table(node: &NodeRef) -> Option<NodeRef> {
    node.ancestors()
        .find(|ancestor| ancestor.as_element().is_some_and(|el| &*el.name.local == "table"))
}

fn select_all(document: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match document.select(selector) {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

/// Missing `<th>`, missing `<caption>`, and `<th>` without `scope`; each
/// reported at most once per table
pub fn check_tables(cell: &Cell) -> Vec<Issue> {
    let mut issues = Vec::new();

    for table in find_tables(&cell.source) {
        let stats = inspect_table(&table.raw);
        let issue = |violation_id: &str| {
            Issue::new(cell, violation_id, table.raw.clone()).at(table.start, table.end)
        };

        if stats.header_cells == 0 {
            issues.push(issue("table-missing-header"));
        }
        if stats.captions == 0 {
            issues.push(issue("table-missing-caption"));
        }
        if stats.headers_without_scope > 0 {
            issues.push(
                issue("table-missing-scope")
                    .with_extra("headersWithoutScope", stats.headers_without_scope.into()),
            );
        }
    }

    issues
}

pub struct TableStructureAnalyzer;

#[async_trait]
impl CellAnalyzer for TableStructureAnalyzer {
    fn name(&self) -> &'static str {
        "table-structure"
    }

    async fn check_cell(&self, cell: &Cell, _ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>> {
        Ok(check_tables(cell))
    }
}
