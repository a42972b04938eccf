//! Human-readable and JSON reports over a list of issues

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{violation_category, violation_info, Issue, ViolationCategory};

/// Display order of categories in text reports
const CATEGORY_ORDER: [ViolationCategory; 6] = [
    ViolationCategory::Headings,
    ViolationCategory::Images,
    ViolationCategory::Tables,
    ViolationCategory::Color,
    ViolationCategory::Links,
    ViolationCategory::Other,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_violation: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookReport {
    pub notebook: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub summary: ReportSummary,
    pub issues: Vec<Issue>,
}

impl NotebookReport {
    pub fn from_issues(notebook: impl Into<String>, issues: Vec<Issue>) -> Self {
        let mut summary = ReportSummary {
            total: issues.len(),
            ..ReportSummary::default()
        };
        for issue in &issues {
            *summary
                .by_category
                .entry(violation_category(&issue.violation_id).to_string())
                .or_insert(0) += 1;
            *summary
                .by_violation
                .entry(issue.violation_id.clone())
                .or_insert(0) += 1;
        }

        Self {
            notebook: notebook.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary,
            issues,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Generate a text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Accessibility Report: {}\n", self.notebook));
        output.push_str(&"=".repeat(60));
        output.push_str("\n\n");

        if self.is_clean() {
            output.push_str("No accessibility issues found.\n");
            return output;
        }

        output.push_str(&format!("Issues: {}\n", self.summary.total));
        for category in CATEGORY_ORDER {
            if let Some(count) = self.summary.by_category.get(category.as_str()) {
                output.push_str(&format!("  {}: {}\n", category, count));
            }
        }

        for category in CATEGORY_ORDER {
            let issues: Vec<&Issue> = self
                .issues
                .iter()
                .filter(|i| violation_category(&i.violation_id) == category)
                .collect();
            if issues.is_empty() {
                continue;
            }

            output.push('\n');
            output.push_str(&format!("{}:\n", category));
            output.push_str(&"-".repeat(40));
            output.push('\n');
            if category == ViolationCategory::Color {
                output.push_str("(approximate: measured from OCR and sampled pixels)\n");
            }

            for issue in issues {
                let title = violation_info(&issue.violation_id)
                    .map_or(issue.violation_id.as_str(), |info| info.title);
                output.push_str(&format!(
                    "[cell {}] {} ({})\n",
                    issue.cell_index, title, issue.violation_id
                ));
                if let Some(description) = &issue.custom_description {
                    output.push_str(&format!("    {}\n", description));
                }
                if !issue.issue_content_raw.is_empty() {
                    output.push_str(&format!("    Source: {}\n", snippet(&issue.issue_content_raw)));
                }
                if let Some(fix) = &issue.suggested_fix {
                    output.push_str(&format!("    Suggested: {}\n", fix));
                }
            }
        }

        output
    }
}

/// First line of `raw`, cut at 80 characters
fn snippet(raw: &str) -> String {
    let line = raw.lines().next().unwrap_or("").trim();
    let cut: String = line.chars().take(80).collect();
    if cut.len() < line.len() || raw.trim().lines().count() > 1 {
        format!("{}...", cut)
    } else {
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::Cell;

    fn sample() -> NotebookReport {
        let cell = Cell::markdown(2, "x");
        NotebookReport::from_issues(
            "analysis.ipynb",
            vec![
                Issue::new(&cell, "heading-missing-h1", ""),
                Issue::new(&cell, "link-discernible-text", "[here](a.html)"),
                Issue::new(&cell, "link-discernible-text", "[more](b.html)"),
                Issue::new(&cell, "color-insufficient-cc-normal", "![plot](p.png)")
                    .with_custom_description("Contrast 1.82:1"),
            ],
        )
    }

    #[test]
    fn test_summary_counts() {
        let report = sample();
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.by_category["Links"], 2);
        assert_eq!(report.summary.by_category["Headings"], 1);
        assert_eq!(report.summary.by_violation["link-discernible-text"], 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
    }

    #[test]
    fn test_text_report_groups_by_category() {
        let text = sample().to_text();
        assert!(text.starts_with("Accessibility Report: analysis.ipynb\n"));
        let headings = text.find("Headings:\n").unwrap();
        let color = text.find("Color:\n").unwrap();
        let links = text.find("Links:\n").unwrap();
        assert!(headings < color && color < links);
        assert!(text.contains("(approximate"));
        assert!(text.contains("    Contrast 1.82:1\n"));
        assert!(text.contains("Source: [here](a.html)"));
    }

    #[test]
    fn test_clean_report() {
        let report = NotebookReport::from_issues("empty.ipynb", vec![]);
        assert!(report.is_clean());
        assert!(report.to_text().contains("No accessibility issues found."));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["summary"]["total"], 4);
        assert_eq!(json["issues"][1]["violationId"], "link-discernible-text");
        assert!(json.get("generatedAt").is_some());
    }

    #[test]
    fn test_snippet_truncates() {
        assert_eq!(snippet("<table>\n<tr></tr>\n</table>"), "<table>...");
        assert_eq!(snippet(&"a".repeat(100)).len(), 83);
        assert_eq!(snippet("short"), "short");
    }
}
