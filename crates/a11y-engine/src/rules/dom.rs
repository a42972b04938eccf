//! Generic DOM accessibility rules
//!
//! A `DomContext` renders a cell's markdown to HTML and audits it against a
//! tagged rule set. Rules that overlap the dedicated analyzers are disabled
//! through `AnalyzerConfig::disabled_generic_rules`, and findings are never
//! deduplicated against the other analyzers.

use std::collections::HashSet;

use async_trait::async_trait;
use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use serde::{Deserialize, Serialize};
use shared_types::{Cell, Issue};
use tracing::debug;

use super::{AnalysisContext, CellAnalyzer};
use crate::config::AnalyzerConfig;
use crate::error::{EngineError, Result};
use crate::patterns::visible_text;

/// Which rules an audit should run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomAuditOptions {
    /// Run only rules carrying one of these tags; empty means all
    pub tags: Vec<String>,
    pub disabled_rules: Vec<String>,
}

impl DomAuditOptions {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            tags: config.generic_rule_tags.clone(),
            disabled_rules: config.disabled_generic_rules.clone(),
        }
    }

    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disabled_rules.iter().any(|r| r == rule_id)
    }

    pub fn is_enabled(&self, rule_id: &str, rule_tags: &[&str]) -> bool {
        !self.is_disabled(rule_id)
            && (self.tags.is_empty()
                || rule_tags.iter().any(|tag| self.tags.iter().any(|t| t == tag)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        }
    }
}

/// The `index`-th of `total` elements in a document serializing to the
/// same HTML, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub index: usize,
    pub total: usize,
}

/// One failing node reported by a rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomFinding {
    pub rule_id: String,
    /// Serialized HTML of the offending node
    pub html: String,
    pub impact: Impact,
    pub help: String,
    /// Which of several identical elements failed, when the engine knows
    #[serde(default)]
    pub occurrence: Option<Occurrence>,
}

/// Rendering surface plus rule engine
#[async_trait]
pub trait DomContext: Send + Sync {
    async fn render_markdown(&self, markdown: &str) -> Result<String>;

    async fn audit(&self, html: &str, options: &DomAuditOptions) -> Result<Vec<DomFinding>>;
}

/// Turn rule engine findings into issues on `cell`.
///
/// Offsets are only attached when the offending element can be pinned to one
/// verbatim match in the cell source. Repeated markup needs an `occurrence`
/// whose total agrees with the number of matches; a serializer that
/// normalizes attributes leaves the offsets unset.
pub fn findings_to_issues(cell: &Cell, findings: Vec<DomFinding>) -> Vec<Issue> {
    findings
        .into_iter()
        .map(|finding| {
            let start = locate_finding(&cell.source, &finding);
            let mut issue = Issue::new(cell, finding.rule_id, finding.html.clone())
                .with_custom_description(finding.help)
                .with_extra("impact", finding.impact.as_str().into());
            if let Some(start) = start {
                issue = issue.at(start, start + finding.html.len());
            }
            issue
        })
        .collect()
}

fn locate_finding(source: &str, finding: &DomFinding) -> Option<usize> {
    if finding.html.is_empty() {
        return None;
    }
    let matches: Vec<usize> = source
        .match_indices(finding.html.as_str())
        .map(|(start, _)| start)
        .collect();
    match finding.occurrence {
        Some(occurrence) if occurrence.total == matches.len() => {
            matches.get(occurrence.index).copied()
        }
        Some(_) => None,
        None if matches.len() == 1 => Some(matches[0]),
        None => None,
    }
}

pub struct GenericDomAnalyzer;

#[async_trait]
impl CellAnalyzer for GenericDomAnalyzer {
    fn name(&self) -> &'static str {
        "generic-dom"
    }

    fn is_available(&self, ctx: &AnalysisContext<'_>) -> bool {
        ctx.options.dom.is_some()
    }

    async fn check_cell(&self, cell: &Cell, ctx: &AnalysisContext<'_>) -> Result<Vec<Issue>> {
        let dom = ctx
            .options
            .dom
            .ok_or_else(|| EngineError::Dom("no DOM context configured".to_string()))?;
        let options = DomAuditOptions::from_config(ctx.config);

        let html = dom.render_markdown(&cell.source).await?;
        let findings: Vec<DomFinding> = dom
            .audit(&html, &options)
            .await?
            .into_iter()
            .filter(|f| !options.is_disabled(&f.rule_id))
            .collect();
        debug!(cell = cell.index, findings = findings.len(), "DOM audit complete");

        Ok(findings_to_issues(cell, findings))
    }
}

/// A rule run by `HeadlessDomContext`
pub trait DomRule: Send + Sync {
    fn id(&self) -> &'static str;

    fn tags(&self) -> &'static [&'static str];

    fn impact(&self) -> Impact;

    fn help(&self) -> &'static str;

    /// Nodes of `document` that fail the rule, in document order
    fn failing_nodes(&self, document: &NodeRef) -> Vec<NodeRef>;
}

/// Every element matching `selector` for which `fails` returns true
struct SelectorRule {
    id: &'static str,
    tags: &'static [&'static str],
    impact: Impact,
    help: &'static str,
    selector: &'static str,
    fails: fn(&NodeDataRef<ElementData>) -> bool,
}

impl DomRule for SelectorRule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    fn impact(&self) -> Impact {
        self.impact
    }

    fn help(&self) -> &'static str {
        self.help
    }

    fn failing_nodes(&self, document: &NodeRef) -> Vec<NodeRef> {
        match document.select(self.selector) {
            Ok(matches) => matches
                .filter(|el| (self.fails)(el))
                .map(|el| el.as_node().clone())
                .collect(),
            Err(()) => Vec::new(),
        }
    }
}

/// Second and later elements reusing an `id`
struct DuplicateIdRule;

impl DomRule for DuplicateIdRule {
    fn id(&self) -> &'static str {
        "duplicate-id"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["wcag2a"]
    }

    fn impact(&self) -> Impact {
        Impact::Minor
    }

    fn help(&self) -> &'static str {
        "id attribute values must be unique"
    }

    fn failing_nodes(&self, document: &NodeRef) -> Vec<NodeRef> {
        let mut seen = HashSet::new();
        match document.select("[id]") {
            Ok(matches) => matches
                .filter(|el| {
                    attr(el, "id").is_some_and(|id| !id.is_empty() && !seen.insert(id))
                })
                .map(|el| el.as_node().clone())
                .collect(),
            Err(()) => Vec::new(),
        }
    }
}

fn attr(el: &NodeDataRef<ElementData>, name: &str) -> Option<String> {
    el.attributes
        .borrow()
        .get(name)
        .map(|value| value.trim().to_string())
}

fn has_attr_text(el: &NodeDataRef<ElementData>, name: &str) -> bool {
    attr(el, name).is_some_and(|value| !value.is_empty())
}

fn has_text(el: &NodeDataRef<ElementData>) -> bool {
    !visible_text(&el.as_node().text_contents()).is_empty()
}

/// Accessible name from content, aria-label, title or a nested image's alt
fn has_accessible_name(el: &NodeDataRef<ElementData>) -> bool {
    if has_text(el) || has_attr_text(el, "aria-label") || has_attr_text(el, "title") {
        return true;
    }
    match el.as_node().select("img[alt]") {
        Ok(mut images) => images.any(|img| has_attr_text(&img, "alt")),
        Err(()) => false,
    }
}

/// The rule set of `HeadlessDomContext`
pub fn get_all_dom_rules() -> Vec<Box<dyn DomRule>> {
    vec![
        Box::new(DuplicateIdRule),
        Box::new(SelectorRule {
            id: "button-name",
            tags: &["wcag2a", "wcag412"],
            impact: Impact::Critical,
            help: "Buttons must have discernible text",
            selector: "button",
            fails: |el| !has_accessible_name(el),
        }),
        Box::new(SelectorRule {
            id: "frame-title",
            tags: &["wcag2a", "wcag412"],
            impact: Impact::Serious,
            help: "Frames must have an accessible name",
            selector: "iframe, frame",
            fails: |el| !has_attr_text(el, "title") && !has_attr_text(el, "aria-label"),
        }),
        Box::new(SelectorRule {
            id: "input-image-alt",
            tags: &["wcag2a", "wcag111"],
            impact: Impact::Critical,
            help: "Image buttons must have alternate text",
            selector: "input[type=image]",
            fails: |el| !has_attr_text(el, "alt") && !has_attr_text(el, "aria-label"),
        }),
        Box::new(SelectorRule {
            id: "area-alt",
            tags: &["wcag2a", "wcag111"],
            impact: Impact::Critical,
            help: "Active <area> elements must have alternate text",
            selector: "area[href]",
            fails: |el| !has_attr_text(el, "alt") && !has_attr_text(el, "aria-label"),
        }),
        Box::new(SelectorRule {
            id: "image-alt",
            tags: &["wcag2a", "wcag111"],
            impact: Impact::Critical,
            help: "Images must have alternate text",
            selector: "img",
            // alt="" marks a decorative image here
            fails: |el| attr(el, "alt").is_none() && !has_attr_text(el, "aria-label"),
        }),
        Box::new(SelectorRule {
            id: "link-name",
            tags: &["wcag2a", "wcag244", "wcag412"],
            impact: Impact::Serious,
            help: "Links must have discernible text",
            selector: "a[href]",
            fails: |el| !has_accessible_name(el),
        }),
        Box::new(SelectorRule {
            id: "empty-heading",
            tags: &["best-practice"],
            impact: Impact::Minor,
            help: "Headings should not be empty",
            selector: "h1, h2, h3, h4, h5, h6",
            fails: |el| !has_text(el),
        }),
    ]
}

/// In-process rule engine over the HTML embedded in markdown.
///
/// Markdown is not converted: inline HTML is audited as written and the
/// markdown text around it becomes plain text nodes.
pub struct HeadlessDomContext {
    rules: Vec<Box<dyn DomRule>>,
}

impl HeadlessDomContext {
    pub fn new() -> Self {
        Self {
            rules: get_all_dom_rules(),
        }
    }
}

/// Position of `node` among the elements serializing to `html`
fn occurrence_of(node: &NodeRef, html: &str, elements: &[(NodeRef, String)]) -> Option<Occurrence> {
    let same: Vec<&NodeRef> = elements
        .iter()
        .filter(|(_, serialized)| serialized == html)
        .map(|(element, _)| element)
        .collect();
    let index = same.iter().position(|element| *element == node)?;
    Some(Occurrence {
        index,
        total: same.len(),
    })
}

impl Default for HeadlessDomContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomContext for HeadlessDomContext {
    async fn render_markdown(&self, markdown: &str) -> Result<String> {
        Ok(markdown.to_string())
    }

    async fn audit(&self, html: &str, options: &DomAuditOptions) -> Result<Vec<DomFinding>> {
        let document = kuchiki::parse_html().one(html);
        let elements: Vec<(NodeRef, String)> = document
            .descendants()
            .elements()
            .map(|el| {
                let node = el.as_node().clone();
                let serialized = node.to_string();
                (node, serialized)
            })
            .collect();
        let mut findings = Vec::new();

        for rule in &self.rules {
            if !options.is_enabled(rule.id(), rule.tags()) {
                continue;
            }
            findings.extend(rule.failing_nodes(&document).into_iter().map(|node| {
                let html = node.to_string();
                DomFinding {
                    rule_id: rule.id().to_string(),
                    occurrence: occurrence_of(&node, &html, &elements),
                    html,
                    impact: rule.impact(),
                    help: rule.help().to_string(),
                }
            }));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AnalyzeOptions;
    use pretty_assertions::assert_eq;

    async fn audit_ids(html: &str, options: &DomAuditOptions) -> Vec<String> {
        HeadlessDomContext::new()
            .audit(html, options)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.rule_id)
            .collect()
    }

    fn default_options() -> DomAuditOptions {
        DomAuditOptions::from_config(&AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn test_overlapping_rules_disabled_by_default() {
        let html = r#"<img src="a.png"><a href="/x"></a><h2></h2>"#;
        assert!(audit_ids(html, &default_options()).await.is_empty());

        let everything = DomAuditOptions::default();
        assert_eq!(
            audit_ids(html, &everything).await,
            vec!["image-alt", "link-name", "empty-heading"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_flag_later_occurrences() {
        let html = r#"<div id="a"></div><span id="a"></span><p id="b"></p><em id="a"></em>"#;
        let findings = HeadlessDomContext::new()
            .audit(html, &default_options())
            .await
            .unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].html, r#"<span id="a"></span>"#);
        assert_eq!(findings[1].impact, Impact::Minor);
        assert_eq!(
            findings[0].occurrence,
            Some(Occurrence { index: 0, total: 1 })
        );
    }

    #[tokio::test]
    async fn test_repeated_markup_anchors_each_element() {
        let config = AnalyzerConfig::default();
        let dom = HeadlessDomContext::new();
        let ctx = AnalysisContext::new(&config, AnalyzeOptions::new().with_dom(&dom));

        let cell = Cell::markdown(0, "<p id=\"a\"></p>\n<p id=\"a\"></p>");
        let issues = GenericDomAnalyzer.check_cell(&cell, &ctx).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].violation_id, "duplicate-id");
        assert_eq!(issues[0].metadata.offset_start, Some(15));
        assert_eq!(issues[0].metadata.offset_end, Some(29));

        let cell = Cell::markdown(0, "<button></button> and <button></button>");
        let issues = GenericDomAnalyzer.check_cell(&cell, &ctx).await.unwrap();
        let starts: Vec<_> = issues.iter().map(|i| i.metadata.offset_start).collect();
        assert_eq!(starts, vec![Some(0), Some(22)]);
        for issue in &issues {
            assert_eq!(issue.violation_id, "button-name");
            assert_eq!(issue.anchored_text(&cell.source), Some("<button></button>"));
        }
    }

    #[test]
    fn test_ambiguous_findings_stay_unanchored() {
        let cell = Cell::markdown(0, "<button></button><button></button>");
        let finding = |occurrence| DomFinding {
            rule_id: "button-name".to_string(),
            html: "<button></button>".to_string(),
            impact: Impact::Critical,
            help: "Buttons must have discernible text".to_string(),
            occurrence,
        };
        let issues = findings_to_issues(
            &cell,
            vec![
                finding(None),
                finding(Some(Occurrence { index: 0, total: 3 })),
                finding(Some(Occurrence { index: 1, total: 2 })),
            ],
        );
        assert!(issues[0].text_position().is_none());
        assert!(issues[1].text_position().is_none());
        assert_eq!(issues[2].metadata.offset_start, Some(17));
    }

    #[tokio::test]
    async fn test_named_controls_pass() {
        let html = concat!(
            r#"<button>Save</button><button aria-label="Close"></button>"#,
            r#"<iframe title="Dashboard" src="d.html"></iframe>"#,
            r#"<input type="image" alt="Submit" src="s.png">"#,
            r#"<map><area href="/n" alt="North"></map>"#,
        );
        assert!(audit_ids(html, &default_options()).await.is_empty());
    }

    #[tokio::test]
    async fn test_unnamed_controls_fail() {
        let html = concat!(
            r#"<button><span></span></button>"#,
            r#"<iframe src="d.html"></iframe>"#,
            r#"<input type="image" src="s.png">"#,
            r#"<map><area href="/n"></map>"#,
        );
        assert_eq!(
            audit_ids(html, &default_options()).await,
            vec!["button-name", "frame-title", "input-image-alt", "area-alt"]
        );
    }

    #[tokio::test]
    async fn test_tag_filter() {
        let options = DomAuditOptions {
            tags: vec!["best-practice".to_string()],
            disabled_rules: vec![],
        };
        let html = r#"<button></button><h3> </h3>"#;
        assert_eq!(audit_ids(html, &options).await, vec!["empty-heading"]);
    }

    #[test]
    fn test_findings_anchor_when_verbatim() {
        let cell = Cell::markdown(0, "Intro\n<button></button>\n<BUTTON  ></BUTTON>");
        let findings = vec![
            DomFinding {
                rule_id: "button-name".to_string(),
                html: "<button></button>".to_string(),
                impact: Impact::Critical,
                help: "Buttons must have discernible text".to_string(),
                occurrence: None,
            },
            DomFinding {
                rule_id: "frame-title".to_string(),
                html: "<iframe></iframe>".to_string(),
                impact: Impact::Serious,
                help: "Frames must have an accessible name".to_string(),
                occurrence: None,
            },
        ];
        let issues = findings_to_issues(&cell, findings);
        assert_eq!(issues[0].metadata.offset_start, Some(6));
        assert_eq!(issues[0].anchored_text(&cell.source), Some("<button></button>"));
        assert_eq!(
            issues[0].custom_description.as_deref(),
            Some("Buttons must have discernible text")
        );
        assert!(issues[1].text_position().is_none());
        assert_eq!(issues[1].metadata.extra["impact"], "serious");
    }

    struct NoisyDom;

    #[async_trait]
    impl DomContext for NoisyDom {
        async fn render_markdown(&self, markdown: &str) -> Result<String> {
            Ok(markdown.to_string())
        }

        async fn audit(&self, _html: &str, _options: &DomAuditOptions) -> Result<Vec<DomFinding>> {
            Ok(vec![
                DomFinding {
                    rule_id: "image-alt".to_string(),
                    html: "<img>".to_string(),
                    impact: Impact::Critical,
                    help: "Images must have alternate text".to_string(),
                    occurrence: None,
                },
                DomFinding {
                    rule_id: "duplicate-id".to_string(),
                    html: "<p id=\"x\"></p>".to_string(),
                    impact: Impact::Minor,
                    help: "id attribute values must be unique".to_string(),
                    occurrence: None,
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_analyzer_drops_disabled_findings_from_any_context() {
        let cell = Cell::markdown(1, "<p id=\"x\"></p>");
        let config = AnalyzerConfig::default();
        let dom = NoisyDom;
        let ctx = AnalysisContext::new(&config, AnalyzeOptions::new().with_dom(&dom));

        assert!(GenericDomAnalyzer.is_available(&ctx));
        let issues = GenericDomAnalyzer.check_cell(&cell, &ctx).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].violation_id, "duplicate-id");
        assert_eq!(issues[0].cell_index, 1);
        assert_eq!(issues[0].metadata.offset_start, Some(0));
    }

    #[test]
    fn test_unavailable_without_dom() {
        let config = AnalyzerConfig::default();
        let ctx = AnalysisContext::new(&config, AnalyzeOptions::new());
        assert!(!GenericDomAnalyzer.is_available(&ctx));
    }
}
