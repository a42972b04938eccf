use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attachment id -> (MIME type -> base64 payload)
pub type Attachments = BTreeMap<String, BTreeMap<String, String>>;

/// Kind of notebook cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Markdown,
    Code,
    Raw,
}

impl CellType {
    /// Map a notebook `cell_type` value, falling back to `Raw` for anything unrecognized
    pub fn from_notebook(value: &str) -> Self {
        match value {
            "markdown" => CellType::Markdown,
            "code" => CellType::Code,
            _ => CellType::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Markdown => "markdown",
            CellType::Code => "code",
            CellType::Raw => "raw",
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notebook cell, normalized from whatever representation it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based position in reading order
    pub index: usize,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
}

impl Cell {
    pub fn new(index: usize, cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            index,
            cell_type,
            source: source.into(),
            attachments: None,
        }
    }

    pub fn markdown(index: usize, source: impl Into<String>) -> Self {
        Self::new(index, CellType::Markdown, source)
    }

    pub fn with_attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn is_markdown(&self) -> bool {
        self.cell_type == CellType::Markdown
    }

    /// First `image/*` payload stored under `id`, as `(mime, base64)`
    pub fn attachment_image(&self, id: &str) -> Option<(&str, &str)> {
        self.attachments
            .as_ref()?
            .get(id)?
            .iter()
            .find(|(mime, _)| mime.starts_with("image/"))
            .map(|(mime, data)| (mime.as_str(), data.as_str()))
    }
}

/// Byte range into a cell's source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Open-ended metadata attached to an issue.
///
/// `offset_start`/`offset_end` anchor `issue_content_raw` inside the cell
/// source; `previous_heading_level` is set on heading order issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_heading_level: Option<u8>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IssueMetadata {
    pub fn is_empty(&self) -> bool {
        self.offset_start.is_none()
            && self.offset_end.is_none()
            && self.previous_heading_level.is_none()
            && self.extra.is_empty()
    }
}

/// A single detected accessibility violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub cell_index: usize,
    pub cell_type: CellType,
    pub violation_id: String,
    /// Exact text that triggered the issue
    pub issue_content_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_detailed_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "IssueMetadata::is_empty")]
    pub metadata: IssueMetadata,
}

impl Issue {
    pub fn new(cell: &Cell, violation_id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            cell_index: cell.index,
            cell_type: cell.cell_type,
            violation_id: violation_id.into(),
            issue_content_raw: raw.into(),
            custom_description: None,
            custom_detailed_description: None,
            suggested_fix: None,
            metadata: IssueMetadata::default(),
        }
    }

    /// Anchor the issue at `start..end` of the owning cell's source
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.metadata.offset_start = Some(start);
        self.metadata.offset_end = Some(end);
        self
    }

    pub fn with_custom_description(mut self, description: impl Into<String>) -> Self {
        self.custom_description = Some(description.into());
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_previous_heading_level(mut self, level: u8) -> Self {
        self.metadata.previous_heading_level = Some(level);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    pub fn text_position(&self) -> Option<TextPosition> {
        match (self.metadata.offset_start, self.metadata.offset_end) {
            (Some(start_offset), Some(end_offset)) => Some(TextPosition {
                start_offset,
                end_offset,
            }),
            _ => None,
        }
    }

    /// The slice of `source` addressed by this issue's offsets, if any
    pub fn anchored_text<'a>(&self, source: &'a str) -> Option<&'a str> {
        let pos = self.text_position()?;
        if pos.start_offset >= pos.end_offset {
            return None;
        }
        source.get(pos.start_offset..pos.end_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_type_defaults_to_raw() {
        assert_eq!(CellType::from_notebook("markdown"), CellType::Markdown);
        assert_eq!(CellType::from_notebook("code"), CellType::Code);
        assert_eq!(CellType::from_notebook("heading"), CellType::Raw);
        assert_eq!(CellType::from_notebook(""), CellType::Raw);
    }

    #[test]
    fn test_attachment_image_picks_image_mime() {
        let mut payloads = BTreeMap::new();
        payloads.insert("text/plain".to_string(), "aGVsbG8=".to_string());
        payloads.insert("image/png".to_string(), "iVBORw0=".to_string());
        let mut attachments = Attachments::new();
        attachments.insert("plot.png".to_string(), payloads);

        let cell = Cell::markdown(0, "![plot](attachment:plot.png)").with_attachments(attachments);
        assert_eq!(
            cell.attachment_image("plot.png"),
            Some(("image/png", "iVBORw0="))
        );
        assert_eq!(cell.attachment_image("missing.png"), None);
    }

    #[test]
    fn test_anchored_text_matches_offsets() {
        let cell = Cell::markdown(3, "intro ![](foo.png) outro");
        let issue = Issue::new(&cell, "image-missing-alt", "![](foo.png)").at(6, 18);
        assert_eq!(issue.cell_index, 3);
        assert_eq!(issue.anchored_text(&cell.source), Some("![](foo.png)"));
    }

    #[test]
    fn test_anchored_text_rejects_bad_ranges() {
        let cell = Cell::markdown(0, "short");
        let empty = Issue::new(&cell, "x", "").at(2, 2);
        assert_eq!(empty.anchored_text(&cell.source), None);
        let past_end = Issue::new(&cell, "x", "").at(2, 40);
        assert_eq!(past_end.anchored_text(&cell.source), None);
        let unanchored = Issue::new(&cell, "x", "short");
        assert_eq!(unanchored.anchored_text(&cell.source), None);
    }

    #[test]
    fn test_issue_serializes_camel_case() {
        let cell = Cell::markdown(1, "#### Deep");
        let issue = Issue::new(&cell, "heading-wrong-order", "#### Deep")
            .at(0, 9)
            .with_previous_heading_level(2);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["cellIndex"], 1);
        assert_eq!(json["cellType"], "markdown");
        assert_eq!(json["violationId"], "heading-wrong-order");
        assert_eq!(json["issueContentRaw"], "#### Deep");
        assert_eq!(json["metadata"]["offsetStart"], 0);
        assert_eq!(json["metadata"]["offsetEnd"], 9);
        assert_eq!(json["metadata"]["previousHeadingLevel"], 2);
        assert!(json.get("suggestedFix").is_none());
    }

    #[test]
    fn test_issue_round_trips_extra_metadata() {
        let cell = Cell::markdown(0, "![x](y.png)");
        let issue = Issue::new(&cell, "color-insufficient-cc-normal", "![x](y.png)")
            .with_extra("contrastRatio", serde_json::json!(2.5));
        let json = serde_json::to_string(&issue).unwrap();
        let back: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, issue);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Offsets either address a valid slice or yield nothing
        #[test]
        fn anchored_text_never_panics(
            source in "\\PC*",
            start in 0usize..80,
            end in 0usize..80,
        ) {
            let cell = Cell::markdown(0, source);
            let issue = Issue::new(&cell, "heading-empty", "").at(start, end);
            if let Some(text) = issue.anchored_text(&cell.source) {
                prop_assert!(start < end);
                prop_assert_eq!(text, &cell.source[start..end]);
            }
        }
    }
}
