//! Static violation metadata
//!
//! Two read-only tables keyed by violation id: the display category used to
//! group issues, and the human-readable title/description shown in reports.
//! Both are compiled in and never mutated.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Display grouping for a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationCategory {
    Images,
    Headings,
    Tables,
    Color,
    Links,
    Other,
}

impl ViolationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCategory::Images => "Images",
            ViolationCategory::Headings => "Headings",
            ViolationCategory::Tables => "Tables",
            ViolationCategory::Color => "Color",
            ViolationCategory::Links => "Links",
            ViolationCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly a violation should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Fails a WCAG success criterion
    Violation,
    /// Recommended practice, not a conformance failure
    BestPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

const WCAG_NON_TEXT_CONTENT: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/non-text-content.html";
const WCAG_INFO_AND_RELATIONSHIPS: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/info-and-relationships.html";
const WCAG_HEADINGS_AND_LABELS: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/headings-and-labels.html";
const WCAG_CONTRAST_MINIMUM: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/contrast-minimum.html";
const WCAG_LINK_PURPOSE: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/link-purpose-in-context.html";
const WCAG_NAME_ROLE_VALUE: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/name-role-value.html";
const WCAG_PARSING: &str = "https://www.w3.org/WAI/WCAG21/Understanding/parsing.html";

/// Violation id -> display category. Ids missing here fall into `Other`.
pub const VIOLATION_CATEGORIES: [(&str, ViolationCategory); 23] = [
    ("image-missing-alt", ViolationCategory::Images),
    ("image-alt", ViolationCategory::Images),
    ("input-image-alt", ViolationCategory::Images),
    ("area-alt", ViolationCategory::Images),
    ("heading-missing-h1", ViolationCategory::Headings),
    ("heading-multiple-h1", ViolationCategory::Headings),
    ("heading-duplicate-h2", ViolationCategory::Headings),
    ("heading-duplicate-h1-h2", ViolationCategory::Headings),
    ("heading-empty", ViolationCategory::Headings),
    ("heading-wrong-order", ViolationCategory::Headings),
    ("empty-heading", ViolationCategory::Headings),
    ("heading-order", ViolationCategory::Headings),
    ("page-has-heading-one", ViolationCategory::Headings),
    ("table-missing-header", ViolationCategory::Tables),
    ("table-missing-caption", ViolationCategory::Tables),
    ("table-missing-scope", ViolationCategory::Tables),
    ("td-headers-attr", ViolationCategory::Tables),
    ("th-has-data-cells", ViolationCategory::Tables),
    ("color-insufficient-cc-normal", ViolationCategory::Color),
    ("color-insufficient-cc-large", ViolationCategory::Color),
    ("color-contrast", ViolationCategory::Color),
    ("link-discernible-text", ViolationCategory::Links),
    ("link-name", ViolationCategory::Links),
];

pub const VIOLATION_DETAILS: [ViolationInfo; 21] = [
    ViolationInfo {
        id: "image-missing-alt",
        title: "Missing Alt Text",
        description: "Images must have alternate text that conveys their purpose.",
        detailed_description: Some(
            "Screen reader users rely on alternative text to understand images. Add a concise \
             description in the markdown brackets or the alt attribute; describe charts by the \
             insight they show rather than their appearance.",
        ),
        url: Some(WCAG_NON_TEXT_CONTENT),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "heading-missing-h1",
        title: "Missing H1 Heading",
        description: "The notebook should start with a level-one heading that names it.",
        detailed_description: Some(
            "A single H1 at the top of the first cell gives assistive technology users a title \
             to orient themselves and anchors the rest of the heading outline.",
        ),
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "heading-multiple-h1",
        title: "Multiple H1 Headings",
        description: "Only one H1 heading should be used per notebook.",
        detailed_description: Some(
            "Additional top-level headings flatten the document outline. Demote later H1 \
             headings to H2 or below.",
        ),
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "heading-duplicate-h2",
        title: "Duplicate H2 Headings",
        description: "H2 headings should have unique text so sections can be told apart.",
        detailed_description: None,
        url: Some(WCAG_HEADINGS_AND_LABELS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "heading-duplicate-h1-h2",
        title: "H2 Repeats the H1",
        description: "An H2 heading should not repeat the text of the notebook's H1 heading.",
        detailed_description: None,
        url: Some(WCAG_HEADINGS_AND_LABELS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "heading-empty",
        title: "Empty Heading",
        description: "Headings must contain visible text.",
        detailed_description: Some(
            "Empty headings are announced by screen readers without any content, which is \
             confusing. Add text or remove the heading marker.",
        ),
        url: Some(WCAG_HEADINGS_AND_LABELS),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "heading-wrong-order",
        title: "Skipped Heading Level",
        description: "Heading levels should only increase by one.",
        detailed_description: Some(
            "Jumping from, for example, H2 straight to H4 implies a missing section. Use the \
             next level down from the previous heading.",
        ),
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "table-missing-header",
        title: "Table Missing Headers",
        description: "Data tables must mark their header cells with <th>.",
        detailed_description: None,
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "table-missing-caption",
        title: "Table Missing Caption",
        description: "Tables should have a <caption> describing their contents.",
        detailed_description: None,
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "table-missing-scope",
        title: "Table Headers Missing Scope",
        description: "Header cells should declare scope=\"col\" or scope=\"row\".",
        detailed_description: None,
        url: Some(WCAG_INFO_AND_RELATIONSHIPS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "color-insufficient-cc-normal",
        title: "Insufficient Color Contrast",
        description: "Text in images must have a contrast ratio of at least 4.5:1.",
        detailed_description: Some(
            "Contrast was estimated from the image pixels behind text found by OCR. The \
             measurement is approximate; verify it manually before changing the figure.",
        ),
        url: Some(WCAG_CONTRAST_MINIMUM),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "color-insufficient-cc-large",
        title: "Insufficient Color Contrast (Large Text)",
        description: "Large text in images must have a contrast ratio of at least 3:1.",
        detailed_description: Some(
            "Contrast was estimated from the image pixels behind text found by OCR. The \
             measurement is approximate; verify it manually before changing the figure.",
        ),
        url: Some(WCAG_CONTRAST_MINIMUM),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "link-discernible-text",
        title: "Non-descriptive Link Text",
        description: "Link text should describe where the link goes.",
        detailed_description: Some(
            "Text like \"click here\" or a bare URL gives no context when links are read out of \
             order. Describe the destination, or add an aria-label.",
        ),
        url: Some(WCAG_LINK_PURPOSE),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "image-alt",
        title: "Image Missing Alt Attribute",
        description: "<img> elements must have an alt attribute.",
        detailed_description: None,
        url: Some(WCAG_NON_TEXT_CONTENT),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "input-image-alt",
        title: "Image Button Missing Alt Text",
        description: "<input type=\"image\"> elements must have alternate text.",
        detailed_description: None,
        url: Some(WCAG_NON_TEXT_CONTENT),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "area-alt",
        title: "Image Map Area Missing Alt Text",
        description: "<area> elements of image maps must have alternate text.",
        detailed_description: None,
        url: Some(WCAG_NON_TEXT_CONTENT),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "empty-heading",
        title: "Empty Heading Element",
        description: "Heading elements must contain discernible text.",
        detailed_description: None,
        url: Some(WCAG_HEADINGS_AND_LABELS),
        severity: Some(Severity::BestPractice),
    },
    ViolationInfo {
        id: "link-name",
        title: "Link Without Accessible Name",
        description: "Links must have discernible text.",
        detailed_description: None,
        url: Some(WCAG_LINK_PURPOSE),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "duplicate-id",
        title: "Duplicate id Attribute",
        description: "id attribute values must be unique.",
        detailed_description: None,
        url: Some(WCAG_PARSING),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "button-name",
        title: "Button Without Accessible Name",
        description: "Buttons must have discernible text.",
        detailed_description: None,
        url: Some(WCAG_NAME_ROLE_VALUE),
        severity: Some(Severity::Violation),
    },
    ViolationInfo {
        id: "frame-title",
        title: "Frame Missing Title",
        description: "Frames and iframes must have a title attribute.",
        detailed_description: None,
        url: Some(WCAG_NAME_ROLE_VALUE),
        severity: Some(Severity::Violation),
    },
];

lazy_static! {
    static ref CATEGORY_INDEX: HashMap<&'static str, ViolationCategory> =
        VIOLATION_CATEGORIES.iter().copied().collect();
    static ref DETAIL_INDEX: HashMap<&'static str, &'static ViolationInfo> =
        VIOLATION_DETAILS.iter().map(|info| (info.id, info)).collect();
}

/// Display category for a violation id
pub fn violation_category(id: &str) -> ViolationCategory {
    CATEGORY_INDEX
        .get(id)
        .copied()
        .unwrap_or(ViolationCategory::Other)
}

/// Human-readable metadata for a violation id
pub fn violation_info(id: &str) -> Option<&'static ViolationInfo> {
    DETAIL_INDEX.get(id).copied()
}
