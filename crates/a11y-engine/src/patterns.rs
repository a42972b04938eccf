//! Regex patterns and extraction helpers for markdown and inline HTML
//!
//! Every extractor reports the byte range of the construct it matched so
//! analyzers can anchor issues to the exact source text.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `![alt](url "title")`
    static ref MD_IMAGE: Regex = Regex::new(
        r#"!\[(?P<alt>[^\]]*)\]\(\s*(?P<url><[^>]*>|[^)\s]*)(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#
    )
    .unwrap();

    /// `<img ...>`
    static ref HTML_IMG: Regex = Regex::new(r"(?is)<img\b[^>]*>").unwrap();

    /// `[text](url "title")`, text may not contain brackets
    static ref MD_LINK: Regex = Regex::new(
        r#"\[(?P<text>[^\[\]]*)\]\(\s*(?P<url><[^>]*>|[^)\s]*)(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#
    )
    .unwrap();

    /// `<a ...>inner</a>`
    static ref HTML_ANCHOR: Regex =
        Regex::new(r"(?is)<a\b(?P<attrs>[^>]*)>(?P<inner>.*?)</a\s*>").unwrap();

    /// `<table ...>` or `</table>`
    static ref TABLE_TAG: Regex = Regex::new(r"(?i)<table\b[^>]*>|</table\s*>").unwrap();

    static ref ATTRIBUTE: Regex = Regex::new(
        r#"(?s)(?P<name>[^\s"'<>/=]+)(?:\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"'=<>`]+)))?"#
    )
    .unwrap();

    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Markdown,
    Html,
}

/// An image construct found in a cell's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub raw: String,
    pub start: usize,
    pub end: usize,
    /// `None` when an HTML tag has no alt attribute at all
    pub alt: Option<String>,
    pub url: Option<String>,
    pub syntax: Syntax,
}

impl ImageRef {
    pub fn has_alt_text(&self) -> bool {
        self.alt.as_deref().is_some_and(|alt| !alt.trim().is_empty())
    }
}

/// A link construct found in a cell's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub raw: String,
    pub start: usize,
    pub end: usize,
    /// Visible text with markup stripped
    pub text: String,
    pub aria_label: Option<String>,
    pub url: Option<String>,
    pub syntax: Syntax,
}

impl LinkRef {
    /// Text a screen reader would announce: a non-empty aria-label wins
    pub fn accessible_text(&self) -> &str {
        match self.aria_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => self.text.trim(),
        }
    }
}

/// An HTML table block found in a cell's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub raw: String,
    pub start: usize,
    pub end: usize,
}

/// All markdown and HTML images, in source order
pub fn find_images(source: &str) -> Vec<ImageRef> {
    let mut images: Vec<ImageRef> = MD_IMAGE
        .captures_iter(source)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            Some(ImageRef {
                raw: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                alt: caps.name("alt").map(|a| a.as_str().to_string()),
                url: caps.name("url").map(|u| clean_url(u.as_str())),
                syntax: Syntax::Markdown,
            })
        })
        .collect();

    images.extend(HTML_IMG.find_iter(source).map(|m| {
        let attrs = parse_attributes(m.as_str());
        ImageRef {
            raw: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            alt: attrs.get("alt").cloned(),
            url: attrs.get("src").map(|s| s.trim().to_string()),
            syntax: Syntax::Html,
        }
    }));

    images.sort_by_key(|img| img.start);
    images
}

/// All markdown and HTML links, in source order. Image syntax is skipped.
pub fn find_links(source: &str) -> Vec<LinkRef> {
    let bytes = source.as_bytes();
    let mut links: Vec<LinkRef> = MD_LINK
        .captures_iter(source)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            if m.start() > 0 && bytes[m.start() - 1] == b'!' {
                return None;
            }
            Some(LinkRef {
                raw: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                text: visible_text(caps.name("text").map_or("", |t| t.as_str())),
                aria_label: None,
                url: caps.name("url").map(|u| clean_url(u.as_str())),
                syntax: Syntax::Markdown,
            })
        })
        .collect();

    links.extend(HTML_ANCHOR.captures_iter(source).filter_map(|caps| {
        let m = caps.get(0)?;
        let attrs = parse_attribute_list(caps.name("attrs").map_or("", |a| a.as_str()));
        let inner = caps.name("inner").map_or("", |i| i.as_str());
        let mut text = visible_text(inner);
        if text.is_empty() {
            // an image inside the anchor names it through its alt text
            text = find_images(inner)
                .into_iter()
                .filter_map(|img| img.alt)
                .map(|alt| alt.trim().to_string())
                .find(|alt| !alt.is_empty())
                .unwrap_or_default();
        }
        Some(LinkRef {
            raw: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            text,
            aria_label: attrs.get("aria-label").cloned(),
            url: attrs.get("href").cloned(),
            syntax: Syntax::Html,
        })
    }));

    links.sort_by_key(|link| link.start);
    links
}

/// Every balanced `<table>`...`</table>` block, outer tables before the
/// tables nested in them. Unclosed and stray tags are ignored.
pub fn find_tables(source: &str) -> Vec<TableRef> {
    let mut open = Vec::new();
    let mut tables = Vec::new();

    for tag in TABLE_TAG.find_iter(source) {
        if tag.as_str().starts_with("</") {
            if let Some(start) = open.pop() {
                tables.push(TableRef {
                    raw: source[start..tag.end()].to_string(),
                    start,
                    end: tag.end(),
                });
            }
        } else {
            open.push(tag.start());
        }
    }

    tables.sort_by_key(|table| table.start);
    tables
}

/// Attributes of a single start tag such as `<img src="a.png" alt>`.
///
/// Names are lower-cased; valueless attributes map to an empty string.
pub fn parse_attributes(tag: &str) -> BTreeMap<String, String> {
    let inner = tag
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    // drop the tag name
    let attrs = inner
        .find(char::is_whitespace)
        .map_or("", |idx| &inner[idx..]);
    parse_attribute_list(attrs)
}

fn parse_attribute_list(attrs: &str) -> BTreeMap<String, String> {
    ATTRIBUTE
        .captures_iter(attrs)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().to_ascii_lowercase();
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .or_else(|| caps.name("bare"))
                .map_or(String::new(), |v| decode_entities(v.as_str()));
            Some((name, value))
        })
        .collect()
}

/// Strip tags, decode common entities and collapse whitespace
pub fn visible_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn clean_url(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}
