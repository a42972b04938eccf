//! Cell model adapter
//!
//! Normalizes notebook JSON documents and live editor panels into an ordered
//! `Vec<Cell>`. Malformed input never fails; it yields fewer (or no) cells.

use std::collections::BTreeMap;

use serde_json::Value;
use shared_types::{Attachments, Cell, CellType};
use tracing::warn;

use crate::error::{EngineError, Result};

/// Build cells from a parsed `.ipynb` document
pub fn cells_from_notebook_json(doc: &Value) -> Vec<Cell> {
    let Some(raw_cells) = doc.get("cells").and_then(Value::as_array) else {
        warn!("Notebook has no cells array; nothing to analyze");
        return Vec::new();
    };

    raw_cells
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let cell_type = raw
                .get("cell_type")
                .and_then(Value::as_str)
                .map(CellType::from_notebook)
                .unwrap_or(CellType::Raw);
            let source = raw.get("source").map(join_source).unwrap_or_default();
            let mut cell = Cell::new(index, cell_type, source);
            cell.attachments = raw.get("attachments").and_then(parse_attachments);
            cell
        })
        .collect()
}

/// Build cells from raw notebook text
pub fn cells_from_notebook_str(raw: &str) -> Vec<Cell> {
    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => cells_from_notebook_json(&doc),
        Err(e) => {
            warn!("Failed to parse notebook JSON: {}", e);
            Vec::new()
        }
    }
}

/// Like `cells_from_notebook_str`, but input with no notebook structure at
/// all is an error instead of an empty list
pub fn load_notebook_str(raw: &str) -> Result<Vec<Cell>> {
    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| EngineError::InvalidNotebook(format!("not valid JSON: {}", e)))?;
    if !doc.get("cells").is_some_and(Value::is_array) {
        return Err(EngineError::InvalidNotebook(
            "document has no cells array".to_string(),
        ));
    }
    Ok(cells_from_notebook_json(&doc))
}

/// A cell as exposed by a live editor
pub trait LiveCell {
    /// Notebook `cell_type` string
    fn cell_type(&self) -> &str;

    /// Current buffer contents, including unsaved edits
    fn live_source(&self) -> String;

    /// The cell's serialized nbformat JSON
    fn serialized(&self) -> Value;
}

/// A live editor panel holding an ordered set of cells
pub trait LiveNotebook {
    fn live_cells(&self) -> Vec<&dyn LiveCell>;
}

/// Build cells from a live editor; source comes from the buffer, attachments
/// from the serialized form
pub fn cells_from_live_editor(panel: &dyn LiveNotebook) -> Vec<Cell> {
    panel
        .live_cells()
        .into_iter()
        .enumerate()
        .map(|(index, live)| {
            let mut cell = Cell::new(
                index,
                CellType::from_notebook(live.cell_type()),
                live.live_source(),
            );
            cell.attachments = live
                .serialized()
                .get("attachments")
                .and_then(parse_attachments);
            cell
        })
        .collect()
}

/// nbformat stores source either as one string or as a list of lines that
/// already carry their own newlines
fn join_source(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(lines) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn parse_attachments(value: &Value) -> Option<Attachments> {
    let entries = value.as_object()?;
    let mut attachments = Attachments::new();

    for (id, bundle) in entries {
        let Some(bundle) = bundle.as_object() else {
            continue;
        };
        let payloads: BTreeMap<String, String> = bundle
            .iter()
            .filter_map(|(mime, data)| match data {
                Value::String(s) => Some((mime.clone(), s.clone())),
                // Some writers split long payloads into line arrays
                Value::Array(_) => Some((mime.clone(), join_source(data))),
                _ => None,
            })
            .collect();
        if !payloads.is_empty() {
            attachments.insert(id.clone(), payloads);
        }
    }

    if attachments.is_empty() {
        None
    } else {
        Some(attachments)
    }
}
