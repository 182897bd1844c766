//! JSON rendering for layouts.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{DocumentLayout, PageLayout};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document layout to JSON.
pub fn to_json(layout: &DocumentLayout, format: JsonFormat) -> Result<String> {
    serialize(layout, format)
}

/// Convert a single page layout to JSON.
pub fn page_to_json(page: &PageLayout, format: JsonFormat) -> Result<String> {
    serialize(page, format)
}

/// Write a document layout as JSON to a writer.
pub fn write_json<W: Write>(layout: &DocumentLayout, format: JsonFormat, writer: W) -> Result<()> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_writer_pretty(writer, layout),
        JsonFormat::Compact => serde_json::to_writer(writer, layout),
    };
    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

fn serialize<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
