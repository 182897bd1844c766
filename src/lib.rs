//! # pdfblocks
//!
//! Block classification and reading-order reconstruction for positioned PDF
//! text fragments.
//!
//! The extraction layer hands over text fragments (text, bounding box, font)
//! and graphic primitives per page; this library turns them into typed
//! blocks (headings, paragraphs, list items, code, tables, images,
//! blockquotes, captions, footnotes) in human reading order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfblocks::{analyze, load_document, render};
//!
//! fn main() -> pdfblocks::Result<()> {
//!     let input = load_document("fragments.json")?;
//!     let layout = analyze(&input);
//!
//!     for block in layout.blocks() {
//!         println!("{}: {}", block.kind.name(), block.text());
//!     }
//!     println!("{}", render::to_json(&layout, render::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typography profiling**: char-weighted body size and heading clusters
//! - **Signal classifiers**: headings, lists, code and blockquotes with confidences
//! - **Tables**: ruled (lattice) and whitespace-aligned (stream) detection
//! - **Columns**: gutter detection with full-width separators
//! - **Linking**: captions to figures and tables, footnotes to references
//! - **Parallel processing**: pages analyzed with Rayon

pub mod error;
pub mod layout;
pub mod model;
pub mod render;

// Re-export commonly used types
pub use error::{Error, Result};
pub use layout::{DocumentTypography, LayoutEngine, LayoutOptions, TableDetectorConfig};
pub use model::{
    BBox, Block, BlockId, BlockKind, Column, DocumentInput, DocumentLayout, Fragment, Graphic,
    GraphicKind, LayoutWarning, ListMarker, MarkerKind, PageInput, PageLayout, TableCell,
    TableGrid, TableRow,
};
pub use render::JsonFormat;

use std::path::Path;

/// Analyze a document with default options.
///
/// # Example
///
/// ```
/// use pdfblocks::{analyze, BBox, DocumentInput, Fragment};
///
/// let input = DocumentInput::from_fragments(
///     vec![Fragment::new("Hello", BBox::new(50.0, 50.0, 80.0, 62.0), "Helvetica", 12.0)],
///     612.0,
///     792.0,
/// );
/// let layout = analyze(&input);
/// assert_eq!(layout.block_count(), 1);
/// ```
pub fn analyze(input: &DocumentInput) -> DocumentLayout {
    LayoutEngine::default().analyze_document(input)
}

/// Analyze a document with custom options.
///
/// # Example
///
/// ```
/// use pdfblocks::{analyze_with_options, DocumentInput, LayoutOptions};
///
/// let options = LayoutOptions::new()
///     .with_heading_font_ratio(1.5)
///     .sequential();
/// let layout = analyze_with_options(&DocumentInput::new(), options).unwrap();
/// assert_eq!(layout.page_count(), 0);
/// ```
pub fn analyze_with_options(input: &DocumentInput, options: LayoutOptions) -> Result<DocumentLayout> {
    let engine = LayoutEngine::new(options)?;
    Ok(engine.analyze_document(input))
}

/// Load a fragment dump (a JSON-serialized [`DocumentInput`]) from a file.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<DocumentInput> {
    let json = std::fs::read_to_string(path)?;
    DocumentInput::from_json(&json)
}

/// Load layout options from a JSON file.
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<LayoutOptions> {
    let json = std::fs::read_to_string(path)?;
    LayoutOptions::from_json(&json)
}

/// Analyze a fragment dump file and render the layout as JSON.
///
/// # Example
///
/// ```no_run
/// use pdfblocks::{to_json, JsonFormat};
///
/// let json = to_json("fragments.json", JsonFormat::Pretty).unwrap();
/// std::fs::write("layout.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let input = load_document(path)?;
    render::to_json(&analyze(&input), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_empty_document() {
        let layout = analyze(&DocumentInput::new());
        assert_eq!(layout.page_count(), 0);
        assert_eq!(layout.block_count(), 0);
    }

    #[test]
    fn test_analyze_with_invalid_options() {
        let options = LayoutOptions::new().with_min_confidence(2.0);
        assert!(matches!(
            analyze_with_options(&DocumentInput::new(), options),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_document_missing_file() {
        assert!(matches!(
            load_document("/nonexistent/fragments.json"),
            Err(Error::Io(_))
        ));
    }
}
