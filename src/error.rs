//! Error types for pdfblocks.
//!
//! Layout analysis itself never fails: malformed input degrades to warnings
//! and simpler block structure. Errors are reserved for the edges of the
//! crate (configuration, loading fragment dumps, serializing results).

use std::io;
use thiserror::Error;

/// Result type alias for pdfblocks operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur around layout analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fragment or layout JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error while rendering a layout to an output format.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),
}
