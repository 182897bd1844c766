//! Rendering of layouts to output formats.

mod json;

pub use json::{page_to_json, to_json, write_json, JsonFormat};
