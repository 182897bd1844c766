//! Positioned text fragments and graphic primitives.
//!
//! Fragments are produced once per page by the extraction layer and are
//! read-only for the rest of the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::BBox;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a new color.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An atomic positioned piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// The text content
    pub text: String,
    /// Bounding box on the page
    pub bbox: BBox,
    /// Font family (e.g., "Helvetica-Bold")
    #[serde(default)]
    pub font_family: String,
    /// Font size in points
    pub font_size: f32,
    /// Whether the font is bold
    #[serde(default)]
    pub is_bold: bool,
    /// Whether the font is italic
    #[serde(default)]
    pub is_italic: bool,
    /// Whether the font descriptor flags the font as fixed-pitch
    #[serde(default)]
    pub is_monospace: bool,
    /// Fill color
    #[serde(default)]
    pub color: Rgb,
    /// Zero-based page index
    #[serde(default)]
    pub page_index: usize,
}

impl Fragment {
    /// Create a new fragment.
    ///
    /// Bold and italic are inferred from the family name; use the `with_*`
    /// builders when the extraction layer knows better.
    pub fn new(
        text: impl Into<String>,
        bbox: BBox,
        font_family: impl Into<String>,
        font_size: f32,
    ) -> Self {
        let font_family = font_family.into();
        let lower = font_family.to_lowercase();
        let is_bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let is_italic = lower.contains("italic") || lower.contains("oblique");

        Self {
            text: text.into(),
            bbox,
            font_family,
            font_size,
            is_bold,
            is_italic,
            is_monospace: false,
            color: Rgb::default(),
            page_index: 0,
        }
    }

    /// Set the bold flag.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.is_bold = bold;
        self
    }

    /// Set the italic flag.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.is_italic = italic;
        self
    }

    /// Set the fixed-pitch flag.
    pub fn with_monospace(mut self, monospace: bool) -> Self {
        self.is_monospace = monospace;
        self
    }

    /// Set the fill color.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Set the page index.
    pub fn on_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    /// Number of characters in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Average glyph advance, falling back to half the font size.
    pub fn char_width(&self) -> f32 {
        let count = self.text.trim().chars().count();
        if count > 0 && self.bbox.width() > 0.0 {
            self.bbox.width() / count as f32
        } else {
            self.font_size * 0.5
        }
    }

    /// Check the structural invariants of the fragment.
    pub fn check(&self) -> Result<(), FragmentDefect> {
        if !self.bbox.is_finite() {
            return Err(FragmentDefect::NonFiniteBox);
        }
        if self.bbox.x0 >= self.bbox.x1 || self.bbox.y0 >= self.bbox.y1 {
            return Err(FragmentDefect::DegenerateBox);
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(FragmentDefect::InvalidFontSize);
        }
        if self.text.trim().is_empty() {
            return Err(FragmentDefect::EmptyText);
        }
        Ok(())
    }
}

/// Reason a fragment was rejected during sanitizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentDefect {
    /// `x0 >= x1` or `y0 >= y1`
    DegenerateBox,
    /// NaN or infinite coordinates
    NonFiniteBox,
    /// Zero, negative or non-finite font size
    InvalidFontSize,
    /// Only whitespace
    EmptyText,
    /// Entirely outside the page bounds
    OutsidePage,
    /// `page_index` does not match the page being analyzed
    WrongPage,
}

impl fmt::Display for FragmentDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FragmentDefect::DegenerateBox => "degenerate bounding box",
            FragmentDefect::NonFiniteBox => "non-finite coordinates",
            FragmentDefect::InvalidFontSize => "invalid font size",
            FragmentDefect::EmptyText => "empty text",
            FragmentDefect::OutsidePage => "outside page bounds",
            FragmentDefect::WrongPage => "belongs to another page",
        };
        f.write_str(msg)
    }
}

/// A non-text primitive on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphic {
    /// What kind of primitive this is
    pub kind: GraphicKind,
    /// Bounding box; lines may have zero thickness
    pub bbox: BBox,
    /// Zero-based page index
    #[serde(default)]
    pub page_index: usize,
}

/// Graphic primitive kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphicKind {
    /// A raster image
    Image {
        /// Resource ID of the image, if known
        #[serde(default)]
        resource_id: Option<String>,
    },
    /// A stroked line segment
    Line,
    /// A rectangle (stroked or filled)
    Rect,
}

impl Graphic {
    /// Create an image primitive.
    pub fn image(bbox: BBox) -> Self {
        Self {
            kind: GraphicKind::Image { resource_id: None },
            bbox,
            page_index: 0,
        }
    }

    /// Create an image primitive with a resource ID.
    pub fn image_with_id(bbox: BBox, resource_id: impl Into<String>) -> Self {
        Self {
            kind: GraphicKind::Image {
                resource_id: Some(resource_id.into()),
            },
            bbox,
            page_index: 0,
        }
    }

    /// Create a line segment from its end points.
    pub fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            kind: GraphicKind::Line,
            bbox: BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
            page_index: 0,
        }
    }

    /// Create a rectangle.
    pub fn rect(bbox: BBox) -> Self {
        Self {
            kind: GraphicKind::Rect,
            bbox,
            page_index: 0,
        }
    }

    /// Set the page index.
    pub fn on_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    /// Check if this is an image.
    pub fn is_image(&self) -> bool {
        matches!(self.kind, GraphicKind::Image { .. })
    }
}
