//! Classified blocks.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{BBox, Fragment, TableGrid};
use crate::layout::lines::text_lines;

/// Stable identifier of a block within its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed unit of document structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier, unique within the page
    pub id: BlockId,

    /// Block kind with its payload
    pub kind: BlockKind,

    /// Union of the source fragments, clamped to the page
    pub bbox: BBox,

    /// Classification confidence in `[0, 1]`
    pub confidence: f32,

    /// Fragments that make up this block, line by line
    #[serde(default)]
    pub source_fragments: Vec<Fragment>,

    /// Position in the resolved reading order of the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl Block {
    /// Create a block; the bounding box is the union of the fragments.
    pub fn new(id: BlockId, kind: BlockKind, source_fragments: Vec<Fragment>, confidence: f32) -> Self {
        let bbox = BBox::union_all(source_fragments.iter().map(|f| &f.bbox)).unwrap_or_default();
        Self {
            id,
            kind,
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
            source_fragments,
            order: None,
        }
    }

    /// Override the bounding box (used for image blocks, which have no text).
    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = bbox;
        self
    }

    /// Text lines of the block.
    pub fn lines(&self) -> Vec<String> {
        match &self.kind {
            BlockKind::CodeBlock { lines, .. } => lines.clone(),
            BlockKind::Table(grid) => grid.rows.iter().map(|r| r.plain_text()).collect(),
            _ => text_lines(&self.source_fragments),
        }
    }

    /// Plain text of the block.
    pub fn text(&self) -> String {
        match &self.kind {
            BlockKind::CodeBlock { lines, .. } => lines.join("\n"),
            BlockKind::Table(grid) => grid.plain_text(),
            BlockKind::Image { caption, .. } => caption.clone().unwrap_or_default(),
            _ => self.lines().join(" "),
        }
    }

    /// Number of characters across the source fragments.
    pub fn char_count(&self) -> usize {
        self.source_fragments.iter().map(|f| f.char_count()).sum()
    }

    /// Check if this block is a caption or footnote.
    pub fn is_attachment(&self) -> bool {
        self.kind.is_attachment()
    }
}

/// Block kinds and their kind-specific payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// A heading (level 1-6)
    Heading {
        /// Heading level
        level: u8,
    },

    /// A paragraph of running text
    Paragraph,

    /// One item of a list
    ListItem {
        /// The item marker
        marker: ListMarker,
        /// Nesting depth (0-5)
        depth: u8,
    },

    /// Preformatted code
    CodeBlock {
        /// Guessed language
        #[serde(default)]
        language: Option<String>,
        /// Lines with reconstructed indentation
        lines: Vec<String>,
    },

    /// A table
    Table(TableGrid),

    /// An image
    Image {
        /// Resource ID for the image
        #[serde(default)]
        resource_id: Option<String>,
        /// Caption text, when one was linked
        #[serde(default)]
        caption: Option<String>,
    },

    /// An indented quotation
    Blockquote,

    /// A caption attached to an image or table
    Caption {
        /// The captioned block
        target: BlockId,
        /// First line of the caption
        text: String,
    },

    /// A footnote body
    Footnote {
        /// Normalized marker value (e.g., "1", "†")
        ref_id: String,
        /// Body block carrying the matching reference mark
        #[serde(default)]
        referenced_by: Option<BlockId>,
    },
}

impl BlockKind {
    /// Short name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Heading { .. } => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::ListItem { .. } => "list_item",
            BlockKind::CodeBlock { .. } => "code_block",
            BlockKind::Table(_) => "table",
            BlockKind::Image { .. } => "image",
            BlockKind::Blockquote => "blockquote",
            BlockKind::Caption { .. } => "caption",
            BlockKind::Footnote { .. } => "footnote",
        }
    }

    /// Captions and footnotes live outside the main reading sequence.
    pub fn is_attachment(&self) -> bool {
        matches!(self, BlockKind::Caption { .. } | BlockKind::Footnote { .. })
    }

    /// Heading level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockKind::Heading { level } => Some(*level),
            _ => None,
        }
    }
}

/// A list item marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMarker {
    /// Marker style
    pub kind: MarkerKind,
    /// Marker text as it appears on the page (e.g., "•", "3.", "iv)")
    pub text: String,
    /// Ordinal value for numbered markers
    #[serde(default)]
    pub number: Option<u32>,
}

impl ListMarker {
    /// Create a marker, deriving the ordinal from its text.
    pub fn new(kind: MarkerKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let number = kind.ordinal(text.trim_end_matches(['.', ')']));
        Self { kind, text, number }
    }

    /// Check if this is an ordered marker.
    pub fn is_ordered(&self) -> bool {
        self.kind != MarkerKind::Bullet
    }
}

/// List marker styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Bullet glyph (•, -, *, ...)
    Bullet,
    /// Arabic numerals (1, 2, 3)
    Arabic,
    /// Lowercase letters (a, b, c)
    LowerAlpha,
    /// Uppercase letters (A, B, C)
    UpperAlpha,
    /// Lowercase Roman numerals (i, ii, iii)
    LowerRoman,
    /// Uppercase Roman numerals (I, II, III)
    UpperRoman,
}

impl MarkerKind {
    /// Ordinal value of a marker label without its punctuation.
    pub fn ordinal(&self, label: &str) -> Option<u32> {
        match self {
            MarkerKind::Bullet => None,
            MarkerKind::Arabic => label.parse().ok(),
            MarkerKind::LowerAlpha | MarkerKind::UpperAlpha => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => {
                        Some(u32::from(c.to_ascii_lowercase()) - u32::from('a') + 1)
                    }
                    _ => None,
                }
            }
            MarkerKind::LowerRoman | MarkerKind::UpperRoman => roman_value(label),
        }
    }
}

fn roman_value(label: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut prev = 0u32;
    for c in label.chars().rev() {
        let v = match c.to_ascii_lowercase() {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if v < prev {
            total = total.checked_sub(v)?;
        } else {
            total += v;
            prev = v;
        }
    }
    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x0: f32, y0: f32) -> Fragment {
        Fragment::new(text, BBox::new(x0, y0, x0 + 6.0 * text.len() as f32, y0 + 12.0), "Times", 12.0)
    }

    #[test]
    fn test_block_bbox_is_union() {
        let block = Block::new(
            BlockId(0),
            BlockKind::Paragraph,
            vec![frag("Hello", 10.0, 100.0), frag("world", 10.0, 114.0)],
            0.9,
        );
        assert_eq!(block.bbox, BBox::new(10.0, 100.0, 40.0, 126.0));
        assert_eq!(block.text(), "Hello world");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let block = Block::new(BlockId(1), BlockKind::Paragraph, vec![frag("x", 0.0, 0.0)], 1.7);
        assert_eq!(block.confidence, 1.0);
    }

    #[test]
    fn test_marker_ordinals() {
        assert_eq!(ListMarker::new(MarkerKind::Arabic, "12.").number, Some(12));
        assert_eq!(ListMarker::new(MarkerKind::LowerAlpha, "c)").number, Some(3));
        assert_eq!(ListMarker::new(MarkerKind::LowerRoman, "iv.").number, Some(4));
        assert_eq!(ListMarker::new(MarkerKind::UpperRoman, "XII)").number, Some(12));
        assert_eq!(ListMarker::new(MarkerKind::Bullet, "•").number, None);
        assert!(!ListMarker::new(MarkerKind::Bullet, "•").is_ordered());
    }

    #[test]
    fn test_kind_serialization_is_tagged() {
        let json = serde_json::to_string(&BlockKind::Heading { level: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"heading","level":2}"#);

        let back: BlockKind = serde_json::from_str(r#"{"type":"paragraph"}"#).unwrap();
        assert_eq!(back, BlockKind::Paragraph);
    }

    #[test]
    fn test_attachment_kinds() {
        let caption = BlockKind::Caption {
            target: BlockId(3),
            text: "Figure 1".to_string(),
        };
        assert!(caption.is_attachment());
        assert!(!BlockKind::Blockquote.is_attachment());
        assert_eq!(caption.name(), "caption");
    }
}
