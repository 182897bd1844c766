//! Page-level input and output types.

use serde::{Deserialize, Serialize};

use super::{BBox, Block, BlockId, BlockKind, Fragment, FragmentDefect, Graphic};

/// A single page as handed over by the extraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    /// Zero-based page index
    pub index: usize,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text fragments, in any order
    #[serde(default)]
    pub fragments: Vec<Fragment>,

    /// Images, lines and rectangles
    #[serde(default)]
    pub graphics: Vec<Graphic>,
}

impl PageInput {
    /// Create a new empty page with the given dimensions.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            fragments: Vec::new(),
            graphics: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(index: usize) -> Self {
        Self::new(index, 612.0, 792.0)
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(index: usize) -> Self {
        Self::new(index, 595.0, 842.0)
    }

    /// Add fragments and return self.
    pub fn with_fragments(mut self, fragments: impl IntoIterator<Item = Fragment>) -> Self {
        self.fragments.extend(fragments);
        self
    }

    /// Add graphics and return self.
    pub fn with_graphics(mut self, graphics: impl IntoIterator<Item = Graphic>) -> Self {
        self.graphics.extend(graphics);
        self
    }

    /// Add a fragment to the page.
    pub fn add_fragment(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Add a graphic to the page.
    pub fn add_graphic(&mut self, graphic: Graphic) {
        self.graphics.push(graphic);
    }

    /// Check whether the declared dimensions are usable.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Page bounds; falls back to the extent of the valid fragments when the
    /// declared dimensions are unusable.
    pub fn bounds(&self) -> BBox {
        if self.has_valid_dimensions() {
            return BBox::new(0.0, 0.0, self.width, self.height);
        }
        let extent = BBox::union_all(
            self.fragments
                .iter()
                .filter(|f| f.bbox.is_valid())
                .map(|f| &f.bbox),
        );
        match extent {
            Some(b) => BBox::new(b.x0.min(0.0), b.y0.min(0.0), b.x1, b.y1),
            None => BBox::default(),
        }
    }

    /// Check if the page has neither text nor graphics.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.graphics.is_empty()
    }
}

/// A vertical column of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Left boundary (x coordinate)
    pub left: f32,
    /// Right boundary (x coordinate)
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an x coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// Column width.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

/// A non-fatal problem found while analyzing a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutWarning {
    /// Index of the offending fragment in the page input, if any
    #[serde(default)]
    pub fragment_index: Option<usize>,
    /// Why the fragment was dropped, if it was
    #[serde(default)]
    pub defect: Option<FragmentDefect>,
    /// Human-readable description
    pub message: String,
}

impl LayoutWarning {
    /// A warning about a dropped fragment.
    pub fn dropped_fragment(index: usize, defect: FragmentDefect, text: &str) -> Self {
        let preview: String = text.chars().take(24).collect();
        Self {
            fragment_index: Some(index),
            defect: Some(defect),
            message: format!("dropped fragment {index} ({defect}): {preview:?}"),
        }
    }

    /// A free-form warning.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            fragment_index: None,
            defect: None,
            message: message.into(),
        }
    }
}

/// The analyzed layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Zero-based page index
    pub page_index: usize,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Detected text columns, left to right
    pub columns: Vec<Column>,

    /// Main blocks in reading order
    pub blocks: Vec<Block>,

    /// Captions and footnotes in reading order
    pub attachments: Vec<Block>,

    /// Non-fatal problems found on the page
    #[serde(default)]
    pub warnings: Vec<LayoutWarning>,
}

impl PageLayout {
    /// Create an empty layout for a page.
    pub fn empty(page_index: usize, width: f32, height: f32) -> Self {
        Self {
            page_index,
            width,
            height,
            columns: Vec::new(),
            blocks: Vec::new(),
            attachments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if the page produced no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.attachments.is_empty()
    }

    /// Get the number of blocks, attachments included.
    pub fn block_count(&self) -> usize {
        self.blocks.len() + self.attachments.len()
    }

    /// Iterate over every block, main sequence first.
    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().chain(self.attachments.iter())
    }

    /// Find a block by ID.
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.all_blocks().find(|b| b.id == id)
    }

    /// Caption blocks.
    pub fn captions(&self) -> impl Iterator<Item = &Block> {
        self.attachments
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Caption { .. }))
    }

    /// Footnote blocks.
    pub fn footnotes(&self) -> impl Iterator<Item = &Block> {
        self.attachments
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Footnote { .. }))
    }

    /// Get plain text content of the main sequence.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sizes() {
        let page = PageInput::letter(0);
        assert_eq!(page.bounds(), BBox::new(0.0, 0.0, 612.0, 792.0));
        assert!(page.is_empty());

        let a4 = PageInput::a4(1);
        assert_eq!((a4.width, a4.height), (595.0, 842.0));
    }

    #[test]
    fn test_bounds_fall_back_to_fragment_extent() {
        let page = PageInput::new(0, 0.0, -1.0).with_fragments(vec![
            Fragment::new("a", BBox::new(50.0, 60.0, 80.0, 72.0), "Times", 12.0),
            Fragment::new("b", BBox::new(100.0, 300.0, 140.0, 312.0), "Times", 12.0),
        ]);
        assert!(!page.has_valid_dimensions());
        assert_eq!(page.bounds(), BBox::new(0.0, 0.0, 140.0, 312.0));
    }

    #[test]
    fn test_column_contains() {
        let col = Column {
            left: 50.0,
            right: 290.0,
            index: 0,
        };
        assert!(col.contains(50.0));
        assert!(col.contains(200.0));
        assert!(!col.contains(300.0));
        assert_eq!(col.width(), 240.0);
    }

    #[test]
    fn test_dropped_fragment_warning() {
        let w = LayoutWarning::dropped_fragment(3, FragmentDefect::DegenerateBox, "abc");
        assert_eq!(w.fragment_index, Some(3));
        assert!(w.message.contains("degenerate bounding box"));
    }

    #[test]
    fn test_empty_layout() {
        let layout = PageLayout::empty(2, 612.0, 792.0);
        assert!(layout.is_empty());
        assert_eq!(layout.block_count(), 0);
        assert_eq!(layout.plain_text(), "");
        assert!(layout.find(BlockId(0)).is_none());
    }
}
