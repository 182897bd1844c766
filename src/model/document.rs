//! Document-level types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Block, Fragment, Graphic, PageInput, PageLayout};
use crate::error::{Error, Result};
use crate::layout::DocumentTypography;

/// All extracted pages of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Pages in the document
    pub pages: Vec<PageInput>,
}

impl DocumentInput {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a flat fragment list, grouping by `page_index`.
    ///
    /// Every page gets the given dimensions; pages without fragments between
    /// the first and last index are kept as empty pages.
    pub fn from_fragments(fragments: impl IntoIterator<Item = Fragment>, width: f32, height: f32) -> Self {
        Self::from_parts(fragments, std::iter::empty(), width, height)
    }

    /// Build a document from flat fragment and graphic lists.
    pub fn from_parts(
        fragments: impl IntoIterator<Item = Fragment>,
        graphics: impl IntoIterator<Item = Graphic>,
        width: f32,
        height: f32,
    ) -> Self {
        let mut pages: BTreeMap<usize, PageInput> = BTreeMap::new();
        for fragment in fragments {
            pages
                .entry(fragment.page_index)
                .or_insert_with_key(|&i| PageInput::new(i, width, height))
                .add_fragment(fragment);
        }
        for graphic in graphics {
            pages
                .entry(graphic.page_index)
                .or_insert_with_key(|&i| PageInput::new(i, width, height))
                .add_graphic(graphic);
        }

        let last = pages.keys().next_back().copied();
        let mut out = Vec::with_capacity(last.map(|l| l + 1).unwrap_or(0));
        if let Some(last) = last {
            for index in 0..=last {
                out.push(
                    pages
                        .remove(&index)
                        .unwrap_or_else(|| PageInput::new(index, width, height)),
                );
            }
        }
        Self { pages: out }
    }

    /// Parse a document from JSON.
    ///
    /// Fragments and graphics nested in a page without an explicit
    /// `page_index` take the index of that page.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: Self = serde_json::from_str(json)?;
        for page in &mut doc.pages {
            let index = page.index;
            for fragment in page.fragments.iter_mut().filter(|f| f.page_index == 0) {
                fragment.page_index = index;
            }
            for graphic in page.graphics.iter_mut().filter(|g| g.page_index == 0) {
                graphic.page_index = index;
            }
        }
        Ok(doc)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: PageInput) {
        self.pages.push(page);
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate over the fragments of every page.
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.pages.iter().flat_map(|p| p.fragments.iter())
    }
}

/// The analyzed layout of a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Document-wide typography profile
    pub typography: DocumentTypography,

    /// Per-page layouts, in page order
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page by index.
    pub fn page(&self, index: usize) -> Result<&PageLayout> {
        self.pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// Iterate over the main blocks of every page, in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// Total number of blocks, attachments included.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.block_count()).sum()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn frag(text: &str, page: usize) -> Fragment {
        Fragment::new(text, BBox::new(10.0, 10.0, 40.0, 22.0), "Times", 12.0).on_page(page)
    }

    #[test]
    fn test_from_fragments_groups_by_page() {
        let doc = DocumentInput::from_fragments(
            vec![frag("c", 2), frag("a", 0), frag("b", 0)],
            612.0,
            792.0,
        );
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.pages[0].fragments.len(), 2);
        assert!(doc.pages[1].fragments.is_empty());
        assert_eq!(doc.pages[2].index, 2);
        assert_eq!(doc.fragments().count(), 3);
    }

    #[test]
    fn test_from_fragments_empty() {
        let doc = DocumentInput::from_fragments(Vec::new(), 612.0, 792.0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"pages":[{"index":0,"width":612,"height":792,
            "fragments":[{"text":"Hi","bbox":{"x0":1,"y0":2,"x1":10,"y1":14},"font_size":12}]}]}"#;
        let doc = DocumentInput::from_json(json).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].fragments[0].text, "Hi");
        assert!(doc.pages[0].graphics.is_empty());
    }

    #[test]
    fn test_from_json_stamps_page_index() {
        let json = r#"{"pages":[{"index":3,"width":612,"height":792,
            "fragments":[{"text":"Hi","bbox":{"x0":1,"y0":2,"x1":10,"y1":14},"font_size":12}],
            "graphics":[{"kind":{"type":"line"},"bbox":{"x0":0,"y0":5,"x1":100,"y1":5}}]}]}"#;
        let doc = DocumentInput::from_json(json).unwrap();
        assert_eq!(doc.pages[0].fragments[0].page_index, 3);
        assert_eq!(doc.pages[0].graphics[0].page_index, 3);
    }

    #[test]
    fn test_page_out_of_range() {
        let layout = DocumentLayout {
            typography: DocumentTypography::default(),
            pages: vec![PageLayout::empty(0, 612.0, 792.0)],
        };
        assert!(layout.page(0).is_ok());
        assert!(matches!(layout.page(4), Err(Error::PageOutOfRange(4, 1))));
    }
}
