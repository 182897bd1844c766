//! The layout engine: per-page pipeline and document driver.

use std::cmp::Ordering;

use rayon::prelude::*;

use super::aggregate::aggregate_region;
use super::classify::{classify_region, default_classifiers, Classifier, PageContext};
use super::columns::{detect_columns, ColumnLayout};
use super::lines::{group_runs, Run};
use super::linker::{link_captions, link_footnotes};
use super::options::LayoutOptions;
use super::reading_order::resolve;
use super::table_detector::{DetectedTable, TableDetector};
use super::typography::DocumentTypography;
use crate::error::Result;
use crate::model::{
    BBox, Block, BlockId, BlockKind, DocumentInput, DocumentLayout, Fragment, FragmentDefect,
    GraphicKind, LayoutWarning, PageInput, PageLayout,
};

/// Classifies fragments into blocks and orders them.
pub struct LayoutEngine {
    options: LayoutOptions,
    classifiers: Vec<Box<dyn Classifier>>,
}

impl LayoutEngine {
    /// Create an engine, validating the options.
    pub fn new(options: LayoutOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            classifiers: default_classifiers(),
        })
    }

    /// Get the options in use.
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Profile the typography of a whole document.
    pub fn profile(&self, document: &DocumentInput) -> DocumentTypography {
        DocumentTypography::profile(document.fragments())
    }

    /// Analyze every page of a document.
    ///
    /// Typography is profiled once over all pages; pages are then analyzed
    /// independently, in parallel unless disabled in the options.
    pub fn analyze_document(&self, document: &DocumentInput) -> DocumentLayout {
        let typography = self.profile(document);
        log::debug!(
            "analyzing {} pages (body {:.1}pt, parallel={})",
            document.page_count(),
            typography.body_font_size,
            self.options.parallel
        );

        let pages = if self.options.parallel {
            document
                .pages
                .par_iter()
                .map(|page| self.analyze_page(page, &typography))
                .collect()
        } else {
            document
                .pages
                .iter()
                .map(|page| self.analyze_page(page, &typography))
                .collect()
        };

        DocumentLayout { typography, pages }
    }

    /// Analyze a single page against a document profile.
    pub fn analyze_page(&self, page: &PageInput, typography: &DocumentTypography) -> PageLayout {
        let bounds = page.bounds();
        let mut layout = PageLayout::empty(page.index, page.width, page.height);

        let fragments = sanitize(page, &bounds, &mut layout.warnings);

        // Tables claim their fragments first; page gutters keep side-by-side
        // text columns from reading as a stream table
        let (tables, fragments) = if self.options.detect_tables && !fragments.is_empty() {
            let gutters = self.columns_of(&fragments).gutters;
            TableDetector::with_config(self.options.table.clone())
                .with_intersection_tolerance(self.options.table_intersection_tolerance)
                .with_min_confidence(self.options.min_classifier_confidence)
                .with_gutters(gutters)
                .detect(fragments, &page.graphics)
        } else {
            (Vec::new(), fragments)
        };

        // Columns from the line segments of the remaining text
        let columns = self.columns_of(&fragments);
        layout.columns = columns.columns.clone();

        let ctx = PageContext {
            typography,
            options: &self.options,
            columns: &columns,
            page: bounds,
        };

        let mut blocks: Vec<Block> = tables.into_iter().map(table_block).collect();
        for region in split_regions(fragments, &columns) {
            let runs = group_runs(region.fragments, region.column);
            let hypotheses = classify_region(&self.classifiers, &runs, &ctx);
            blocks.extend(aggregate_region(runs, hypotheses, &ctx));
        }
        blocks.extend(image_blocks(page, &bounds, &mut layout.warnings));

        if blocks.is_empty() {
            return layout;
        }

        for block in &mut blocks {
            block.bbox = block.bbox.clamp_to(&bounds);
        }

        // Stable IDs: top to bottom, left to right
        blocks.sort_by(|a, b| {
            a.bbox
                .y0
                .partial_cmp(&b.bbox.y0)
                .unwrap_or(Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
        });
        for (i, block) in blocks.iter_mut().enumerate() {
            block.id = BlockId(i as u32);
        }

        let captions = link_captions(&mut blocks, self.options.caption_proximity);
        let provisional = resolve(&blocks, &columns);
        let zone_top = bounds.y0 + bounds.height() * self.options.footnote_zone;
        let footnotes = link_footnotes(&mut blocks, &provisional, zone_top, typography.body_font_size);

        let order = resolve(&blocks, &columns);
        let mut slots: Vec<Option<Block>> = blocks.into_iter().map(Some).collect();
        for (position, &i) in order.iter().enumerate() {
            if let Some(mut block) = slots[i].take() {
                block.order = Some(position as u32);
                if block.is_attachment() {
                    layout.attachments.push(block);
                } else {
                    layout.blocks.push(block);
                }
            }
        }

        log::debug!(
            "page {}: {} blocks, {} captions, {} footnotes, {} columns",
            page.index,
            layout.block_count(),
            captions,
            footnotes,
            layout.columns.len()
        );
        layout
    }

    fn columns_of(&self, fragments: &[Fragment]) -> ColumnLayout {
        let segments = group_runs(fragments.to_vec(), None);
        detect_columns(
            &segments,
            self.options.column_gap_factor,
            self.options.full_width_tolerance,
        )
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            options: LayoutOptions::default(),
            classifiers: default_classifiers(),
        }
    }
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.classifiers.iter().map(|c| c.name()).collect();
        f.debug_struct("LayoutEngine")
            .field("options", &self.options)
            .field("classifiers", &names)
            .finish()
    }
}

/// Drop fragments that cannot be placed, recording a warning for each.
fn sanitize(page: &PageInput, bounds: &BBox, warnings: &mut Vec<LayoutWarning>) -> Vec<Fragment> {
    let mut kept = Vec::with_capacity(page.fragments.len());
    for (index, fragment) in page.fragments.iter().enumerate() {
        let defect = match fragment.check() {
            Err(defect) => Some(defect),
            Ok(()) if fragment.page_index != page.index => Some(FragmentDefect::WrongPage),
            Ok(()) if fragment.bbox.horizontal_overlap(bounds) <= 0.0
                || fragment.bbox.vertical_overlap(bounds) <= 0.0 =>
            {
                Some(FragmentDefect::OutsidePage)
            }
            Ok(()) => None,
        };

        match defect {
            Some(defect) => {
                let warning = LayoutWarning::dropped_fragment(index, defect, &fragment.text);
                log::warn!("page {}: {}", page.index, warning.message);
                warnings.push(warning);
            }
            None => kept.push(fragment.clone()),
        }
    }
    kept
}

/// Fragments of one column, or of the full-width band.
struct Region {
    column: Option<usize>,
    fragments: Vec<Fragment>,
}

/// Assign fragments to regions by their line segment.
///
/// Segments that cover a whole gutter go to the full-width region; the
/// others go to the column holding their center.
fn split_regions(fragments: Vec<Fragment>, columns: &ColumnLayout) -> Vec<Region> {
    if !columns.is_multi_column() {
        return vec![Region {
            column: Some(0),
            fragments,
        }];
    }

    let mut regions: Vec<Region> = (0..columns.columns.len())
        .map(|c| Region {
            column: Some(c),
            fragments: Vec::new(),
        })
        .collect();
    let mut full_width = Region {
        column: None,
        fragments: Vec::new(),
    };

    for run in group_runs(fragments, None) {
        let Run { bbox, fragments, .. } = run;
        match columns.region_of(&bbox) {
            Some(c) if c < regions.len() => regions[c].fragments.extend(fragments),
            _ => full_width.fragments.extend(fragments),
        }
    }

    regions.push(full_width);
    regions.retain(|r| !r.fragments.is_empty());
    regions
}

fn table_block(table: DetectedTable) -> Block {
    Block::new(BlockId(0), BlockKind::Table(table.grid), table.fragments, table.confidence).with_bbox(table.bbox)
}

/// One image block per image primitive inside the page.
fn image_blocks(page: &PageInput, bounds: &BBox, warnings: &mut Vec<LayoutWarning>) -> Vec<Block> {
    page.graphics
        .iter()
        .filter_map(|graphic| {
            let GraphicKind::Image { resource_id } = &graphic.kind else {
                return None;
            };
            if !graphic.bbox.is_valid() || graphic.bbox.horizontal_overlap(bounds) <= 0.0 {
                let warning = LayoutWarning::message(format!(
                    "skipped image with unusable bounds {:?}",
                    graphic.bbox
                ));
                log::warn!("page {}: {}", page.index, warning.message);
                warnings.push(warning);
                return None;
            }
            let kind = BlockKind::Image {
                resource_id: resource_id.clone(),
                caption: None,
            };
            Some(Block::new(BlockId(0), kind, Vec::new(), 1.0).with_bbox(graphic.bbox))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Graphic;

    fn frag(text: &str, x0: f32, y0: f32, size: f32) -> Fragment {
        let width = text.chars().count() as f32 * size * 0.5;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + size), "Times", size)
    }

    fn analyze(page: PageInput) -> PageLayout {
        let engine = LayoutEngine::default();
        let typography = DocumentTypography::profile(page.fragments.iter());
        engine.analyze_page(&page, &typography)
    }

    #[test]
    fn test_new_rejects_invalid_options() {
        assert!(LayoutEngine::new(LayoutOptions::new().with_heading_font_ratio(0.5)).is_err());
        assert!(LayoutEngine::new(LayoutOptions::default()).is_ok());
    }

    #[test]
    fn test_empty_page() {
        let layout = analyze(PageInput::letter(0));
        assert!(layout.is_empty());
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn test_sanitize_drops_bad_fragments() {
        let page = PageInput::letter(0).with_fragments(vec![
            frag("good text", 50.0, 100.0, 10.0),
            Fragment::new("flat", BBox::new(10.0, 10.0, 10.0, 20.0), "Times", 10.0),
            frag("elsewhere", 50.0, 100.0, 10.0).on_page(3),
            frag("offpage", 900.0, 100.0, 10.0),
        ]);
        let layout = analyze(page);
        let defects: Vec<Option<FragmentDefect>> = layout.warnings.iter().map(|w| w.defect).collect();
        assert_eq!(
            defects,
            vec![
                Some(FragmentDefect::DegenerateBox),
                Some(FragmentDefect::WrongPage),
                Some(FragmentDefect::OutsidePage)
            ]
        );
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].text(), "good text");
    }

    #[test]
    fn test_ids_and_order_assigned() {
        let page = PageInput::letter(0).with_fragments(vec![
            frag("Second paragraph of the page", 50.0, 300.0, 10.0),
            frag("First paragraph of the page", 50.0, 100.0, 10.0),
        ]);
        let layout = analyze(page);
        assert_eq!(layout.blocks.len(), 2);
        assert_eq!(layout.blocks[0].id, BlockId(0));
        assert_eq!(layout.blocks[0].order, Some(0));
        assert_eq!(layout.blocks[1].order, Some(1));
        assert!(layout.blocks[0].text().starts_with("First"));
    }

    #[test]
    fn test_image_with_caption() {
        let page = PageInput::letter(0)
            .with_fragments(vec![
                frag("Body text above the figure on this page", 50.0, 80.0, 10.0),
                frag("Figure 1: Sales by region", 100.0, 310.0, 10.0),
            ])
            .with_graphics(vec![Graphic::image_with_id(BBox::new(100.0, 100.0, 400.0, 300.0), "img1")]);
        let layout = analyze(page);

        let image = layout
            .blocks
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Image { .. }))
            .unwrap();
        assert!(matches!(
            &image.kind,
            BlockKind::Image { resource_id: Some(id), caption: Some(c) } if id == "img1" && c.starts_with("Figure 1")
        ));
        let caption = layout.captions().next().unwrap();
        assert!(matches!(caption.kind, BlockKind::Caption { target, .. } if target == image.id));
        assert_eq!(layout.blocks.len(), 2);
    }

    #[test]
    fn test_block_boxes_clamped_to_page() {
        let page = PageInput::new(0, 200.0, 200.0).with_fragments(vec![frag(
            "A line running past the right edge",
            150.0,
            100.0,
            10.0,
        )]);
        let layout = analyze(page);
        assert!(layout.blocks[0].bbox.x1 <= 200.0);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let doc = DocumentInput::from_fragments(
            (0..4).flat_map(|p| {
                vec![
                    frag("Heading", 50.0, 50.0, 20.0).on_page(p),
                    frag("Body text line one of the page", 50.0, 100.0, 10.0).on_page(p),
                    frag("Body text line two of the page", 50.0, 112.0, 10.0).on_page(p),
                ]
            }),
            612.0,
            792.0,
        );
        let parallel = LayoutEngine::default().analyze_document(&doc);
        let sequential = LayoutEngine::new(LayoutOptions::default().sequential())
            .unwrap()
            .analyze_document(&doc);
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.page_count(), 4);
    }
}
