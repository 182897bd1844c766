//! Column detection.
//!
//! Columns are found by sweeping the x-projection of the page's line
//! segments (runs) and looking for interior ranges that almost nothing
//! crosses. Working on runs instead of raw fragments keeps inter-word gaps
//! from looking like gutters when the extractor emits one fragment per word.

use std::cmp::Ordering;

use super::lines::Run;
use crate::model::{BBox, Column};

/// A vertical whitespace channel between two columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gutter {
    /// Left edge of the channel
    pub start: f32,
    /// Right edge of the channel
    pub end: f32,
}

impl Gutter {
    /// Center of the channel.
    pub fn mid(&self) -> f32 {
        (self.start + self.end) / 2.0
    }

    /// Width of the channel.
    pub fn width(&self) -> f32 {
        self.end - self.start
    }

    /// Check if a box covers the whole channel.
    pub fn is_spanned_by(&self, bbox: &BBox) -> bool {
        bbox.x0 <= self.start && bbox.x1 >= self.end
    }
}

/// Detected columns of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    /// Columns, left to right
    pub columns: Vec<Column>,
    /// Gutters between the columns
    pub gutters: Vec<Gutter>,
}

impl ColumnLayout {
    /// A single column covering `left..right`.
    pub fn single(left: f32, right: f32) -> Self {
        Self {
            columns: vec![Column {
                left,
                right,
                index: 0,
            }],
            gutters: Vec::new(),
        }
    }

    /// Check if more than one column was found.
    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }

    /// Region a box belongs to: its column, or `None` for the full-width
    /// region when it covers a whole gutter.
    pub fn region_of(&self, bbox: &BBox) -> Option<usize> {
        if self.gutters.iter().any(|g| g.is_spanned_by(bbox)) {
            return None;
        }
        let center = bbox.center_x();
        Some(self.gutters.iter().filter(|g| g.mid() < center).count())
    }

    /// Number of columns a box horizontally overlaps.
    pub fn overlapped_columns(&self, bbox: &BBox) -> usize {
        self.columns
            .iter()
            .filter(|c| bbox.x1 > c.left && bbox.x0 < c.right)
            .count()
    }
}

/// Detect columns from the line segments of a page.
///
/// A gutter is a maximal interior x-range covered by at most
/// `floor(full_width_tolerance * n)` of the `n` segments and at least
/// `gap_factor` median character widths wide. Gutters that would leave a
/// column with fewer than two segments are discarded.
pub fn detect_columns(segments: &[Run], gap_factor: f32, full_width_tolerance: f32) -> ColumnLayout {
    let boxes: Vec<BBox> = segments.iter().map(|s| s.bbox).collect();

    let (Some(min_x), Some(max_x)) = (
        boxes
            .iter()
            .map(|b| b.x0)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
        boxes
            .iter()
            .map(|b| b.x1)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
    ) else {
        return ColumnLayout::single(0.0, 0.0);
    };

    if boxes.len() < 4 {
        return ColumnLayout::single(min_x, max_x);
    }

    let char_widths: Vec<f32> = segments.iter().map(|s| s.char_width()).collect();
    let min_gap = super::median(&char_widths).unwrap_or(5.0) * gap_factor;
    let threshold = (full_width_tolerance * boxes.len() as f32).floor() as usize;

    let candidates = find_gutters(&boxes, min_x, max_x, threshold, min_gap);

    log::debug!(
        "column sweep: {} segments, threshold {}, min gap {:.1}pt, {} candidate gutters",
        boxes.len(),
        threshold,
        min_gap,
        candidates.len()
    );

    // Keep gutters that leave at least two segments on each side
    let mut gutters: Vec<Gutter> = Vec::new();
    for gutter in candidates {
        let left_bound = gutters.last().map(|g| g.mid()).unwrap_or(f32::NEG_INFINITY);
        let mid = gutter.mid();
        let in_column = |b: &&BBox| !gutter.is_spanned_by(b);
        let left = boxes
            .iter()
            .filter(in_column)
            .filter(|b| b.center_x() > left_bound && b.center_x() < mid)
            .count();
        let right = boxes
            .iter()
            .filter(in_column)
            .filter(|b| b.center_x() > mid)
            .count();

        if left >= 2 && right >= 2 {
            gutters.push(gutter);
        } else {
            log::debug!(
                "discarding gutter {:.1}..{:.1} (left={}, right={})",
                gutter.start,
                gutter.end,
                left,
                right
            );
        }
    }

    if gutters.is_empty() {
        return ColumnLayout::single(min_x, max_x);
    }

    let mut columns = Vec::with_capacity(gutters.len() + 1);
    let mut left = min_x;
    for (index, gutter) in gutters.iter().enumerate() {
        columns.push(Column {
            left,
            right: gutter.start,
            index,
        });
        left = gutter.end;
    }
    columns.push(Column {
        left,
        right: max_x,
        index: gutters.len(),
    });

    for col in &columns {
        log::debug!("  column {}: left={:.1}, right={:.1}", col.index, col.left, col.right);
    }

    ColumnLayout { columns, gutters }
}

/// Sweep the x-projection and return low-coverage interior ranges.
fn find_gutters(boxes: &[BBox], min_x: f32, max_x: f32, threshold: usize, min_gap: f32) -> Vec<Gutter> {
    let mut events: Vec<(f32, i32)> = Vec::with_capacity(boxes.len() * 2);
    for b in boxes {
        events.push((b.x0, 1));
        events.push((b.x1, -1));
    }
    events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut gutters = Vec::new();
    let mut coverage: i32 = 0;
    let mut open: Option<f32> = None;
    let mut i = 0;

    while i < events.len() {
        let x = events[i].0;
        while i < events.len() && events[i].0 == x {
            coverage += events[i].1;
            i += 1;
        }
        if i == events.len() {
            break;
        }

        let low = coverage.max(0) as usize <= threshold;
        match (low, open) {
            (true, None) => open = Some(x),
            (false, Some(start)) => {
                if start > min_x && x < max_x && x - start >= min_gap {
                    gutters.push(Gutter { start, end: x });
                }
                open = None;
            }
            _ => {}
        }
    }

    gutters
}
