//! Table detection.
//!
//! Two strategies run in order. Lattice detection builds grids from ruling
//! lines and rectangle edges. Stream detection, inspired by Camelot's Stream
//! mode, infers columns from text alignment without relying on graphical
//! lines; it only runs when the lattice pass found nothing.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::columns::Gutter;
use super::lines::{group_lines, join_fragments};
use crate::error::{Error, Result};
use crate::model::{
    BBox, Fragment, Graphic, GraphicKind, TableCell, TableGrid, TableRow, TableStrategy,
};

/// Bucket width for column edge positions (points).
const EDGE_BUCKET: f32 = 5.0;

/// Tolerance for a cell's left edge to count as aligned (points).
const ALIGN_TOLERANCE: f32 = 5.0;

/// Table detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping fragments into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Largest vertical gap between consecutive rows, in font sizes
    pub max_row_gap: f32,
    /// Regions whose cells average more characters than this are prose
    pub max_mean_cell_chars: f32,
    /// Columns split by a page gutter whose cells average at least this
    /// many words are text columns, not a table
    pub prose_words_per_cell: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            max_row_gap: 2.0,
            max_mean_cell_chars: 40.0,
            prose_words_per_cell: 3.0,
        }
    }
}

impl TableDetectorConfig {
    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.min_rows < 2 || self.min_columns < 2 {
            return Err(Error::InvalidConfig(
                "tables need at least 2 rows and 2 columns".to_string(),
            ));
        }
        if self.max_columns < self.min_columns {
            return Err(Error::InvalidConfig(
                "table.max_columns must be >= table.min_columns".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_alignment_ratio) {
            return Err(Error::InvalidConfig(
                "table.min_alignment_ratio must be within [0, 1]".to_string(),
            ));
        }
        let positive = [
            self.y_tolerance_factor,
            self.max_row_gap,
            self.max_mean_cell_chars,
            self.prose_words_per_cell,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) || self.min_column_gap < 0.0 {
            return Err(Error::InvalidConfig(
                "table tolerances must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A detected table with the fragments it consumed.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// The table grid; cell fragment indices point into `fragments`
    pub grid: TableGrid,
    /// Consumed fragments, row by row and cell by cell
    pub fragments: Vec<Fragment>,
    /// Table bounds
    pub bbox: BBox,
    /// Detection confidence
    pub confidence: f32,
}

/// Detects tables among a page's fragments and graphics.
#[derive(Debug, Clone)]
pub struct TableDetector {
    config: TableDetectorConfig,
    intersection_tolerance: f32,
    min_confidence: f32,
    gutters: Vec<Gutter>,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::with_config(TableDetectorConfig::default())
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self {
            config,
            intersection_tolerance: 3.0,
            min_confidence: 0.5,
            gutters: Vec::new(),
        }
    }

    /// Set the tolerance used to cluster ruling lines.
    pub fn with_intersection_tolerance(mut self, tolerance: f32) -> Self {
        self.intersection_tolerance = tolerance;
        self
    }

    /// Set the confidence below which candidates are rejected.
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = confidence;
        self
    }

    /// Set the page's column gutters, used to tell text columns from tables.
    pub fn with_gutters(mut self, gutters: Vec<Gutter>) -> Self {
        self.gutters = gutters;
        self
    }

    /// Detect tables.
    ///
    /// Returns detected tables and the fragments that were NOT part of tables.
    pub fn detect(
        &self,
        fragments: Vec<Fragment>,
        graphics: &[Graphic],
    ) -> (Vec<DetectedTable>, Vec<Fragment>) {
        log::debug!(
            "TableDetector: starting with {} fragments, {} graphics",
            fragments.len(),
            graphics.len()
        );

        let (tables, rest) = self.detect_lattice(fragments, graphics);
        if !tables.is_empty() {
            log::debug!("TableDetector: {} lattice tables", tables.len());
            return (tables, rest);
        }

        self.detect_stream(rest)
    }

    // ---------------------------------------------------------------------
    // Lattice
    // ---------------------------------------------------------------------

    /// Detect tables bounded by ruling lines.
    pub fn detect_lattice(
        &self,
        fragments: Vec<Fragment>,
        graphics: &[Graphic],
    ) -> (Vec<DetectedTable>, Vec<Fragment>) {
        let tol = self.intersection_tolerance;
        let rules = collect_rules(graphics, tol);
        if rules.len() < 6 || fragments.is_empty() {
            return (vec![], fragments);
        }

        let mut sets = DisjointSet::new(rules.len());
        for i in 0..rules.len() {
            for j in i + 1..rules.len() {
                if rules[i].touches(&rules[j], tol) {
                    sets.union(i, j);
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..rules.len() {
            components.entry(sets.find(i)).or_default().push(i);
        }
        let mut components: Vec<Vec<usize>> = components.into_values().collect();
        components.sort_by_key(|c| c[0]);

        let mut used: HashSet<usize> = HashSet::new();
        let mut tables = Vec::new();

        for component in components {
            let comp_rules: Vec<&Rule> = component.iter().map(|&i| &rules[i]).collect();
            let xs = cluster_positions(
                comp_rules.iter().filter(|r| !r.horizontal).map(|r| r.pos).collect(),
                tol,
            );
            let ys = cluster_positions(
                comp_rules.iter().filter(|r| r.horizontal).map(|r| r.pos).collect(),
                tol,
            );
            if xs.len() < 3 || ys.len() < 3 {
                continue;
            }

            let intersections = comp_rules
                .iter()
                .filter(|h| h.horizontal)
                .flat_map(|h| {
                    comp_rules
                        .iter()
                        .filter(|v| !v.horizontal)
                        .filter(move |v| h.touches(v, tol))
                })
                .count();
            if intersections < 4 {
                continue;
            }

            match self.fill_lattice(&fragments, &used, &xs, &ys) {
                Some((placed, table)) => {
                    used.extend(placed);
                    tables.push(table);
                }
                None => log::debug!(
                    "TableDetector: lattice {}x{} rejected",
                    ys.len() - 1,
                    xs.len() - 1
                ),
            }
        }

        let rest = fragments
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, f)| f)
            .collect();
        (tables, rest)
    }

    /// Place fragments into lattice cells; `None` when the grid is empty or
    /// a fragment straddles a rule.
    fn fill_lattice(
        &self,
        fragments: &[Fragment],
        used: &HashSet<usize>,
        xs: &[f32],
        ys: &[f32],
    ) -> Option<(Vec<usize>, DetectedTable)> {
        let tol = self.intersection_tolerance;
        let grid_box = BBox::new(xs[0], ys[0], xs[xs.len() - 1], ys[ys.len() - 1]);

        let mut placed = Vec::new();
        let mut assignments = Vec::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if used.contains(&i) {
                continue;
            }
            let (cx, cy) = (fragment.bbox.center_x(), fragment.bbox.center_y());
            if cx < grid_box.x0 || cx > grid_box.x1 || cy < grid_box.y0 || cy > grid_box.y1 {
                continue;
            }

            let col = xs.windows(2).position(|w| cx >= w[0] && cx <= w[1])?;
            let row = ys.windows(2).position(|w| cy >= w[0] && cy <= w[1])?;
            let cell = BBox::new(xs[col], ys[row], xs[col + 1], ys[row + 1]);
            if !cell.contains(&fragment.bbox, tol) {
                log::debug!(
                    "TableDetector: fragment {:?} straddles lattice cell ({}, {})",
                    fragment.text,
                    row,
                    col
                );
                return None;
            }
            placed.push(i);
            assignments.push((row, col, i));
        }

        if placed.is_empty() {
            return None;
        }

        let table = build_table(
            fragments,
            &assignments,
            xs.to_vec(),
            ys.to_vec(),
            TableStrategy::Lattice,
            1.0,
        );
        Some((placed, table))
    }

    // ---------------------------------------------------------------------
    // Stream
    // ---------------------------------------------------------------------

    /// Detect tables from text alignment alone.
    pub fn detect_stream(&self, fragments: Vec<Fragment>) -> (Vec<DetectedTable>, Vec<Fragment>) {
        if fragments.len() < self.config.min_rows * self.config.min_columns {
            log::debug!(
                "TableDetector: not enough fragments ({} < {})",
                fragments.len(),
                self.config.min_rows * self.config.min_columns
            );
            return (vec![], fragments);
        }

        // Step 1: Group fragments into rows by y0
        let rows = self.group_into_rows(&fragments);
        log::debug!("TableDetector: grouped into {} rows", rows.len());
        if rows.len() < self.config.min_rows {
            return (vec![], fragments);
        }

        // Step 2: Detect column edges from cell candidates
        let all_rows: Vec<&StreamRow> = rows.iter().collect();
        let columns = self.detect_columns(&all_rows);
        log::debug!("TableDetector: column edges {:?}", columns);
        if columns.len() < self.config.min_columns {
            return (vec![], fragments);
        }

        // Step 3: Find contiguous, aligned row regions
        let regions = self.find_table_regions(&rows, &columns);
        log::debug!("TableDetector: found {} table regions", regions.len());

        // Step 4: Validate regions and build grids
        let mut used: HashSet<usize> = HashSet::new();
        let mut tables = Vec::new();
        for (start, end) in regions {
            let region: Vec<&StreamRow> = rows[start..=end].iter().collect();
            if let Some(table) = self.build_stream_table(&fragments, &region) {
                used.extend(region.iter().flat_map(|r| r.members()));
                tables.push(table);
            }
        }

        let rest = fragments
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, f)| f)
            .collect();
        (tables, rest)
    }

    /// Group fragments into rows by y0, merging nearby fragments into cell
    /// candidates.
    fn group_into_rows(&self, fragments: &[Fragment]) -> Vec<StreamRow> {
        let mut order: Vec<usize> = (0..fragments.len()).collect();
        order.sort_by(|&a, &b| {
            let (fa, fb) = (&fragments[a].bbox, &fragments[b].bbox);
            fa.y0
                .partial_cmp(&fb.y0)
                .unwrap_or(Ordering::Equal)
                .then(fa.x0.partial_cmp(&fb.x0).unwrap_or(Ordering::Equal))
        });

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut current_y: Option<f32> = None;
        for i in order {
            let fragment = &fragments[i];
            let y_tolerance = fragment.font_size * self.config.y_tolerance_factor;
            match (current_y, groups.last_mut()) {
                (Some(y), Some(group)) if (fragment.bbox.y0 - y).abs() <= y_tolerance => {
                    group.push(i);
                }
                _ => {
                    current_y = Some(fragment.bbox.y0);
                    groups.push(vec![i]);
                }
            }
        }

        groups
            .into_iter()
            .map(|group| StreamRow::new(fragments, group, self.config.min_column_gap))
            .collect()
    }

    /// Detect column edges from the left edges of cell candidates.
    ///
    /// Only rows with two or more candidates vote; an edge needs votes from
    /// `min_alignment_ratio` of those rows (at least two).
    fn detect_columns(&self, rows: &[&StreamRow]) -> Vec<f32> {
        let multi_cell_rows: Vec<&&StreamRow> = rows.iter().filter(|r| r.cells.len() >= 2).collect();
        if multi_cell_rows.len() < self.config.min_rows {
            return vec![];
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &multi_cell_rows {
            // Count each bucket only once per row
            let buckets: HashSet<i32> = row
                .cells
                .iter()
                .map(|c| (c.bbox.x0 / EDGE_BUCKET).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi_cell_rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut column_edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * EDGE_BUCKET)
            .collect();
        column_edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        // Merge close edges
        let mut merged: Vec<f32> = Vec::new();
        for edge in column_edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Find contiguous row regions that form tables.
    fn find_table_regions(&self, rows: &[StreamRow], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut current_start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.cells.len() >= 2
                && row.occupied_columns(columns) >= 2
                && row.alignment_score(columns) >= self.config.min_alignment_ratio;

            let close = match (current_start, i.checked_sub(1).map(|p| &rows[p])) {
                (Some(_), Some(prev)) => row.y0 - prev.y1 <= self.config.max_row_gap * row.font_size,
                _ => true,
            };

            match (aligned, current_start) {
                (true, Some(_)) if close => {}
                (true, start) => {
                    if let Some(start) = start {
                        self.close_region(&mut regions, start, i - 1);
                    }
                    current_start = Some(i);
                }
                (false, Some(start)) => {
                    self.close_region(&mut regions, start, i - 1);
                    current_start = None;
                }
                (false, None) => {}
            }
        }

        if let Some(start) = current_start {
            self.close_region(&mut regions, start, rows.len() - 1);
        }
        regions
    }

    fn close_region(&self, regions: &mut Vec<(usize, usize)>, start: usize, end: usize) {
        if end + 1 - start >= self.config.min_rows {
            regions.push((start, end));
        }
    }

    /// Validate a region and turn it into a table.
    fn build_stream_table(&self, fragments: &[Fragment], region: &[&StreamRow]) -> Option<DetectedTable> {
        // Re-detect columns for this specific table region
        let columns = self.detect_columns(region);
        if columns.len() < self.config.min_columns {
            return None;
        }
        if columns.len() > self.config.max_columns {
            log::debug!(
                "TableDetector: skipping region, too many columns ({} > {})",
                columns.len(),
                self.config.max_columns
            );
            return None;
        }
        if self.is_list_pattern(fragments, region, &columns) {
            log::debug!("TableDetector: skipping region, detected as list pattern");
            return None;
        }

        let members: Vec<usize> = region.iter().flat_map(|r| r.members()).collect();
        let mono = members.iter().filter(|&&i| fragments[i].is_monospace).count();
        if mono * 2 > members.len() {
            log::debug!("TableDetector: skipping region, monospaced text");
            return None;
        }

        let right_x = region
            .iter()
            .flat_map(|r| r.cells.iter())
            .map(|c| c.bbox.x1)
            .fold(f32::MIN, f32::max);

        // Assign every candidate to a column and measure column extents
        let mut extents: Vec<Option<(f32, f32)>> = vec![None; columns.len()];
        let mut placed = Vec::new();
        for (r, row) in region.iter().enumerate() {
            for cell in &row.cells {
                let c = find_column_for_cell(cell.bbox.x0, &columns, right_x);
                let extent = extents[c].get_or_insert((cell.bbox.x0, cell.bbox.x1));
                extent.0 = extent.0.min(cell.bbox.x0);
                extent.1 = extent.1.max(cell.bbox.x1);
                placed.extend(cell.members.iter().map(|&i| (r, c, i)));
            }
        }
        let extents: Vec<(f32, f32)> = extents.into_iter().collect::<Option<_>>()?;

        // Cells must not overlap across column or row boundaries
        if extents.windows(2).any(|w| w[0].1 > w[1].0) {
            log::debug!("TableDetector: skipping region, a cell straddles a column boundary");
            return None;
        }
        if region.windows(2).any(|w| w[0].y1 > w[1].y0) {
            log::debug!("TableDetector: skipping region, rows overlap");
            return None;
        }

        let mut column_edges = vec![extents[0].0];
        column_edges.extend(extents.windows(2).map(|w| (w[0].1 + w[1].0) / 2.0));
        column_edges.push(extents[extents.len() - 1].1);

        let mut row_edges = vec![region[0].y0];
        row_edges.extend(region.windows(2).map(|w| (w[0].y1 + w[1].y0) / 2.0));
        row_edges.push(region[region.len() - 1].y1);

        let confidence = region
            .iter()
            .map(|r| r.alignment_score(&columns))
            .sum::<f32>()
            / region.len() as f32;

        let table = build_table(
            fragments,
            &placed,
            column_edges,
            row_edges,
            TableStrategy::Stream,
            confidence,
        );

        let non_empty: Vec<usize> = table
            .grid
            .rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| !c.is_empty())
            .map(|c| c.text.chars().count())
            .collect();
        let mean_chars = non_empty.iter().sum::<usize>() as f32 / non_empty.len().max(1) as f32;
        if mean_chars > self.config.max_mean_cell_chars {
            log::debug!(
                "TableDetector: skipping region, mean cell length {:.1} looks like prose",
                mean_chars
            );
            return None;
        }

        if self.is_text_columns(&table.grid, &extents) {
            log::debug!("TableDetector: skipping region, text columns split by a page gutter");
            return None;
        }

        if confidence < self.min_confidence {
            log::debug!(
                "TableDetector: skipping region, confidence {:.2} below {:.2}",
                confidence,
                self.min_confidence
            );
            return None;
        }

        Some(table)
    }

    /// Check if a candidate is running text set in page columns: a page
    /// gutter falls between two of its columns and every column averages
    /// `prose_words_per_cell` words per cell.
    fn is_text_columns(&self, grid: &TableGrid, extents: &[(f32, f32)]) -> bool {
        let split_by_gutter = extents.windows(2).any(|w| {
            self.gutters
                .iter()
                .any(|g| g.mid() > w[0].1 && g.mid() < w[1].0)
        });
        if !split_by_gutter {
            return false;
        }

        (0..grid.column_count()).all(|c| {
            let words: Vec<usize> = grid
                .rows
                .iter()
                .filter_map(|row| row.cells.get(c))
                .filter(|cell| !cell.is_empty())
                .map(|cell| cell.text.split_whitespace().count())
                .collect();
            !words.is_empty()
                && words.iter().sum::<usize>() as f32 / words.len() as f32 >= self.config.prose_words_per_cell
        })
    }

    /// Check if detected table rows actually represent a numbered or bulleted list.
    ///
    /// When a list has its marker and text as separate fragments at different
    /// x positions, it looks like a two-column table to the detector.
    fn is_list_pattern(&self, fragments: &[Fragment], rows: &[&StreamRow], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;
        for row in rows {
            let Some(first) = row.cells.first() else {
                continue;
            };
            let text = first.text(fragments);
            let token = text.split_whitespace().next().unwrap_or("");
            if is_bullet_marker(token) {
                bullet_count += 1;
            } else if is_number_marker(token) {
                number_count += 1;
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;
        log::debug!(
            "TableDetector: list markers: bullets={}, numbers={}, rows={}",
            bullet_count,
            number_count,
            rows.len()
        );

        // Bullet markers are almost never real table data
        if bullet_ratio >= 0.5 {
            return true;
        }

        // Numbered first columns are common in real tables; only reject 2-column layouts
        columns.len() == 2 && total_ratio >= 0.5
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// A row of cell candidates.
#[derive(Debug, Clone)]
struct StreamRow {
    y0: f32,
    y1: f32,
    font_size: f32,
    cells: Vec<Candidate>,
}

/// Fragments of one row close enough to form a single cell.
#[derive(Debug, Clone)]
struct Candidate {
    bbox: BBox,
    members: Vec<usize>,
}

impl Candidate {
    fn text(&self, fragments: &[Fragment]) -> String {
        join_fragments(self.members.iter().map(|&i| &fragments[i]))
    }
}

impl StreamRow {
    fn new(fragments: &[Fragment], mut members: Vec<usize>, min_column_gap: f32) -> Self {
        members.sort_by(|&a, &b| {
            fragments[a]
                .bbox
                .x0
                .partial_cmp(&fragments[b].bbox.x0)
                .unwrap_or(Ordering::Equal)
        });

        let mut cells: Vec<Candidate> = Vec::new();
        for i in members {
            let fragment = &fragments[i];
            match cells.last_mut() {
                Some(cell) => {
                    let gap = fragment.bbox.x0 - cell.bbox.x1;
                    let merge_gap = (fragment.char_width() * 2.0).min(min_column_gap);
                    if gap <= merge_gap {
                        cell.bbox = cell.bbox.union(&fragment.bbox);
                        cell.members.push(i);
                    } else {
                        cells.push(Candidate {
                            bbox: fragment.bbox,
                            members: vec![i],
                        });
                    }
                }
                None => cells.push(Candidate {
                    bbox: fragment.bbox,
                    members: vec![i],
                }),
            }
        }

        let boxes = BBox::union_all(cells.iter().map(|c| &c.bbox)).unwrap_or_default();
        let sizes: Vec<f32> = cells
            .iter()
            .flat_map(|c| c.members.iter())
            .map(|&i| fragments[i].font_size)
            .collect();

        Self {
            y0: boxes.y0,
            y1: boxes.y1,
            font_size: super::median(&sizes).unwrap_or(10.0),
            cells,
        }
    }

    fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().flat_map(|c| c.members.iter().copied())
    }

    /// Fraction of candidates whose left edge sits on a column edge.
    fn alignment_score(&self, columns: &[f32]) -> f32 {
        if self.cells.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let aligned = self
            .cells
            .iter()
            .filter(|c| columns.iter().any(|col| (c.bbox.x0 - col).abs() <= ALIGN_TOLERANCE))
            .count();
        aligned as f32 / self.cells.len() as f32
    }

    /// Number of distinct columns whose edge some candidate sits on.
    fn occupied_columns(&self, columns: &[f32]) -> usize {
        columns
            .iter()
            .filter(|col| {
                self.cells
                    .iter()
                    .any(|c| (c.bbox.x0 - **col).abs() <= ALIGN_TOLERANCE)
            })
            .count()
    }
}

/// Find which column a cell belongs to based on its left edge.
fn find_column_for_cell(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // Allow some tolerance for cells slightly before the column start
        if x >= col_start - ALIGN_TOLERANCE && x < col_end - ALIGN_TOLERANCE {
            return i;
        }
    }

    // No exact match: closest column
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Build a table from placed fragments `(row, col, fragment index)`.
fn build_table(
    fragments: &[Fragment],
    placed: &[(usize, usize, usize)],
    column_edges: Vec<f32>,
    row_edges: Vec<f32>,
    strategy: TableStrategy,
    confidence: f32,
) -> DetectedTable {
    let n_rows = row_edges.len().saturating_sub(1);
    let n_cols = column_edges.len().saturating_sub(1);

    let mut members: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); n_cols]; n_rows];
    for &(r, c, i) in placed {
        members[r][c].push(i);
    }

    let mut source: Vec<Fragment> = Vec::new();
    let mut rows = Vec::with_capacity(n_rows);
    for (r, row_members) in members.into_iter().enumerate() {
        let mut cells = Vec::with_capacity(n_cols);
        for (c, cell_members) in row_members.into_iter().enumerate() {
            let bbox = BBox::new(column_edges[c], row_edges[r], column_edges[c + 1], row_edges[r + 1]);
            let cell_fragments: Vec<Fragment> =
                cell_members.iter().map(|&i| fragments[i].clone()).collect();

            let mut texts = Vec::new();
            let mut indices = Vec::new();
            for line in group_lines(cell_fragments) {
                texts.push(join_fragments(line.iter()));
                for fragment in line {
                    indices.push(source.len());
                    source.push(fragment);
                }
            }

            cells.push(TableCell {
                bbox,
                text: texts.join(" "),
                fragments: indices,
            });
        }
        rows.push(TableRow::new(cells));
    }

    let header_row = detect_header(&rows, &source);
    if header_row {
        rows[0].is_header = true;
    }

    let bbox = BBox::new(
        column_edges.first().copied().unwrap_or_default(),
        row_edges.first().copied().unwrap_or_default(),
        column_edges.last().copied().unwrap_or_default(),
        row_edges.last().copied().unwrap_or_default(),
    );

    let mut grid = TableGrid::new(rows, strategy, column_edges, row_edges);
    grid.header_row = header_row;

    DetectedTable {
        grid,
        fragments: source,
        bbox,
        confidence,
    }
}

/// First row is a header when more than half of its non-empty cells stand
/// out against the cell below: bold over regular, uppercase over mixed case,
/// or shorter text.
fn detect_header(rows: &[TableRow], source: &[Fragment]) -> bool {
    let (Some(first), Some(second)) = (rows.first(), rows.get(1)) else {
        return false;
    };

    let is_bold = |cell: &TableCell| {
        let total: usize = cell.fragments.iter().map(|&i| source[i].char_count()).sum();
        let bold: usize = cell
            .fragments
            .iter()
            .filter(|&&i| source[i].is_bold)
            .map(|&i| source[i].char_count())
            .sum();
        total > 0 && bold * 2 > total
    };
    let is_upper = |cell: &TableCell| {
        let letters: Vec<char> = cell.text.chars().filter(|c| c.is_alphabetic()).collect();
        !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
    };

    let mut candidates = 0;
    let mut hits = 0;
    for (head, below) in first.cells.iter().zip(second.cells.iter()) {
        if head.is_empty() {
            continue;
        }
        candidates += 1;
        let stands_out = (is_bold(head) && !is_bold(below))
            || (is_upper(head) && !is_upper(below))
            || (!below.is_empty() && head.text.chars().count() < below.text.chars().count());
        if stands_out {
            hits += 1;
        }
    }

    candidates > 0 && hits as f32 / candidates as f32 > 0.5
}

/// A ruling segment: horizontal (`pos` = y) or vertical (`pos` = x).
#[derive(Debug, Clone, Copy)]
struct Rule {
    horizontal: bool,
    pos: f32,
    start: f32,
    end: f32,
}

impl Rule {
    fn touches(&self, other: &Rule, tol: f32) -> bool {
        if self.horizontal != other.horizontal {
            let (h, v) = if self.horizontal { (self, other) } else { (other, self) };
            v.pos >= h.start - tol
                && v.pos <= h.end + tol
                && h.pos >= v.start - tol
                && h.pos <= v.end + tol
        } else {
            (self.pos - other.pos).abs() <= tol
                && self.start <= other.end + tol
                && other.start <= self.end + tol
        }
    }
}

/// Turn lines and rectangles into ruling segments.
fn collect_rules(graphics: &[Graphic], tol: f32) -> Vec<Rule> {
    let mut rules = Vec::new();
    for graphic in graphics {
        let b = graphic.bbox;
        if !b.is_finite() || matches!(graphic.kind, GraphicKind::Image { .. }) {
            continue;
        }

        let thin_h = b.height() <= tol && b.width() > tol;
        let thin_v = b.width() <= tol && b.height() > tol;
        if thin_h {
            rules.push(Rule {
                horizontal: true,
                pos: b.center_y(),
                start: b.x0,
                end: b.x1,
            });
        } else if thin_v {
            rules.push(Rule {
                horizontal: false,
                pos: b.center_x(),
                start: b.y0,
                end: b.y1,
            });
        } else if graphic.kind == GraphicKind::Rect && b.width() > tol && b.height() > tol {
            for (horizontal, pos) in [(true, b.y0), (true, b.y1)] {
                rules.push(Rule {
                    horizontal,
                    pos,
                    start: b.x0,
                    end: b.x1,
                });
            }
            for (horizontal, pos) in [(false, b.x0), (false, b.x1)] {
                rules.push(Rule {
                    horizontal,
                    pos,
                    start: b.y0,
                    end: b.y1,
                });
            }
        }
    }
    rules
}

/// Merge positions closer than `tol` into their mean.
fn cluster_positions(mut values: Vec<f32>, tol: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some(cluster) if cluster.last().map_or(false, |&last| v - last <= tol) => cluster.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .into_iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Union-find over rule indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            Ordering::Greater => self.parent[ry] = rx,
            Ordering::Less => self.parent[rx] = ry,
            Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

/// Check if text is a bullet marker (•, -, etc.).
pub(crate) fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "◇" | "→" | "✓"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
pub(crate) fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    // Digits followed by "." or ")"
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    // Just a bare number
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // Letter marker: "a.", "B)"
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
