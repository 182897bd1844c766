//! Reading-order resolution.
//!
//! Blocks are ordered with a precedence graph: within a column top to
//! bottom, columns left to right within a band, and blocks spanning two or
//! more columns acting as separators between bands. A topological sort with
//! a (y0, x0, id) tie-break makes the order total and deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::columns::ColumnLayout;
use crate::model::{BBox, Block, BlockId};

/// Tie-break key of a block.
#[derive(Debug, Clone, Copy)]
struct OrderKey {
    y0: f32,
    x0: f32,
    id: BlockId,
}

impl OrderKey {
    fn of(block: &Block) -> Self {
        Self {
            y0: block.bbox.y0,
            x0: block.bbox.x0,
            id: block.id,
        }
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y0
            .total_cmp(&other.y0)
            .then(self.x0.total_cmp(&other.x0))
            .then(self.id.cmp(&other.id))
    }
}

/// Where a block sits on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Column(usize),
    Separator,
}

fn placement(bbox: &BBox, columns: &ColumnLayout) -> Placement {
    if columns.is_multi_column() && columns.overlapped_columns(bbox) >= 2 {
        return Placement::Separator;
    }
    match columns.region_of(bbox) {
        Some(column) => Placement::Column(column),
        None => Placement::Separator,
    }
}

/// Resolve the reading order of a page.
///
/// Returns indices into `blocks`, every index exactly once.
pub fn resolve(blocks: &[Block], columns: &ColumnLayout) -> Vec<usize> {
    let n = blocks.len();
    let keys: Vec<OrderKey> = blocks.iter().map(OrderKey::of).collect();
    let placements: Vec<Placement> = blocks.iter().map(|b| placement(&b.bbox, columns)).collect();

    let mut separators: Vec<usize> = (0..n).filter(|&i| placements[i] == Placement::Separator).collect();
    separators.sort_by_key(|&i| keys[i]);

    // Band = number of separators whose key precedes the block's
    let band_of = |i: usize| separators.partition_point(|&s| keys[s] < keys[i]);

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    let mut add_edge = |from: usize, to: usize, edges: &mut Vec<Vec<usize>>| {
        edges[from].push(to);
        indegree[to] += 1;
    };

    // Separators chain, and bound every band on both sides
    for w in separators.windows(2) {
        add_edge(w[0], w[1], &mut edges);
    }

    let band_count = separators.len() + 1;
    let column_count = columns.columns.len().max(1);
    let mut cells: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); column_count]; band_count];
    for i in 0..n {
        if let Placement::Column(c) = placements[i] {
            cells[band_of(i)][c.min(column_count - 1)].push(i);
        }
    }

    for (band, band_cells) in cells.iter_mut().enumerate() {
        let mut previous_tail: Option<usize> = None;
        for cell in band_cells.iter_mut() {
            if cell.is_empty() {
                continue;
            }
            cell.sort_by_key(|&i| keys[i]);

            // Within a column: top to bottom
            for w in cell.windows(2) {
                add_edge(w[0], w[1], &mut edges);
            }
            // Columns left to right
            if let Some(tail) = previous_tail {
                add_edge(tail, cell[0], &mut edges);
            }
            previous_tail = cell.last().copied();

            // The separator above the band precedes it, the one below follows it
            if band > 0 {
                add_edge(separators[band - 1], cell[0], &mut edges);
            }
            if let (Some(&below), Some(&last)) = (separators.get(band), cell.last()) {
                add_edge(last, below, &mut edges);
            }
        }
    }

    let mut heap: BinaryHeap<Reverse<(OrderKey, usize)>> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(|i| Reverse((keys[i], i)))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse((_, i))) = heap.pop() {
        order.push(i);
        for &next in &edges[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                heap.push(Reverse((keys[next], next)));
            }
        }
    }

    if order.len() < n {
        log::warn!(
            "reading order: cycle among {} blocks, appending by position",
            n - order.len()
        );
        let mut rest: Vec<usize> = (0..n).filter(|i| !order.contains(i)).collect();
        rest.sort_by_key(|&i| keys[i]);
        order.extend(rest);
    }

    order
}
