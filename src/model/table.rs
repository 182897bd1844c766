//! Table types.

use serde::{Deserialize, Serialize};

use super::BBox;

/// How a table was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStrategy {
    /// Cells are bounded by ruling lines and rectangle edges
    Lattice,
    /// Cells are inferred from whitespace alignment of text
    Stream,
}

/// A detected table grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    /// Rows in the table, each with exactly `column_count()` cells
    pub rows: Vec<TableRow>,

    /// Whether the first row is a header row
    pub header_row: bool,

    /// Recognition strategy
    pub strategy: TableStrategy,

    /// Vertical cell boundaries, left to right (`column_count() + 1` values)
    pub column_edges: Vec<f32>,

    /// Horizontal cell boundaries, top to bottom (`row_count() + 1` values)
    pub row_edges: Vec<f32>,

    /// Table caption, set when a caption is linked to the table
    #[serde(default)]
    pub caption: Option<String>,
}

impl TableGrid {
    /// Create a grid from its rows and boundaries.
    pub fn new(
        rows: Vec<TableRow>,
        strategy: TableStrategy,
        column_edges: Vec<f32>,
        row_edges: Vec<f32>,
    ) -> Self {
        Self {
            rows,
            header_row: false,
            strategy,
            column_edges,
            row_edges,
            caption: None,
        }
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (based on first row).
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a cell by row and column.
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Get header rows.
    pub fn header(&self) -> &[TableRow] {
        let n = usize::from(self.header_row).min(self.rows.len());
        &self.rows[..n]
    }

    /// Get body rows (non-header).
    pub fn body(&self) -> &[TableRow] {
        let n = usize::from(self.header_row).min(self.rows.len());
        &self.rows[n..]
    }

    /// Every row has the same number of cells, there are at least two rows
    /// and two columns, and the boundaries match the shape.
    pub fn is_rectangular(&self) -> bool {
        let cols = self.column_count();
        self.rows.len() >= 2
            && cols >= 2
            && self.rows.iter().all(|r| r.cells.len() == cols)
            && self.column_edges.len() == cols + 1
            && self.row_edges.len() == self.rows.len() + 1
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in the row
    pub cells: Vec<TableCell>,

    /// Whether this is a header row
    pub is_header: bool,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            is_header: false,
        }
    }

    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell bounds
    pub bbox: BBox,

    /// Cell text, fragments joined in reading order
    pub text: String,

    /// Indices into the table block's `source_fragments`
    #[serde(default)]
    pub fragments: Vec<usize>,
}

impl TableCell {
    /// Create an empty cell.
    pub fn empty(bbox: BBox) -> Self {
        Self {
            bbox,
            text: String::new(),
            fragments: Vec::new(),
        }
    }

    /// Check if the cell has no text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
