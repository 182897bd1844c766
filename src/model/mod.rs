//! Data model shared by the layout pipeline.
//!
//! Inputs ([`Fragment`], [`Graphic`], [`PageInput`], [`DocumentInput`]) are
//! what the extraction layer hands over; outputs ([`Block`], [`PageLayout`],
//! [`DocumentLayout`]) are what the engine produces. Everything serializes
//! with serde.

mod block;
mod document;
mod fragment;
mod geometry;
mod page;
mod table;

pub use block::{Block, BlockId, BlockKind, ListMarker, MarkerKind};
pub use document::{DocumentInput, DocumentLayout};
pub use fragment::{Fragment, FragmentDefect, Graphic, GraphicKind, Rgb};
pub use geometry::BBox;
pub use page::{Column, LayoutWarning, PageInput, PageLayout};
pub use table::{TableCell, TableGrid, TableRow, TableStrategy};
