//! Page-local geometry.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in page units.
///
/// The origin is the top-left corner of the page and `y` grows downward,
/// so `y0` is the top edge and `y1` the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// All coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Finite with strictly positive width and height.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.x0 < self.x1 && self.y0 < self.y1
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union of a sequence of boxes, `None` when empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BBox>, b| match acc {
                Some(a) => Some(a.union(b)),
                None => Some(*b),
            })
    }

    /// Length of the overlap of the x-projections (0 when disjoint).
    pub fn horizontal_overlap(&self, other: &BBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Length of the overlap of the y-projections (0 when disjoint).
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Whether `other` lies inside this box, allowing `tolerance` on every edge.
    pub fn contains(&self, other: &BBox, tolerance: f32) -> bool {
        other.x0 >= self.x0 - tolerance
            && other.y0 >= self.y0 - tolerance
            && other.x1 <= self.x1 + tolerance
            && other.y1 <= self.y1 + tolerance
    }

    /// Clamp this box into `bounds`.
    pub fn clamp_to(&self, bounds: &BBox) -> BBox {
        let x0 = self.x0.clamp(bounds.x0, bounds.x1);
        let y0 = self.y0.clamp(bounds.y0, bounds.y1);
        BBox {
            x0,
            y0,
            x1: self.x1.clamp(x0, bounds.x1),
            y1: self.y1.clamp(y0, bounds.y1),
        }
    }
}
