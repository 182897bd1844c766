//! Layout analysis.
//!
//! Turns a page's positioned fragments into typed blocks in reading order.
//! The pipeline per page is: sanitize, detect tables, detect columns, group
//! runs, classify, aggregate, link captions and footnotes, resolve order.

pub mod aggregate;
pub mod classify;
pub mod columns;
pub mod engine;
pub mod lines;
pub mod linker;
pub mod options;
pub mod reading_order;
pub mod table_detector;
pub mod typography;

use std::cmp::Ordering;

pub use columns::{detect_columns, ColumnLayout, Gutter};
pub use engine::LayoutEngine;
pub use lines::{group_lines, group_runs, Run};
pub use options::{normalize_family, LayoutOptions};
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig};
pub use typography::{DocumentTypography, FontHistogram, SizeCluster};

/// Median of a slice, `None` when empty.
pub(crate) fn median(values: &[f32]) -> Option<f32> {
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[f32::NAN, 2.0]), Some(2.0));
    }
}
