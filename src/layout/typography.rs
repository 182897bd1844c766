//! Document-wide font statistics.
//!
//! The profile is computed once per document from every fragment and then
//! passed by reference to every classifier; nothing here is global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Fragment;

/// Body size used when a document has no text at all.
pub const DEFAULT_BODY_SIZE: f32 = 12.0;

/// Maximum number of heading size clusters.
pub const MAX_CLUSTERS: usize = 6;

/// Consecutive sizes further apart than this ratio start a new cluster.
const CLUSTER_SPLIT_RATIO: f32 = 1.15;

/// Clusters closer than this ratio share a heading level.
const LEVEL_TIE_RATIO: f32 = 1.05;

/// Font size bucket at 0.1pt precision.
pub fn size_bucket(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    chars: usize,
    fragments: usize,
}

/// Character-weighted histogram of font sizes.
#[derive(Debug, Clone, Default)]
pub struct FontHistogram {
    buckets: BTreeMap<i32, Bucket>,
}

impl FontHistogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fragment's worth of text at a size.
    pub fn add_size(&mut self, size: f32, chars: usize) {
        if !size.is_finite() || size <= 0.0 || chars == 0 {
            return;
        }
        let bucket = self.buckets.entry(size_bucket(size)).or_default();
        bucket.chars += chars;
        bucket.fragments += 1;
    }

    /// Add a fragment.
    pub fn add_fragment(&mut self, fragment: &Fragment) {
        let chars = fragment.text.chars().filter(|c| !c.is_whitespace()).count();
        self.add_size(fragment.font_size, chars);
    }

    /// Check if nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Compute body size and heading clusters.
    pub fn analyze(&self) -> DocumentTypography {
        let mut body: Option<(i32, Bucket)> = None;
        for (&key, &bucket) in &self.buckets {
            let better = match body {
                None => true,
                Some((_, best)) => {
                    (bucket.chars, bucket.fragments) > (best.chars, best.fragments)
                }
            };
            if better {
                body = Some((key, bucket));
            }
        }

        let Some((body_key, _)) = body else {
            return DocumentTypography::default();
        };
        let body_font_size = body_key as f32 / 10.0;

        let mut size_clusters: Vec<SizeCluster> = Vec::new();
        for (&key, bucket) in self.buckets.range(body_key + 1..).rev() {
            let size = key as f32 / 10.0;
            let full = size_clusters.len() >= MAX_CLUSTERS;
            if let Some(last) = size_clusters.last_mut() {
                if full || last.size / size <= CLUSTER_SPLIT_RATIO {
                    last.count += bucket.chars;
                    continue;
                }
            }
            size_clusters.push(SizeCluster {
                size,
                count: bucket.chars,
                level: 0,
            });
        }

        let mut prev: Option<(f32, u8)> = None;
        for cluster in &mut size_clusters {
            let level = match prev {
                Some((prev_size, prev_level)) if prev_size / cluster.size <= LEVEL_TIE_RATIO => {
                    prev_level
                }
                Some((_, prev_level)) => (prev_level + 1).min(6),
                None => 1,
            };
            cluster.level = level;
            prev = Some((cluster.size, level));
        }

        let typography = DocumentTypography {
            body_font_size,
            size_clusters,
            fragment_count: self.buckets.values().map(|b| b.fragments).sum(),
            char_count: self.buckets.values().map(|b| b.chars).sum(),
        };
        log::debug!(
            "typography: body {:.1}pt, {} heading clusters",
            typography.body_font_size,
            typography.size_clusters.len()
        );
        typography
    }
}

/// A group of font sizes larger than the body size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeCluster {
    /// Representative (largest) size of the cluster
    pub size: f32,
    /// Number of characters set in this cluster
    pub count: usize,
    /// Heading level assigned to the cluster (1-6)
    pub level: u8,
}

/// Font statistics of a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypography {
    /// Body text font size (largest character weight)
    pub body_font_size: f32,
    /// Heading size clusters, largest first
    pub size_clusters: Vec<SizeCluster>,
    /// Number of fragments profiled
    #[serde(default)]
    pub fragment_count: usize,
    /// Number of characters profiled
    #[serde(default)]
    pub char_count: usize,
}

impl Default for DocumentTypography {
    fn default() -> Self {
        Self {
            body_font_size: DEFAULT_BODY_SIZE,
            size_clusters: Vec::new(),
            fragment_count: 0,
            char_count: 0,
        }
    }
}

impl DocumentTypography {
    /// Profile a set of fragments.
    pub fn profile<'a, I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = &'a Fragment>,
    {
        let mut histogram = FontHistogram::new();
        for fragment in fragments {
            if fragment.check().is_ok() {
                histogram.add_fragment(fragment);
            }
        }
        histogram.analyze()
    }

    /// Ratio of a size to the body size.
    pub fn ratio(&self, size: f32) -> f32 {
        size / self.body_font_size
    }

    /// Check if a size falls in the body bucket or below it.
    pub fn is_body_or_smaller(&self, size: f32) -> bool {
        size_bucket(size) <= size_bucket(self.body_font_size)
    }

    /// Heading level for a size larger than the body size.
    ///
    /// Uses the nearest size cluster (ties go to the larger cluster), or a
    /// ratio band when the document has no clusters.
    pub fn level_for(&self, size: f32) -> u8 {
        let nearest = self.size_clusters.iter().fold(None, |best: Option<&SizeCluster>, c| {
            match best {
                Some(b) if (b.size - size).abs() <= (c.size - size).abs() => Some(b),
                _ => Some(c),
            }
        });

        match nearest {
            Some(cluster) => cluster.level.clamp(1, 6),
            None => {
                let ratio = self.ratio(size);
                if ratio >= 2.0 {
                    1
                } else if ratio >= 1.6 {
                    2
                } else if ratio >= 1.3 {
                    3
                } else {
                    4
                }
            }
        }
    }
}
