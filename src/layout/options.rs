//! Layout analysis options and configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::table_detector::TableDetectorConfig;
use crate::error::{Error, Result};

/// Options for layout analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Minimum ratio of a run's size to the body size for a heading
    pub heading_font_ratio: f32,

    /// Font families treated as monospaced, compared case-insensitively
    /// after subset prefixes and style suffixes are stripped
    pub monospace_font_families: BTreeSet<String>,

    /// Maximum distance in points below an image or table for a caption
    pub caption_proximity: f32,

    /// Tolerance in points when clustering ruling lines into a lattice
    pub table_intersection_tolerance: f32,

    /// Hypotheses below this confidence are ignored
    pub min_classifier_confidence: f32,

    /// Minimum gutter width, in median character widths
    pub column_gap_factor: f32,

    /// Fraction of fragments allowed to cross a gutter
    pub full_width_tolerance: f32,

    /// Footnotes start below this fraction of the page height
    pub footnote_zone: f32,

    /// Extra indentation of a blockquote, in body-size ems
    pub blockquote_indent_em: f32,

    /// Whether to run table detection
    pub detect_tables: bool,

    /// Whether to analyze pages in parallel
    pub parallel: bool,

    /// Stream table detection tuning
    pub table: TableDetectorConfig,
}

impl LayoutOptions {
    /// Create new layout options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heading font ratio.
    pub fn with_heading_font_ratio(mut self, ratio: f32) -> Self {
        self.heading_font_ratio = ratio;
        self
    }

    /// Add a monospace font family.
    pub fn with_monospace_family(mut self, family: impl Into<String>) -> Self {
        self.monospace_font_families.insert(normalize_family(&family.into()));
        self
    }

    /// Set the caption proximity.
    pub fn with_caption_proximity(mut self, points: f32) -> Self {
        self.caption_proximity = points;
        self
    }

    /// Set the lattice intersection tolerance.
    pub fn with_table_intersection_tolerance(mut self, points: f32) -> Self {
        self.table_intersection_tolerance = points;
        self
    }

    /// Set the minimum classifier confidence.
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_classifier_confidence = confidence;
        self
    }

    /// Set the column gap factor.
    pub fn with_column_gap_factor(mut self, factor: f32) -> Self {
        self.column_gap_factor = factor;
        self
    }

    /// Set the full-width tolerance.
    pub fn with_full_width_tolerance(mut self, tolerance: f32) -> Self {
        self.full_width_tolerance = tolerance;
        self
    }

    /// Set the footnote zone.
    pub fn with_footnote_zone(mut self, zone: f32) -> Self {
        self.footnote_zone = zone;
        self
    }

    /// Set the blockquote indentation.
    pub fn with_blockquote_indent(mut self, em: f32) -> Self {
        self.blockquote_indent_em = em;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Set the stream table detector configuration.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.table = config;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check if a font family is configured as monospaced.
    pub fn is_monospace_family(&self, family: &str) -> bool {
        !family.is_empty() && self.monospace_font_families.contains(&normalize_family(family))
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidConfig(msg.to_string()))
            }
        }

        check(
            self.heading_font_ratio.is_finite() && self.heading_font_ratio > 1.0,
            "heading_font_ratio must be greater than 1.0",
        )?;
        check(
            self.caption_proximity.is_finite() && self.caption_proximity >= 0.0,
            "caption_proximity must be non-negative",
        )?;
        check(
            self.table_intersection_tolerance.is_finite() && self.table_intersection_tolerance >= 0.0,
            "table_intersection_tolerance must be non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&self.min_classifier_confidence),
            "min_classifier_confidence must be within [0, 1]",
        )?;
        check(
            self.column_gap_factor.is_finite() && self.column_gap_factor > 0.0,
            "column_gap_factor must be positive",
        )?;
        check(
            (0.0..1.0).contains(&self.full_width_tolerance),
            "full_width_tolerance must be within [0, 1)",
        )?;
        check(
            self.footnote_zone > 0.0 && self.footnote_zone <= 1.0,
            "footnote_zone must be within (0, 1]",
        )?;
        check(
            self.blockquote_indent_em.is_finite() && self.blockquote_indent_em > 0.0,
            "blockquote_indent_em must be positive",
        )?;
        self.table.validate()
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        let monospace_font_families = [
            "courier",
            "couriernew",
            "consolas",
            "monaco",
            "menlo",
            "inconsolata",
            "dejavusansmono",
            "liberationmono",
            "sourcecodepro",
            "firacode",
            "jetbrainsmono",
            "lucidaconsole",
            "andalemono",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            heading_font_ratio: 1.3,
            monospace_font_families,
            caption_proximity: 50.0,
            table_intersection_tolerance: 3.0,
            min_classifier_confidence: 0.5,
            column_gap_factor: 3.0,
            full_width_tolerance: 0.1,
            footnote_zone: 0.85,
            blockquote_indent_em: 1.5,
            detect_tables: true,
            parallel: true,
            table: TableDetectorConfig::default(),
        }
    }
}

/// Canonical form of a font family name.
///
/// Strips a subset prefix (`ABCDEF+`), a style suffix (`-Bold`, `,Italic`,
/// `MT`, `PS`) and whitespace, then lowercases.
pub fn normalize_family(family: &str) -> String {
    let mut name = family.trim();
    if let Some((prefix, rest)) = name.split_once('+') {
        if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) {
            name = rest;
        }
    }
    if let Some(idx) = name.find([',', '-']) {
        name = &name[..idx];
    }
    let mut out: String = name
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase();
    for suffix in ["psmt", "mt", "ps"] {
        if out.len() > suffix.len() + 3 && out.ends_with(suffix) {
            out.truncate(out.len() - suffix.len());
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_options_builder() {
        let options = LayoutOptions::new()
            .with_heading_font_ratio(1.5)
            .with_caption_proximity(30.0)
            .with_min_confidence(0.6)
            .with_monospace_family("Hack")
            .with_tables(false)
            .sequential();

        assert_eq!(options.heading_font_ratio, 1.5);
        assert_eq!(options.caption_proximity, 30.0);
        assert_eq!(options.min_classifier_confidence, 0.6);
        assert!(options.is_monospace_family("Hack-Regular"));
        assert!(!options.detect_tables);
        assert!(!options.parallel);
    }

    #[test]
    fn test_default_options() {
        let options = LayoutOptions::default();
        assert_eq!(options.heading_font_ratio, 1.3);
        assert_eq!(options.table_intersection_tolerance, 3.0);
        assert_eq!(options.footnote_zone, 0.85);
        assert!(options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(LayoutOptions::new().with_heading_font_ratio(0.9).validate().is_err());
        assert!(LayoutOptions::new().with_min_confidence(1.5).validate().is_err());
        assert!(LayoutOptions::new().with_full_width_tolerance(1.0).validate().is_err());
        assert!(LayoutOptions::new().with_caption_proximity(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_normalize_family() {
        assert_eq!(normalize_family("ABCDEF+Courier-Bold"), "courier");
        assert_eq!(normalize_family("Courier New,Italic"), "couriernew");
        assert_eq!(normalize_family("CourierNewPSMT"), "couriernew");
        assert_eq!(normalize_family("DejaVu Sans Mono"), "dejavusansmono");
        assert_eq!(normalize_family("Abc+Menlo"), "abc+menlo");
    }

    #[test]
    fn test_monospace_family_lookup() {
        let options = LayoutOptions::default();
        assert!(options.is_monospace_family("XYZABC+Consolas"));
        assert!(options.is_monospace_family("Courier-Oblique"));
        assert!(!options.is_monospace_family("Times-Roman"));
        assert!(!options.is_monospace_family(""));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: LayoutOptions =
            serde_json::from_str(r#"{"heading_font_ratio": 1.6, "parallel": false}"#).unwrap();
        assert_eq!(options.heading_font_ratio, 1.6);
        assert!(!options.parallel);
        assert_eq!(options.caption_proximity, 50.0);
    }

    #[test]
    fn test_from_json_validates() {
        assert!(LayoutOptions::from_json(r#"{"caption_proximity": 20.0}"#).is_ok());
        assert!(LayoutOptions::from_json(r#"{"heading_font_ratio": 0.8}"#).is_err());
        assert!(LayoutOptions::from_json("not json").is_err());
    }
}
