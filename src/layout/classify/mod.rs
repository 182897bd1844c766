//! Signal classifiers.
//!
//! Each classifier looks at the runs of one page region (a column or the
//! full-width band) and proposes at most one hypothesis per run. The
//! aggregator accepts hypotheses by the order of [`default_classifiers`],
//! which is the priority order: code, list, heading, blockquote. Tables are
//! claimed earlier, before runs exist; anything unclaimed is a paragraph.

mod blockquote;
mod code;
mod heading;
mod list;

pub use blockquote::BlockquoteClassifier;
pub use code::{code_lines, guess_language, CodeClassifier};
pub use heading::HeadingClassifier;
pub use list::{parse_marker, ListClassifier};

use super::columns::ColumnLayout;
use super::lines::Run;
use super::options::LayoutOptions;
use super::typography::DocumentTypography;
use crate::model::{BBox, ListMarker};

/// Read-only state shared by all classifiers of a page.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Document-wide font statistics
    pub typography: &'a DocumentTypography,
    /// Analysis options
    pub options: &'a LayoutOptions,
    /// Detected columns of the page
    pub columns: &'a ColumnLayout,
    /// Page bounds
    pub page: BBox,
}

/// What a classifier thinks a run is.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// Preformatted code line
    Code,
    /// First line of a list item
    ListItem {
        /// The item marker
        marker: ListMarker,
        /// Nesting depth (0-5)
        depth: u8,
    },
    /// Unmarked line that belongs to the list item above it
    ListContinuation,
    /// Heading line
    Heading {
        /// Heading level (1-6)
        level: u8,
    },
    /// Indented quotation line
    Blockquote,
}

/// A labelled guess with its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Proposed label
    pub label: Label,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl Hypothesis {
    /// Create a hypothesis, clamping the confidence.
    pub fn new(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A block classifier.
///
/// Implementations are pure functions of their inputs.
pub trait Classifier: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Propose one hypothesis (or none) per run; the result has the same
    /// length as `runs`.
    fn classify(&self, runs: &[Run], ctx: &PageContext<'_>) -> Vec<Option<Hypothesis>>;
}

/// Classifiers in priority order.
pub fn default_classifiers() -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(CodeClassifier),
        Box::new(ListClassifier),
        Box::new(HeadingClassifier),
        Box::new(BlockquoteClassifier),
    ]
}

/// Run every classifier over a region, collecting hypotheses per run in
/// priority order.
pub fn classify_region(
    classifiers: &[Box<dyn Classifier>],
    runs: &[Run],
    ctx: &PageContext<'_>,
) -> Vec<Vec<Hypothesis>> {
    let mut per_run: Vec<Vec<Hypothesis>> = vec![Vec::new(); runs.len()];
    for classifier in classifiers {
        let results = classifier.classify(runs, ctx);
        let found = results.iter().filter(|h| h.is_some()).count();
        if found > 0 {
            log::debug!("{}: {} of {} runs", classifier.name(), found, runs.len());
        }
        for (slot, hypothesis) in per_run.iter_mut().zip(results) {
            if let Some(h) = hypothesis {
                slot.push(h);
            }
        }
    }
    per_run
}
