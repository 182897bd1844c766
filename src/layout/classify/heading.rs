//! Heading detection from font size and weight.

use super::{Classifier, Hypothesis, Label, PageContext};
use crate::layout::lines::Run;

/// Classifies runs that are set larger than body text, or bold and alone on
/// their line.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingClassifier;

impl HeadingClassifier {
    /// Classify a single run.
    pub fn classify_run(&self, run: &Run, ctx: &PageContext<'_>) -> Option<Hypothesis> {
        let typography = ctx.typography;
        let size = run.font_size;
        if typography.is_body_or_smaller(size) {
            return None;
        }

        let threshold = ctx.options.heading_font_ratio;
        let ratio = typography.ratio(size);
        let by_size = ratio >= threshold;
        let by_weight = run.is_bold && run.isolated;
        if !by_size && !by_weight {
            return None;
        }

        let level = typography.level_for(size);
        let mut confidence = (0.5 + 0.5 * (ratio - 1.0) / (threshold - 1.0)).min(1.0);
        if run.is_bold {
            confidence += 0.1;
        }

        Some(Hypothesis::new(Label::Heading { level }, confidence.min(1.0)))
    }
}

impl Classifier for HeadingClassifier {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn classify(&self, runs: &[Run], ctx: &PageContext<'_>) -> Vec<Option<Hypothesis>> {
        runs.iter().map(|run| self.classify_run(run, ctx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::columns::ColumnLayout;
    use crate::layout::{DocumentTypography, LayoutOptions};
    use crate::model::{BBox, Fragment};

    fn run(text: &str, size: f32, bold: bool) -> Run {
        let width = text.chars().count() as f32 * size * 0.5;
        let frag = Fragment::new(text, BBox::new(50.0, 100.0, 50.0 + width, 100.0 + size), "Times", size)
            .with_bold(bold);
        Run::from_fragments(vec![frag], Some(0), 0)
    }

    fn typography() -> DocumentTypography {
        let frags = [
            Fragment::new("body text body text body text", BBox::new(0.0, 0.0, 100.0, 12.0), "Times", 12.0),
            Fragment::new("T", BBox::new(0.0, 0.0, 10.0, 24.0), "Times", 24.0),
            Fragment::new("S", BBox::new(0.0, 0.0, 10.0, 18.0), "Times", 18.0),
        ];
        DocumentTypography::profile(frags.iter())
    }

    fn level(hypothesis: Option<Hypothesis>) -> Option<u8> {
        match hypothesis?.label {
            Label::Heading { level } => Some(level),
            _ => None,
        }
    }

    #[test]
    fn test_size_based_levels() {
        let typo = typography();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typo,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        let classifier = HeadingClassifier;

        assert_eq!(level(classifier.classify_run(&run("Title", 24.0, false), &ctx)), Some(1));
        assert_eq!(level(classifier.classify_run(&run("Section", 18.0, false), &ctx)), Some(2));
        assert_eq!(level(classifier.classify_run(&run("Body", 12.0, false), &ctx)), None);
    }

    #[test]
    fn test_body_sized_bold_is_not_heading() {
        let typo = typography();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typo,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        assert!(HeadingClassifier.classify_run(&run("Bold body", 12.0, true), &ctx).is_none());
    }

    #[test]
    fn test_bold_isolated_slightly_larger() {
        let typo = typography();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typo,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        let h = HeadingClassifier.classify_run(&run("Subsection", 13.0, true), &ctx);
        assert!(h.is_some());
        // Not bold: 13/12 is below the ratio threshold
        assert!(HeadingClassifier.classify_run(&run("Subsection", 13.0, false), &ctx).is_none());
    }

    #[test]
    fn test_confidence() {
        let typo = typography();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typo,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        // ratio 1.5 at threshold 1.3 saturates
        let h = HeadingClassifier.classify_run(&run("Heading", 18.0, false), &ctx);
        assert!((h.map(|h| h.confidence).unwrap_or(0.0) - 1.0).abs() < 1e-4);

        let h = HeadingClassifier.classify_run(&run("Minor", 13.0, true), &ctx);
        // 0.5 + 0.5 * (1/12) / 0.3 + 0.1
        let expected = 0.5 + 0.5 * (13.0 / 12.0 - 1.0) / 0.3 + 0.1;
        assert!((h.map(|h| h.confidence).unwrap_or(0.0) - expected).abs() < 1e-4);
    }
}
