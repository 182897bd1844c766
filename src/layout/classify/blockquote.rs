//! Blockquote detection from indentation.

use std::collections::BTreeMap;

use super::code::CodeClassifier;
use super::list::parse_marker;
use super::{Classifier, Hypothesis, Label, PageContext};
use crate::layout::lines::Run;

/// Classifies full lines indented well past the region's usual left edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockquoteClassifier;

impl Classifier for BlockquoteClassifier {
    fn name(&self) -> &'static str {
        "blockquote"
    }

    fn classify(&self, runs: &[Run], ctx: &PageContext<'_>) -> Vec<Option<Hypothesis>> {
        let mut out = vec![None; runs.len()];

        let plain: Vec<bool> = runs
            .iter()
            .map(|run| {
                run.isolated
                    && parse_marker(&run.text()).is_none()
                    && CodeClassifier.score(run, ctx).is_none()
            })
            .collect();

        let Some(indent) = modal_indent(runs.iter().zip(&plain).filter(|(_, p)| **p).map(|(r, _)| r)) else {
            return out;
        };

        let left = runs.iter().map(|r| r.bbox.x0).fold(f32::INFINITY, f32::min);
        let right = runs.iter().map(|r| r.bbox.x1).fold(f32::NEG_INFINITY, f32::max);
        let content_width = right - left;
        let unit = ctx.options.blockquote_indent_em * ctx.typography.body_font_size;
        if content_width <= 0.0 || unit <= 0.0 {
            return out;
        }

        for (i, run) in runs.iter().enumerate() {
            if !plain[i] || run.bbox.width() < content_width * 0.5 {
                continue;
            }
            let excess = run.bbox.x0 - indent - unit;
            if excess > 0.0 {
                let confidence = (0.5 + 0.5 * excess / unit).min(1.0);
                out[i] = Some(Hypothesis::new(Label::Blockquote, confidence));
            }
        }
        out
    }
}

/// Most common left edge (to the nearest point) of a set of runs; ties go
/// to the leftmost.
fn modal_indent<'a>(runs: impl Iterator<Item = &'a Run>) -> Option<f32> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for run in runs {
        *counts.entry(run.bbox.x0.round() as i32).or_insert(0) += 1;
    }
    let mut best: Option<(i32, usize)> = None;
    for (&x, &count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((x, count));
        }
    }
    best.map(|(x, _)| x as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::columns::ColumnLayout;
    use crate::layout::lines::group_runs;
    use crate::layout::{DocumentTypography, LayoutOptions};
    use crate::model::{BBox, Fragment};

    fn frag(text: &str, x0: f32, y0: f32) -> Fragment {
        let width = text.chars().count() as f32 * 6.0;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + 12.0), "Times", 12.0)
    }

    fn classify(frags: Vec<Fragment>) -> Vec<Option<Hypothesis>> {
        let typography = DocumentTypography::default();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typography,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        BlockquoteClassifier.classify(&group_runs(frags, None), &ctx)
    }

    #[test]
    fn test_indented_lines_are_quotes() {
        let body = "Body text that fills most of the column width here";
        let quote = "Quoted words that are indented on the page";
        let mut frags: Vec<Fragment> = (0..4).map(|i| frag(body, 50.0, 100.0 + i as f32 * 14.0)).collect();
        frags.push(frag(quote, 80.0, 170.0));
        frags.push(frag(quote, 80.0, 184.0));

        let hyps = classify(frags);
        assert!(hyps[..4].iter().all(|h| h.is_none()));
        // excess = 30 - 18 = 12 over a unit of 18
        let expected = 0.5 + 0.5 * 12.0 / 18.0;
        assert!((hyps[4].as_ref().map(|h| h.confidence).unwrap_or(0.0) - expected).abs() < 1e-4);
        assert!(hyps[5].is_some());
    }

    #[test]
    fn test_first_line_indent_is_not_a_quote() {
        let body = "Body text that fills most of the column width here";
        let mut frags = vec![frag(body, 62.0, 100.0)];
        frags.extend((1..4).map(|i| frag(body, 50.0, 100.0 + i as f32 * 14.0)));
        assert!(classify(frags).iter().all(|h| h.is_none()));
    }

    #[test]
    fn test_short_indented_line_is_not_a_quote() {
        let body = "Body text that fills most of the column width here";
        let mut frags: Vec<Fragment> = (0..4).map(|i| frag(body, 50.0, 100.0 + i as f32 * 14.0)).collect();
        frags.push(frag("short", 100.0, 170.0));
        assert!(classify(frags)[4].is_none());
    }

    #[test]
    fn test_indented_list_item_is_not_a_quote() {
        let body = "Body text that fills most of the column width here";
        let mut frags: Vec<Fragment> = (0..4).map(|i| frag(body, 50.0, 100.0 + i as f32 * 14.0)).collect();
        frags.push(frag("• An indented bullet item with enough words in it", 90.0, 170.0));
        assert!(classify(frags)[4].is_none());
    }
}
