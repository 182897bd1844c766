//! Block aggregation.
//!
//! Picks one label per run from the classifier hypotheses and merges
//! consecutive runs of a region into blocks.

use super::classify::{code_lines, guess_language, Hypothesis, Label, PageContext};
use super::lines::Run;
use super::options::normalize_family;
use crate::model::{Block, BlockId, BlockKind, Fragment, ListMarker};

/// Maximum line pitch for merging, in median pitches of the region.
const MERGE_PITCH_FACTOR: f32 = 1.5;

/// Maximum line pitch for merging code lines, in median pitches.
const CODE_PITCH_FACTOR: f32 = 2.0;

/// Maximum font size difference between merged lines (points).
const SIZE_TOLERANCE: f32 = 1.0;

/// The label chosen for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Accepted label; `None` means paragraph
    pub label: Option<Label>,
    /// Confidence of the decision
    pub confidence: f32,
}

/// Accept the first hypothesis (in priority order) at or above the floor.
///
/// An accepted label is discounted by the strongest competing hypothesis
/// above the floor; a paragraph scores one minus the strongest rejected
/// hypothesis.
pub fn decide(hypotheses: &[Hypothesis], floor: f32) -> Decision {
    let accepted = hypotheses.iter().position(|h| h.confidence >= floor);

    match accepted {
        Some(idx) => {
            let rival = hypotheses
                .iter()
                .enumerate()
                .filter(|(i, h)| *i != idx && h.confidence >= floor)
                .map(|(_, h)| h.confidence)
                .fold(0.0f32, f32::max);
            Decision {
                label: Some(hypotheses[idx].label.clone()),
                confidence: hypotheses[idx].confidence * (1.0 - 0.5 * rival),
            }
        }
        None => {
            let strongest = hypotheses.iter().map(|h| h.confidence).fold(0.0f32, f32::max);
            Decision {
                label: None,
                confidence: 1.0 - strongest,
            }
        }
    }
}

/// Kind of a block being assembled.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Paragraph,
    Code,
    ListItem { marker: ListMarker, depth: u8 },
    Heading { level: u8 },
    Blockquote,
}

impl Pending {
    fn from_label(label: Option<Label>) -> Self {
        match label {
            Some(Label::Code) => Pending::Code,
            Some(Label::ListItem { marker, depth }) => Pending::ListItem { marker, depth },
            Some(Label::Heading { level }) => Pending::Heading { level },
            Some(Label::Blockquote) => Pending::Blockquote,
            Some(Label::ListContinuation) | None => Pending::Paragraph,
        }
    }

    /// Whether a run with this kind may extend a block of kind `self`.
    fn continues_with(&self, next: &Pending) -> bool {
        match (self, next) {
            (Pending::Paragraph, Pending::Paragraph)
            | (Pending::Code, Pending::Code)
            | (Pending::Blockquote, Pending::Blockquote) => true,
            (Pending::Heading { level: a }, Pending::Heading { level: b }) => a == b,
            // Every marker starts a new item
            _ => false,
        }
    }
}

struct OpenBlock {
    kind: Pending,
    runs: Vec<(Run, f32)>,
    min_x0: f32,
}

impl OpenBlock {
    fn new(kind: Pending, run: Run, confidence: f32) -> Self {
        let min_x0 = run.bbox.x0;
        Self {
            kind,
            runs: vec![(run, confidence)],
            min_x0,
        }
    }

    fn push(&mut self, run: Run, confidence: f32) {
        self.min_x0 = self.min_x0.min(run.bbox.x0);
        self.runs.push((run, confidence));
    }

    fn last(&self) -> Option<&Run> {
        self.runs.last().map(|(r, _)| r)
    }

    fn into_block(self) -> Block {
        let total: usize = self.runs.iter().map(|(r, _)| r.char_count()).sum();
        let confidence = if total > 0 {
            self.runs
                .iter()
                .map(|(r, c)| c * r.char_count() as f32)
                .sum::<f32>()
                / total as f32
        } else {
            self.runs.iter().map(|(_, c)| c).sum::<f32>() / self.runs.len().max(1) as f32
        };

        let fragments: Vec<Fragment> = self.runs.into_iter().flat_map(|(r, _)| r.fragments).collect();
        let kind = match self.kind {
            Pending::Paragraph => BlockKind::Paragraph,
            Pending::Code => {
                let lines = code_lines(&fragments);
                BlockKind::CodeBlock {
                    language: guess_language(&lines),
                    lines,
                }
            }
            Pending::ListItem { marker, depth } => BlockKind::ListItem { marker, depth },
            Pending::Heading { level } => BlockKind::Heading { level },
            Pending::Blockquote => BlockKind::Blockquote,
        };

        Block::new(BlockId(0), kind, fragments, confidence)
    }
}

/// Merge the runs of one region into blocks.
///
/// `hypotheses[i]` holds the hypotheses for `runs[i]` in priority order.
/// Returned blocks carry placeholder IDs.
pub fn aggregate_region(runs: Vec<Run>, hypotheses: Vec<Vec<Hypothesis>>, ctx: &PageContext<'_>) -> Vec<Block> {
    let floor = ctx.options.min_classifier_confidence;
    let body = ctx.typography.body_font_size;
    let median_pitch = region_pitch(&runs);

    let mut blocks = Vec::new();
    let mut open: Option<OpenBlock> = None;

    for (run, hyps) in runs.into_iter().zip(hypotheses) {
        let decision = decide(&hyps, floor);
        let continuation = decision.label == Some(Label::ListContinuation);
        let kind = Pending::from_label(decision.label);

        let joins = match &open {
            Some(block) if continuation && matches!(block.kind, Pending::ListItem { .. }) => true,
            Some(block) => block.kind.continues_with(&kind) && is_close(block, &run, median_pitch, body),
            None => false,
        };

        if joins {
            if let Some(block) = open.as_mut() {
                block.push(run, decision.confidence);
            }
            continue;
        }

        if let Some(block) = open.take() {
            blocks.push(block.into_block());
        }
        open = Some(OpenBlock::new(kind, run, decision.confidence));
    }

    if let Some(block) = open {
        blocks.push(block.into_block());
    }
    blocks
}

/// Whether `run` is close and similar enough to extend `block`.
fn is_close(block: &OpenBlock, run: &Run, median_pitch: Option<f32>, body: f32) -> bool {
    let Some(last) = block.last() else {
        return false;
    };

    if normalize_family(&last.font_family) != normalize_family(&run.font_family)
        || (last.font_size - run.font_size).abs() > SIZE_TOLERANCE
    {
        return false;
    }

    if run.line == last.line {
        return true;
    }

    let (pitch_factor, gap_factor) = match block.kind {
        Pending::Code => (CODE_PITCH_FACTOR, 2.0),
        _ => (MERGE_PITCH_FACTOR, 1.0),
    };

    let pitch = run.bbox.y0 - last.bbox.y0;
    let gap = run.bbox.y0 - last.bbox.y1;
    if pitch <= 0.0 || gap > last.font_size * gap_factor {
        return false;
    }
    if let Some(median) = median_pitch {
        if pitch > median * pitch_factor {
            return false;
        }
    }

    // A paragraph's indented first line starts a new paragraph
    !(block.kind == Pending::Paragraph && run.bbox.x0 > block.min_x0 + 0.5 * body)
}

/// Median distance between the tops of consecutive lines of a region.
fn region_pitch(runs: &[Run]) -> Option<f32> {
    let mut tops: Vec<(usize, f32)> = Vec::new();
    for run in runs {
        match tops.last_mut() {
            Some((line, top)) if *line == run.line => *top = top.min(run.bbox.y0),
            _ => tops.push((run.line, run.bbox.y0)),
        }
    }
    let pitches: Vec<f32> = tops
        .windows(2)
        .map(|w| w[1].1 - w[0].1)
        .filter(|p| *p > 0.0)
        .collect();
    super::median(&pitches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::classify::{classify_region, default_classifiers};
    use crate::layout::columns::ColumnLayout;
    use crate::layout::lines::group_runs;
    use crate::layout::{DocumentTypography, LayoutOptions};
    use crate::model::BBox;

    fn frag(text: &str, x0: f32, y0: f32, size: f32, family: &str) -> Fragment {
        let width = text.chars().count() as f32 * size * 0.5;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + size), family, size)
    }

    fn aggregate(frags: Vec<Fragment>) -> Vec<Block> {
        let typography = DocumentTypography::profile(frags.iter());
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typography,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        let runs = group_runs(frags, Some(0));
        let hyps = classify_region(&default_classifiers(), &runs, &ctx);
        aggregate_region(runs, hyps, &ctx)
    }

    fn hyp(label: Label, confidence: f32) -> Hypothesis {
        Hypothesis::new(label, confidence)
    }

    #[test]
    fn test_decide_priority_and_discount() {
        let decision = decide(&[hyp(Label::Code, 0.9), hyp(Label::Heading { level: 1 }, 0.6)], 0.5);
        assert_eq!(decision.label, Some(Label::Code));
        assert!((decision.confidence - 0.9 * 0.7).abs() < 1e-5);

        let decision = decide(&[hyp(Label::Code, 0.4), hyp(Label::Blockquote, 0.8)], 0.5);
        assert_eq!(decision.label, Some(Label::Blockquote));
        assert!((decision.confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_decide_paragraph_fallback() {
        let decision = decide(&[hyp(Label::Heading { level: 2 }, 0.3)], 0.5);
        assert_eq!(decision.label, None);
        assert!((decision.confidence - 0.7).abs() < 1e-5);
        assert_eq!(decide(&[], 0.5).confidence, 1.0);
    }

    #[test]
    fn test_paragraph_lines_merge() {
        let blocks = aggregate(vec![
            frag("First line of a paragraph", 50.0, 100.0, 10.0, "Times"),
            frag("second line of a paragraph", 50.0, 112.0, 10.0, "Times"),
            frag("third line of a paragraph", 50.0, 124.0, 10.0, "Times"),
            frag("A new paragraph after a gap", 50.0, 150.0, 10.0, "Times"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].lines().len(), 3);
        assert_eq!(blocks[1].text(), "A new paragraph after a gap");
    }

    #[test]
    fn test_indented_first_line_starts_paragraph() {
        let blocks = aggregate(vec![
            frag("End of the previous paragraph", 50.0, 100.0, 10.0, "Times"),
            frag("Indented start of the next one", 60.0, 112.0, 10.0, "Times"),
            frag("and its second line of text", 50.0, 124.0, 10.0, "Times"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].lines().len(), 2);
    }

    #[test]
    fn test_code_then_paragraph() {
        let mut frags: Vec<Fragment> = ["fn main() {", "    let x = 1;", "    println!(\"{}\", x);", "}"]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let indent = line.len() - line.trim_start().len();
                frag(line.trim_start(), 50.0 + indent as f32 * 5.0, 100.0 + i as f32 * 12.0, 10.0, "Courier")
            })
            .collect();
        frags.push(frag("Plain prose follows the listing here.", 50.0, 150.0, 10.0, "Times"));
        frags.push(frag("More prose so that body text dominates.", 50.0, 162.0, 10.0, "Times"));

        let blocks = aggregate(frags);
        assert_eq!(blocks.len(), 2);
        match &blocks[0].kind {
            BlockKind::CodeBlock { lines, language } => {
                assert_eq!(lines.len(), 4);
                assert_eq!(lines[1], "    let x = 1;");
                assert_eq!(language.as_deref(), Some("rust"));
            }
            other => panic!("expected code block, got {:?}", other),
        }
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_list_items_stay_separate() {
        let blocks = aggregate(vec![
            frag("• First item", 50.0, 100.0, 10.0, "Times"),
            frag("wrapped text", 60.0, 112.0, 10.0, "Times"),
            frag("• Second item", 50.0, 124.0, 10.0, "Times"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0].kind, BlockKind::ListItem { .. }));
        assert_eq!(blocks[0].text(), "• First item wrapped text");
        assert!(matches!(blocks[1].kind, BlockKind::ListItem { .. }));
    }

    #[test]
    fn test_family_change_forces_boundary() {
        let blocks = aggregate(vec![
            frag("Serif paragraph line one", 50.0, 100.0, 10.0, "Times"),
            frag("Sans paragraph line two", 50.0, 112.0, 10.0, "Helvetica"),
        ]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_merged_confidence_is_char_weighted() {
        let blocks = aggregate(vec![
            frag("A plain paragraph line", 50.0, 100.0, 10.0, "Times"),
            frag("continuing the same paragraph", 50.0, 112.0, 10.0, "Times"),
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].confidence, 1.0);
    }
}
