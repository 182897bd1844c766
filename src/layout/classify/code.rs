//! Code block detection from monospaced fonts.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Classifier, Hypothesis, Label, PageContext};
use crate::layout::lines::{group_lines, join_fragments, Run};
use crate::model::Fragment;

/// Family name fragments that usually denote a fixed-pitch face.
const MONOSPACE_HINTS: &[&str] = &["mono", "courier", "code", "console", "typewriter", "fixed"];

/// Keyword signatures for the language guess, checked in order.
static LANGUAGE_HINTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("rust", r"\b(fn\s+\w+|let\s+mut|impl\b|pub\s+fn|use\s+std::|match\s+\w+\s*\{)"),
        ("python", r"(^|\n)\s*(def\s+\w+\(|import\s+\w+|from\s+\w+\s+import|class\s+\w+:|elif\b)"),
        ("go", r"(\bfunc\s+\w+\(|\bpackage\s+\w+|\w\s*:=)"),
        ("javascript", r"(\bfunction\s+\w*\(|\bconst\s+\w+\s*=|\)\s*=>|\bconsole\.log)"),
        ("java", r"\b(public\s+(static\s+)?(class|void)|System\.out\.println)"),
        ("c", r"(#include\s*<|\bint\s+main\s*\(|printf\s*\()"),
        ("sql", r"(?i)\b(select\s+.+\s+from|insert\s+into|create\s+table)\b"),
        ("shell", r"(^|\n)\s*(\$\s+\w+|#!/bin/(ba)?sh|echo\s+)"),
    ]
    .into_iter()
    .map(|(lang, pattern)| (lang, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Classifies runs set in a monospaced font.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeClassifier;

impl CodeClassifier {
    /// Confidence that a run is code, from its font.
    pub fn score(&self, run: &Run, ctx: &PageContext<'_>) -> Option<f32> {
        let family = run.font_family.to_lowercase();
        let signals = [
            (ctx.options.is_monospace_family(&run.font_family), 1.0),
            (run.is_monospace, 0.9),
            (MONOSPACE_HINTS.iter().any(|hint| family.contains(hint)), 0.6),
        ];
        signals
            .iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, confidence)| *confidence)
            .reduce(f32::max)
    }
}

impl Classifier for CodeClassifier {
    fn name(&self) -> &'static str {
        "code"
    }

    fn classify(&self, runs: &[Run], ctx: &PageContext<'_>) -> Vec<Option<Hypothesis>> {
        runs.iter()
            .map(|run| {
                self.score(run, ctx)
                    .map(|confidence| Hypothesis::new(Label::Code, confidence))
            })
            .collect()
    }
}

/// Rebuild the lines of a code block, restoring leading indentation from
/// the x offset of each line.
pub fn code_lines(fragments: &[Fragment]) -> Vec<String> {
    let lines = group_lines(fragments.to_vec());
    let Some(min_x) = lines
        .iter()
        .filter_map(|line| line.first().map(|f| f.bbox.x0))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    else {
        return Vec::new();
    };

    let widths: Vec<f32> = fragments.iter().map(|f| f.char_width()).collect();
    let advance = crate::layout::median(&widths).unwrap_or(0.0);

    lines
        .iter()
        .map(|line| {
            let x0 = line.first().map(|f| f.bbox.x0).unwrap_or(min_x);
            let indent = if advance > 0.0 {
                ((x0 - min_x) / advance).round().max(0.0) as usize
            } else {
                0
            };
            format!("{}{}", " ".repeat(indent), join_fragments(line.iter()).trim_end())
        })
        .collect()
}

/// Guess the language of a code block from keywords.
pub fn guess_language(lines: &[String]) -> Option<String> {
    let source = lines.join("\n");
    LANGUAGE_HINTS
        .iter()
        .find(|(_, re)| re.is_match(&source))
        .map(|(lang, _)| lang.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::columns::ColumnLayout;
    use crate::layout::{DocumentTypography, LayoutOptions};
    use crate::model::BBox;

    fn mono(text: &str, x0: f32, y0: f32, family: &str) -> Fragment {
        let width = text.chars().count() as f32 * 6.0;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + 10.0), family, 10.0)
    }

    fn score(frag: Fragment) -> Option<f32> {
        let typography = DocumentTypography::default();
        let options = LayoutOptions::default();
        let columns = ColumnLayout::single(0.0, 600.0);
        let ctx = PageContext {
            typography: &typography,
            options: &options,
            columns: &columns,
            page: BBox::new(0.0, 0.0, 612.0, 792.0),
        };
        CodeClassifier.score(&Run::from_fragments(vec![frag], None, 0), &ctx)
    }

    #[test]
    fn test_signal_strengths() {
        assert_eq!(score(mono("x", 0.0, 0.0, "ABCDEF+Courier-Bold")), Some(1.0));
        assert_eq!(score(mono("x", 0.0, 0.0, "Unknown").with_monospace(true)), Some(0.9));
        assert_eq!(score(mono("x", 0.0, 0.0, "PragmataPro Mono")), Some(0.6));
        assert_eq!(score(mono("x", 0.0, 0.0, "Times-Roman")), None);
    }

    #[test]
    fn test_code_lines_indentation() {
        let frags = vec![
            mono("fn main() {", 50.0, 100.0, "Courier"),
            mono("println!(\"hi\");", 74.0, 112.0, "Courier"),
            mono("}", 50.0, 124.0, "Courier"),
        ];
        let lines = code_lines(&frags);
        assert_eq!(lines, vec!["fn main() {", "    println!(\"hi\");", "}"]);
        assert_eq!(guess_language(&lines).as_deref(), Some("rust"));
    }

    #[test]
    fn test_guess_language() {
        let lines = vec!["def greet(name):".to_string(), "    return name".to_string()];
        assert_eq!(guess_language(&lines).as_deref(), Some("python"));
        let lines = vec!["SELECT id FROM users".to_string()];
        assert_eq!(guess_language(&lines).as_deref(), Some("sql"));
        assert_eq!(guess_language(&["hello".to_string()]), None);
    }
}
