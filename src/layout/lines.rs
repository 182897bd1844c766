//! Grouping fragments into visual lines and runs.
//!
//! A run is one or more fragments that sit on the same line without a wide
//! horizontal gap between them; it is the unit the classifiers look at.

use std::cmp::Ordering;

use crate::model::{BBox, Fragment};

/// Minimum vertical overlap, relative to the smaller height, for two
/// fragments to share a line.
const LINE_OVERLAP_RATIO: f32 = 0.5;

/// Gaps wider than this many average character widths split a line into runs.
const RUN_GAP_CHARS: f32 = 2.0;

/// A horizontal run of fragments on one visual line.
#[derive(Debug, Clone)]
pub struct Run {
    /// Fragments sorted by x0
    pub fragments: Vec<Fragment>,
    /// Union of the fragment boxes
    pub bbox: BBox,
    /// Dominant font size (weighted by text length)
    pub font_size: f32,
    /// Font family covering the most characters
    pub font_family: String,
    /// More than half of the characters are bold
    pub is_bold: bool,
    /// More than half of the characters are flagged fixed-pitch
    pub is_monospace: bool,
    /// The run is the only run on its visual line
    pub isolated: bool,
    /// Column index, `None` for the full-width region
    pub column: Option<usize>,
    /// Index of the visual line within the region
    pub line: usize,
}

impl Run {
    /// Create a run from fragments of one line.
    pub fn from_fragments(mut fragments: Vec<Fragment>, column: Option<usize>, line: usize) -> Self {
        fragments.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal));

        let bbox = BBox::union_all(fragments.iter().map(|f| &f.bbox)).unwrap_or_default();

        // Calculate dominant font size (weighted by text length)
        let total_chars: usize = fragments.iter().map(|f| f.char_count()).sum();
        let weighted_size: f32 = fragments
            .iter()
            .map(|f| f.font_size * f.char_count() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted_size / total_chars as f32
        } else {
            fragments.first().map(|f| f.font_size).unwrap_or(0.0)
        };

        let share = |pred: fn(&Fragment) -> bool| -> bool {
            let matching: usize = fragments
                .iter()
                .filter(|f| pred(f))
                .map(|f| f.char_count())
                .sum();
            total_chars > 0 && matching as f32 / total_chars as f32 > 0.5
        };
        let is_bold = share(|f| f.is_bold);
        let is_monospace = share(|f| f.is_monospace);

        let mut families: Vec<(&str, usize)> = Vec::new();
        for f in &fragments {
            match families.iter_mut().find(|(name, _)| *name == f.font_family) {
                Some((_, count)) => *count += f.char_count(),
                None => families.push((&f.font_family, f.char_count())),
            }
        }
        let font_family = families
            .iter()
            .fold(None, |best: Option<(&str, usize)>, &(name, count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((name, count)),
            })
            .map(|(name, _)| name.to_string())
            .unwrap_or_default();

        Self {
            fragments,
            bbox,
            font_size,
            font_family,
            is_bold,
            is_monospace,
            isolated: true,
            column,
            line,
        }
    }

    /// Get the combined text of all fragments with appropriate spacing.
    pub fn text(&self) -> String {
        join_fragments(self.fragments.iter())
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.fragments.iter().map(|f| f.char_count()).sum()
    }

    /// Median glyph advance of the run's fragments.
    pub fn char_width(&self) -> f32 {
        let widths: Vec<f32> = self.fragments.iter().map(|f| f.char_width()).collect();
        super::median(&widths).unwrap_or(self.font_size * 0.5)
    }
}

/// Group fragments of one region into runs, top to bottom, left to right.
pub fn group_runs(fragments: Vec<Fragment>, column: Option<usize>) -> Vec<Run> {
    let mut runs = Vec::new();
    for (line_idx, line) in group_lines(fragments).into_iter().enumerate() {
        let mut pieces: Vec<Vec<Fragment>> = Vec::new();
        for fragment in line {
            match pieces.last_mut() {
                Some(current) if !is_run_break(current, &fragment) => current.push(fragment),
                _ => pieces.push(vec![fragment]),
            }
        }

        let isolated = pieces.len() == 1;
        for piece in pieces {
            let mut run = Run::from_fragments(piece, column, line_idx);
            run.isolated = isolated;
            runs.push(run);
        }
    }
    runs
}

fn is_run_break(current: &[Fragment], next: &Fragment) -> bool {
    let Some(prev) = current.last() else {
        return false;
    };
    let gap = next.bbox.x0 - prev.bbox.x1;
    let avg_char_width = (prev.char_width() + next.char_width()) / 2.0;
    gap > avg_char_width * RUN_GAP_CHARS
}

/// Group fragments into visual lines by vertical overlap.
///
/// Lines are returned top to bottom with fragments sorted by x0. A line's
/// band grows as fragments join it, so slightly raised or lowered glyphs
/// (superscripts, mixed sizes) stay on their line.
pub fn group_lines(mut fragments: Vec<Fragment>) -> Vec<Vec<Fragment>> {
    fragments.sort_by(|a, b| {
        a.bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<(BBox, Vec<Fragment>)> = Vec::new();
    for fragment in fragments {
        let target = lines
            .iter()
            .rposition(|(band, _)| shares_line(band, &fragment.bbox));
        match target {
            Some(idx) => {
                let (band, members) = &mut lines[idx];
                *band = band.union(&fragment.bbox);
                members.push(fragment);
            }
            None => lines.push((fragment.bbox, vec![fragment])),
        }
    }

    lines.sort_by(|(a, _), (b, _)| a.y0.partial_cmp(&b.y0).unwrap_or(Ordering::Equal));
    lines
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal));
            members
        })
        .collect()
}

fn shares_line(band: &BBox, bbox: &BBox) -> bool {
    let min_height = band.height().min(bbox.height());
    min_height > 0.0 && band.vertical_overlap(bbox) >= min_height * LINE_OVERLAP_RATIO
}

/// Split already ordered fragments into text lines.
///
/// A new line starts whenever a fragment does not share a line with the
/// previous fragments.
pub fn text_lines(fragments: &[Fragment]) -> Vec<String> {
    let mut lines: Vec<(BBox, Vec<&Fragment>)> = Vec::new();
    for fragment in fragments {
        match lines.last_mut() {
            Some((band, members))
                if shares_line(band, &fragment.bbox)
                    && members.last().map_or(true, |p| fragment.bbox.x0 >= p.bbox.x0) =>
            {
                *band = band.union(&fragment.bbox);
                members.push(fragment);
            }
            _ => lines.push((fragment.bbox, vec![fragment])),
        }
    }
    lines
        .into_iter()
        .map(|(_, members)| join_fragments(members.into_iter()))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Join fragments of one line, inserting spaces at visible gaps.
///
/// No space is inserted between adjacent characters of scripts that do not
/// separate words with spaces.
pub fn join_fragments<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut result = String::new();
    let mut prev: Option<&Fragment> = None;

    for fragment in fragments {
        if let Some(prev) = prev {
            let gap = fragment.bbox.x0 - prev.bbox.x1;
            let space_threshold = fragment.char_width() * 0.2;

            let should_insert_space = gap > space_threshold && {
                let prev_is_cjk = prev.text.chars().last().map(is_spaceless_script_char);
                let curr_is_cjk = fragment.text.chars().next().map(is_spaceless_script_char);
                !(prev_is_cjk == Some(true) && curr_is_cjk == Some(true))
            };

            let prev_ends_with_space = prev.text.ends_with([' ', '\u{00A0}']);
            let curr_starts_with_space = fragment.text.starts_with([' ', '\u{00A0}']);

            if should_insert_space && !prev_ends_with_space && !curr_starts_with_space {
                result.push(' ');
            }
        }
        result.push_str(&fragment.text);
        prev = Some(fragment);
    }

    result
}

/// Check if a character belongs to a script written without word spaces.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        // Hiragana, Katakana
        || (0x3040..=0x30FF).contains(&code)
        // CJK Symbols and Punctuation
        || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x0: f32, y0: f32, size: f32) -> Fragment {
        let width = text.chars().count() as f32 * size * 0.5;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + size), "Helvetica", size)
    }

    #[test]
    fn test_group_lines_by_overlap() {
        let frags = vec![
            frag("world", 45.0, 100.5, 12.0),
            frag("Second", 10.0, 116.0, 12.0),
            frag("Hello", 10.0, 100.0, 12.0),
        ];
        let lines = group_lines(frags);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].text, "Hello");
        assert_eq!(lines[0][1].text, "world");
        assert_eq!(lines[1][0].text, "Second");
    }

    #[test]
    fn test_superscript_stays_on_line() {
        let frags = vec![frag("Text", 10.0, 100.0, 12.0), frag("1", 34.0, 97.0, 7.0)];
        assert_eq!(group_lines(frags).len(), 1);
    }

    #[test]
    fn test_runs_split_on_wide_gap() {
        let frags = vec![
            frag("Name", 10.0, 100.0, 10.0),
            frag("Value", 200.0, 100.0, 10.0),
            frag("Alone", 10.0, 120.0, 10.0),
        ];
        let runs = group_runs(frags, Some(0));
        assert_eq!(runs.len(), 3);
        assert!(!runs[0].isolated);
        assert!(!runs[1].isolated);
        assert!(runs[2].isolated);
        assert_eq!(runs[2].line, 1);
        assert_eq!(runs[0].column, Some(0));
    }

    #[test]
    fn test_run_text_spacing() {
        // "Hello" ends at 35, "world" starts at 38: a visible gap
        let run = Run::from_fragments(
            vec![frag("world", 38.0, 0.0, 10.0), frag("Hello", 10.0, 0.0, 10.0)],
            None,
            0,
        );
        assert_eq!(run.text(), "Hello world");

        // Adjacent glyphs without a gap
        let run = Run::from_fragments(
            vec![frag("ab", 10.0, 0.0, 10.0), frag("cd", 20.0, 0.0, 10.0)],
            None,
            0,
        );
        assert_eq!(run.text(), "abcd");
    }

    #[test]
    fn test_cjk_no_space() {
        let run = Run::from_fragments(
            vec![frag("中文", 10.0, 0.0, 10.0), frag("字符", 32.0, 0.0, 10.0)],
            None,
            0,
        );
        assert_eq!(run.text(), "中文字符");
    }

    #[test]
    fn test_run_style_majority() {
        let bold = frag("Important heading", 10.0, 0.0, 14.0).with_bold(true);
        let plain = frag("x", 200.0, 0.0, 10.0);
        let run = Run::from_fragments(vec![bold, plain], None, 0);
        assert!(run.is_bold);
        assert!(!run.is_monospace);
        assert!(run.font_size > 13.0);
        assert_eq!(run.font_family, "Helvetica");
    }

    #[test]
    fn test_text_lines() {
        let frags = vec![
            frag("First", 10.0, 100.0, 10.0),
            frag("line", 38.0, 100.0, 10.0),
            frag("Second", 10.0, 114.0, 10.0),
        ];
        assert_eq!(text_lines(&frags), vec!["First line", "Second"]);
    }
}
