//! List item detection.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Classifier, Hypothesis, Label, PageContext};
use crate::layout::lines::Run;
use crate::model::{ListMarker, MarkerKind};

/// Leading bullet glyph, optionally followed by content.
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([•●○◦■□◆◇\-–—→►✓*])(?:\s+(\S.*))?$").expect("valid regex"));

/// Leading number, letter or Roman numeral with `.` or `)`.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,3}|[a-zA-Z]|[ivxlcdm]+|[IVXLCDM]+)([.)])(?:\s+(\S.*))?$").expect("valid regex")
});

/// Deepest nesting level reported.
const MAX_DEPTH: u8 = 5;

/// Marker x positions closer than this share a nesting level (points).
const INDENT_TOLERANCE: f32 = 3.0;

/// A marker found at the start of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMarker {
    /// The marker
    pub marker: ListMarker,
    /// Base confidence of the marker style
    pub confidence: f32,
    /// Whether text follows the marker on the same run
    pub has_content: bool,
}

/// Parse a list marker at the start of `text`.
pub fn parse_marker(text: &str) -> Option<ParsedMarker> {
    if let Some(caps) = BULLET_RE.captures(text) {
        let glyph = caps.get(1)?.as_str();
        let confidence = match glyph {
            "-" | "–" | "—" | "*" => 0.7,
            _ => 1.0,
        };
        return Some(ParsedMarker {
            marker: ListMarker::new(MarkerKind::Bullet, glyph),
            confidence,
            has_content: caps.get(2).is_some(),
        });
    }

    let caps = NUMBER_RE.captures(text)?;
    let label = caps.get(1)?.as_str();
    let marker_text = format!("{}{}", label, caps.get(2)?.as_str());
    let has_content = caps.get(3).is_some();

    let (kind, confidence) = if label.chars().all(|c| c.is_ascii_digit()) {
        (MarkerKind::Arabic, 0.9)
    } else if label.chars().count() == 1 {
        match label {
            "i" => (MarkerKind::LowerRoman, 0.6),
            "I" => (MarkerKind::UpperRoman, 0.6),
            _ if label.chars().all(|c| c.is_ascii_lowercase()) => (MarkerKind::LowerAlpha, 0.6),
            _ => (MarkerKind::UpperAlpha, 0.6),
        }
    } else if label.chars().all(|c| c.is_ascii_lowercase()) {
        (MarkerKind::LowerRoman, 0.8)
    } else {
        (MarkerKind::UpperRoman, 0.8)
    };

    let marker = ListMarker::new(kind, marker_text);
    // Letter runs that do not form a Roman numeral are not markers
    if marker.number.is_none() {
        return None;
    }

    Some(ParsedMarker {
        marker,
        confidence,
        has_content,
    })
}

/// Classifies lines starting with a bullet or an enumerator, and the lines
/// that continue them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListClassifier;

impl Classifier for ListClassifier {
    fn name(&self) -> &'static str {
        "list"
    }

    fn classify(&self, runs: &[Run], ctx: &PageContext<'_>) -> Vec<Option<Hypothesis>> {
        let mut out: Vec<Option<Hypothesis>> = vec![None; runs.len()];

        // (run index, marker, confidence) of every item start
        let mut items: Vec<(usize, ListMarker, f32)> = Vec::new();
        let mut continuations: Vec<(usize, f32)> = Vec::new();
        // Last run of the current item and the item's first run
        let mut chain: Option<(usize, usize, f32)> = None;

        let mut i = 0;
        while i < runs.len() {
            let run = &runs[i];
            let text = run.text();

            if let Some(parsed) = parse_marker(&text) {
                let mut confidence = parsed.confidence;
                if ctx.typography.ratio(run.font_size) >= ctx.options.heading_font_ratio {
                    confidence *= 0.5;
                }

                let next_on_line = runs.get(i + 1).filter(|n| n.line == run.line);
                match (parsed.has_content, next_on_line) {
                    (true, _) => {
                        items.push((i, parsed.marker, confidence));
                        chain = Some((i, i, confidence));
                    }
                    // Marker set apart from its text on the same line
                    (false, Some(_)) => {
                        items.push((i, parsed.marker, confidence));
                        continuations.push((i + 1, confidence));
                        chain = Some((i, i + 1, confidence));
                        i += 1;
                    }
                    (false, None) => chain = None,
                }
                i += 1;
                continue;
            }

            chain = match chain {
                Some((start, last, confidence)) if is_continuation(&runs[start], &runs[last], run) => {
                    continuations.push((i, confidence));
                    Some((start, i, confidence))
                }
                _ => None,
            };
            i += 1;
        }

        let positions: Vec<f32> = items.iter().map(|(idx, _, _)| runs[*idx].bbox.x0).collect();
        let depths = nesting_depths(&positions);

        for ((idx, marker, confidence), depth) in items.into_iter().zip(depths) {
            out[idx] = Some(Hypothesis::new(Label::ListItem { marker, depth }, confidence));
        }
        for (idx, confidence) in continuations {
            out[idx] = Some(Hypothesis::new(Label::ListContinuation, confidence));
        }
        out
    }
}

/// An unmarked line continues an item when it sits alone on its line, right
/// below the item, indented past the marker.
fn is_continuation(first: &Run, last: &Run, run: &Run) -> bool {
    let gap = run.bbox.y0 - last.bbox.y1;
    run.isolated
        && run.line > last.line
        && gap <= run.font_size * 0.8
        && run.bbox.x0 > first.bbox.x0 + first.char_width() * 0.5
}

/// Nesting depth of each marker position.
///
/// Positions are clustered; the indent unit is the median distance between
/// neighbouring clusters.
fn nesting_depths(positions: &[f32]) -> Vec<u8> {
    let mut sorted: Vec<f32> = positions.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut clusters: Vec<f32> = Vec::new();
    for x in sorted {
        match clusters.last() {
            Some(&last) if x - last <= INDENT_TOLERANCE => {}
            _ => clusters.push(x),
        }
    }

    let Some(&min_x) = clusters.first() else {
        return Vec::new();
    };
    let steps: Vec<f32> = clusters.windows(2).map(|w| w[1] - w[0]).collect();
    let unit = crate::layout::median(&steps);

    positions
        .iter()
        .map(|&x| match unit {
            Some(unit) if unit > 0.0 => ((x - min_x) / unit).round().clamp(0.0, f32::from(MAX_DEPTH)) as u8,
            _ => 0,
        })
        .collect()
}
