//! Contextual linkers.
//!
//! Captions are attached to the image or table right above them; footnotes
//! at the bottom of the page are tied to the body block carrying their
//! reference mark. Links are stored as [`BlockId`]s.

use std::cmp::Ordering;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Block, BlockId, BlockKind, Fragment};

/// Caption keyword with an optional number.
static CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(figure|fig\.|table)\s*(\d+)?").expect("valid regex"));

/// Bare caption numbering: "3.", "3:" or "(3)".
static CAPTION_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(?(\d{1,3})[.:)]").expect("valid regex"));

/// Allowed overlap between a caption and its target (points).
const CAPTION_SLACK: f32 = 1.0;

/// A raised reference digit is at most this fraction of the text size.
const SUPERSCRIPT_SIZE_RATIO: f32 = 0.8;

const SUPERSCRIPT_DIGITS: &[char] = &['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

const NOTE_SYMBOLS: &[char] = &['†', '‡', '§', '¶'];

/// Doubles as a bullet, so it only marks notes when set small or raised.
const ASTERISK: char = '*';

/// Attach captions to image and table blocks.
///
/// Returns the number of captions linked.
pub fn link_captions(blocks: &mut [Block], proximity: f32) -> usize {
    let mut targets: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(b.kind, BlockKind::Image { .. } | BlockKind::Table(_)))
        .map(|(i, _)| i)
        .collect();
    targets.sort_by(|&a, &b| top_left(&blocks[a], &blocks[b]));

    // Last caption number seen for figures and tables
    let mut counters = [0u32; 2];
    let mut taken: HashSet<usize> = HashSet::new();
    let mut linked = 0;

    for t in targets {
        let target = blocks[t].bbox;
        let counter = usize::from(matches!(blocks[t].kind, BlockKind::Table(_)));
        let expected = counters[counter] + 1;

        let best = blocks
            .iter()
            .enumerate()
            .filter(|(i, b)| b.kind == BlockKind::Paragraph && !taken.contains(i))
            .filter_map(|(i, b)| {
                let gap = b.bbox.y0 - target.y1;
                if gap < -CAPTION_SLACK || gap > proximity || b.bbox.horizontal_overlap(&target) <= 0.0 {
                    return None;
                }
                let (score, number) = caption_score(&b.text(), expected);
                (score > 0).then_some((i, score, gap, b.bbox.x0, number))
            })
            .min_by(|a, b| {
                b.1.cmp(&a.1)
                    .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
                    .then(a.3.partial_cmp(&b.3).unwrap_or(Ordering::Equal))
            });

        let Some((c, score, _, _, number)) = best else {
            continue;
        };

        let full_text = blocks[c].text();
        let first_line = blocks[c].lines().into_iter().next().unwrap_or_default();
        let target_id = blocks[t].id;
        log::debug!(
            "caption {} -> {} (score {}): {:?}",
            blocks[c].id,
            target_id,
            score,
            first_line
        );

        blocks[c].kind = BlockKind::Caption {
            target: target_id,
            text: first_line,
        };
        match &mut blocks[t].kind {
            BlockKind::Image { caption, .. } => *caption = Some(full_text),
            BlockKind::Table(grid) => grid.caption = Some(full_text),
            _ => {}
        }

        counters[counter] = number.unwrap_or(expected);
        taken.insert(c);
        linked += 1;
    }

    linked
}

/// Score a caption candidate: +2 for a caption keyword, +1 when its number
/// is the expected one. Text with neither scores 0 and is never a caption.
fn caption_score(text: &str, expected: u32) -> (u8, Option<u32>) {
    if let Some(caps) = CAPTION_RE.captures(text) {
        let number = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        let bonus = u8::from(number == Some(expected));
        return (2 + bonus, number);
    }
    let number = CAPTION_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    match number {
        Some(n) if n == expected => (1, Some(n)),
        _ => (0, None),
    }
}

/// Turn marked blocks at the bottom of the page into footnotes.
///
/// `order` is the provisional reading order (indices into `blocks`); the
/// reference of a footnote is the last body block before it in that order
/// that carries the same mark. Returns the number of footnotes found.
pub fn link_footnotes(blocks: &mut [Block], order: &[usize], zone_top: f32, body_size: f32) -> usize {
    let notes: Vec<(usize, String)> = order
        .iter()
        .enumerate()
        .filter_map(|(pos, &i)| {
            let block = &blocks[i];
            let eligible = matches!(
                block.kind,
                BlockKind::Paragraph | BlockKind::ListItem { .. } | BlockKind::Blockquote
            );
            if !eligible || block.bbox.y0 <= zone_top {
                return None;
            }
            leading_marker_or_raised(&block.source_fragments, body_size).map(|mark| (pos, mark))
        })
        .collect();

    let note_indices: HashSet<usize> = notes.iter().map(|(pos, _)| order[*pos]).collect();
    let mut links: Vec<(usize, String, Option<BlockId>)> = Vec::with_capacity(notes.len());

    for (pos, mark) in notes {
        let referenced_by = order[..pos]
            .iter()
            .rev()
            .filter(|i| !note_indices.contains(i) && !blocks[**i].is_attachment())
            .find(|&&i| reference_marks(&blocks[i].source_fragments).contains(&mark))
            .map(|&i| blocks[i].id);
        links.push((order[pos], mark, referenced_by));
    }

    let count = links.len();
    for (i, ref_id, referenced_by) in links {
        log::debug!("footnote {} ({}) referenced by {:?}", blocks[i].id, ref_id, referenced_by);
        blocks[i].kind = BlockKind::Footnote { ref_id, referenced_by };
    }
    count
}

/// Normalized value of a note mark ("¹" becomes "1").
pub fn normalize_mark(mark: &str) -> String {
    mark.nfkc().collect::<String>().trim().to_string()
}

/// The note mark a footnote body starts with, if any.
///
/// Asterisks count only when the text is set smaller than `body_size`.
fn leading_marker(fragments: &[Fragment], body_size: f32) -> Option<String> {
    let first = fragments.first()?;
    let text = first.text.trim_start();

    let superscript: String = text.chars().take_while(|c| SUPERSCRIPT_DIGITS.contains(c)).collect();
    if !superscript.is_empty() {
        return Some(normalize_mark(&superscript));
    }

    let small = first.font_size < body_size;
    let symbol = text
        .chars()
        .next()
        .filter(|c| NOTE_SYMBOLS.contains(c) || (*c == ASTERISK && small))?;
    Some(text.chars().take_while(|&c| c == symbol).collect())
}

/// The leading mark of a footnote body, including a small raised digit or
/// asterisk set as its own fragment.
fn leading_marker_or_raised(fragments: &[Fragment], body_size: f32) -> Option<String> {
    if let Some(mark) = leading_marker(fragments, body_size) {
        return Some(mark);
    }
    let (first, next) = (fragments.first()?, fragments.get(1)?);
    is_raised_mark(first, next).then(|| normalize_mark(&first.text))
}

/// Whether `mark` is a short number or asterisk run set smaller and higher
/// than `text`.
fn is_raised_mark(mark: &Fragment, text: &Fragment) -> bool {
    let glyphs = mark.text.trim();
    let digits = glyphs.chars().all(|c| c.is_ascii_digit());
    let asterisks = glyphs.chars().all(|c| c == ASTERISK);
    !glyphs.is_empty()
        && glyphs.len() <= 3
        && (digits || asterisks)
        && mark.font_size <= text.font_size * SUPERSCRIPT_SIZE_RATIO
        && mark.bbox.center_y() < text.bbox.center_y()
        && mark.bbox.vertical_overlap(&text.bbox) > 0.0
}

/// Every reference mark carried by a body block.
fn reference_marks(fragments: &[Fragment]) -> Vec<String> {
    let mut marks = Vec::new();
    for (i, fragment) in fragments.iter().enumerate() {
        let mut current = String::new();
        for c in fragment.text.chars() {
            if SUPERSCRIPT_DIGITS.contains(&c) {
                current.push(c);
                continue;
            }
            if !current.is_empty() {
                marks.push(normalize_mark(&current));
                current.clear();
            }
            if NOTE_SYMBOLS.contains(&c) {
                marks.push(c.to_string());
            }
        }
        if !current.is_empty() {
            marks.push(normalize_mark(&current));
        }

        let neighbour = i.checked_sub(1).and_then(|p| fragments.get(p)).or_else(|| fragments.get(i + 1));
        if let Some(neighbour) = neighbour {
            if is_raised_mark(fragment, neighbour) {
                marks.push(normalize_mark(&fragment.text));
            }
        }
    }
    marks
}

fn top_left(a: &Block, b: &Block) -> Ordering {
    a.bbox
        .y0
        .partial_cmp(&b.bbox.y0)
        .unwrap_or(Ordering::Equal)
        .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, ListMarker, MarkerKind, TableCell, TableGrid, TableRow, TableStrategy};

    fn frag(text: &str, x0: f32, y0: f32, size: f32) -> Fragment {
        let width = text.chars().count() as f32 * size * 0.5;
        Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + size), "Times", size)
    }

    fn paragraph(id: u32, text: &str, x0: f32, y0: f32) -> Block {
        Block::new(BlockId(id), BlockKind::Paragraph, vec![frag(text, x0, y0, 10.0)], 1.0)
    }

    fn image(id: u32, bbox: BBox) -> Block {
        Block::new(
            BlockId(id),
            BlockKind::Image {
                resource_id: None,
                caption: None,
            },
            vec![],
            1.0,
        )
        .with_bbox(bbox)
    }

    fn table(id: u32, bbox: BBox) -> Block {
        let cell = TableCell::empty(bbox);
        let rows = vec![TableRow::new(vec![cell.clone(), cell.clone()]), TableRow::new(vec![cell.clone(), cell])];
        let grid = TableGrid::new(
            rows,
            TableStrategy::Stream,
            vec![bbox.x0, bbox.center_x(), bbox.x1],
            vec![bbox.y0, bbox.center_y(), bbox.y1],
        );
        Block::new(BlockId(id), BlockKind::Table(grid), vec![], 1.0).with_bbox(bbox)
    }

    #[test]
    fn test_caption_below_image() {
        let mut blocks = vec![
            image(0, BBox::new(100.0, 100.0, 300.0, 250.0)),
            paragraph(1, "Figure 1: A chart", 100.0, 260.0),
            paragraph(2, "Unrelated text far below", 100.0, 400.0),
        ];
        assert_eq!(link_captions(&mut blocks, 50.0), 1);
        assert_eq!(
            blocks[1].kind,
            BlockKind::Caption {
                target: BlockId(0),
                text: "Figure 1: A chart".to_string()
            }
        );
        assert!(matches!(
            &blocks[0].kind,
            BlockKind::Image { caption: Some(c), .. } if c == "Figure 1: A chart"
        ));
        assert_eq!(blocks[2].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_caption_keyword_beats_proximity() {
        let mut blocks = vec![
            table(0, BBox::new(100.0, 100.0, 300.0, 200.0)),
            paragraph(1, "Some note right under", 100.0, 205.0),
            paragraph(2, "Table 1. Results", 100.0, 225.0),
        ];
        link_captions(&mut blocks, 50.0);
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
        assert!(matches!(blocks[2].kind, BlockKind::Caption { target: BlockId(0), .. }));
        assert!(matches!(&blocks[0].kind, BlockKind::Table(g) if g.caption.as_deref() == Some("Table 1. Results")));
    }

    #[test]
    fn test_caption_needs_horizontal_overlap() {
        let mut blocks = vec![
            image(0, BBox::new(100.0, 100.0, 200.0, 200.0)),
            paragraph(1, "Figure 1", 400.0, 210.0),
        ];
        assert_eq!(link_captions(&mut blocks, 50.0), 0);
    }

    #[test]
    fn test_caption_counter() {
        assert_eq!(caption_score("Figure 2: x", 2), (3, Some(2)));
        assert_eq!(caption_score("fig. 3", 2), (2, Some(3)));
        assert_eq!(caption_score("TABLE", 1), (2, None));
        assert_eq!(caption_score("Plain", 1), (0, None));
        assert_eq!(caption_score("3. Overview of runs", 3), (1, Some(3)));
        assert_eq!(caption_score("2: Out of sequence", 3), (0, None));
    }

    #[test]
    fn test_body_text_below_table_is_not_caption() {
        let mut blocks = vec![
            table(0, BBox::new(50.0, 100.0, 250.0, 140.0)),
            paragraph(1, "The results above show that the cohort is young overall.", 50.0, 162.0),
        ];
        assert_eq!(link_captions(&mut blocks, 50.0), 0);
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
        assert!(matches!(&blocks[0].kind, BlockKind::Table(g) if g.caption.is_none()));
    }

    #[test]
    fn test_numbered_caption_matching_counter() {
        let mut blocks = vec![
            image(0, BBox::new(100.0, 100.0, 300.0, 250.0)),
            paragraph(1, "1. Overview of the pipeline", 100.0, 260.0),
        ];
        assert_eq!(link_captions(&mut blocks, 50.0), 1);
        assert!(matches!(blocks[1].kind, BlockKind::Caption { target: BlockId(0), .. }));
    }

    #[test]
    fn test_footnote_with_superscript() {
        let body = Block::new(
            BlockId(0),
            BlockKind::Paragraph,
            vec![frag("A claim that needs support¹", 50.0, 100.0, 10.0)],
            1.0,
        );
        let note = Block::new(
            BlockId(1),
            BlockKind::Paragraph,
            vec![frag("¹ The supporting source", 50.0, 720.0, 8.0)],
            1.0,
        );
        let mut blocks = vec![body, note];
        assert_eq!(link_footnotes(&mut blocks, &[0, 1], 792.0 * 0.85, 10.0), 1);
        assert_eq!(
            blocks[1].kind,
            BlockKind::Footnote {
                ref_id: "1".to_string(),
                referenced_by: Some(BlockId(0))
            }
        );
    }

    #[test]
    fn test_footnote_with_raised_digit_reference() {
        let body = Block::new(
            BlockId(0),
            BlockKind::Paragraph,
            vec![frag("Text with a note", 50.0, 100.0, 10.0), frag("2", 130.0, 97.0, 6.0)],
            1.0,
        );
        let note = Block::new(
            BlockId(1),
            BlockKind::Paragraph,
            vec![frag("2", 50.0, 718.0, 6.0), frag("Second note text", 56.0, 720.0, 8.0)],
            1.0,
        );
        let mut blocks = vec![body, note];
        link_footnotes(&mut blocks, &[0, 1], 673.2, 10.0);
        assert!(matches!(
            &blocks[1].kind,
            BlockKind::Footnote { ref_id, referenced_by: Some(BlockId(0)) } if ref_id == "2"
        ));
    }

    #[test]
    fn test_footnote_without_reference() {
        let note = Block::new(
            BlockId(0),
            BlockKind::Paragraph,
            vec![frag("† Orphan note", 50.0, 720.0, 8.0)],
            1.0,
        );
        let mut blocks = vec![note];
        link_footnotes(&mut blocks, &[0], 673.2, 10.0);
        assert_eq!(
            blocks[0].kind,
            BlockKind::Footnote {
                ref_id: "†".to_string(),
                referenced_by: None
            }
        );
    }

    #[test]
    fn test_marked_text_above_zone_is_not_footnote() {
        let mut blocks = vec![paragraph(0, "¹ Looks like a note", 50.0, 300.0)];
        assert_eq!(link_footnotes(&mut blocks, &[0], 673.2, 10.0), 0);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_body_size_asterisk_bullet_is_not_footnote() {
        let body = paragraph(0, "Pick one of the options * listed below", 50.0, 100.0);
        let item = Block::new(
            BlockId(1),
            BlockKind::ListItem {
                marker: ListMarker::new(MarkerKind::Bullet, "*"),
                depth: 0,
            },
            vec![frag("* Last item of the list", 50.0, 720.0, 10.0)],
            1.0,
        );
        let mut blocks = vec![body, item];
        assert_eq!(link_footnotes(&mut blocks, &[0, 1], 673.2, 10.0), 0);
        assert!(matches!(blocks[1].kind, BlockKind::ListItem { .. }));
    }

    #[test]
    fn test_small_asterisk_note_with_raised_reference() {
        let body = Block::new(
            BlockId(0),
            BlockKind::Paragraph,
            vec![frag("Results are preliminary", 50.0, 100.0, 10.0), frag("*", 165.0, 97.0, 6.0)],
            1.0,
        );
        let inline = paragraph(1, "Multiply a * b before adding", 50.0, 200.0);
        let note = Block::new(
            BlockId(2),
            BlockKind::Paragraph,
            vec![frag("* Pending peer review", 50.0, 720.0, 8.0)],
            1.0,
        );
        let mut blocks = vec![body, inline, note];
        assert_eq!(link_footnotes(&mut blocks, &[0, 1, 2], 673.2, 10.0), 1);
        assert_eq!(
            blocks[2].kind,
            BlockKind::Footnote {
                ref_id: "*".to_string(),
                referenced_by: Some(BlockId(0))
            }
        );
    }

    #[test]
    fn test_normalize_mark() {
        assert_eq!(normalize_mark("¹²"), "12");
        assert_eq!(normalize_mark("†"), "†");
    }
}
