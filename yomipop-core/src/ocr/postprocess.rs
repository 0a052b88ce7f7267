//! Regroup raw OCR lines into logical paragraphs.
//!
//! Some backends return one paragraph per recognized line. This pass
//! separates furigana from main text by size, clusters adjacent main lines
//! into paragraphs, and merges each cluster into a single [`Paragraph`]
//! ordered along the writing flow.

use tracing::debug;

use super::{Paragraph, Word};
use crate::geometry::BoundingBox;

/// Furigana lines are much thinner than the main text along the cross
/// axis: width for vertical lines, height for horizontal ones.
const FURIGANA_SIZE_RATIO: f32 = 0.65;

/// Lines overlapping by more than this fraction of the smaller cross-axis
/// dimension are candidates for the same paragraph.
const ADJACENT_OVERLAP_RATIO: f32 = 0.5;

/// Maximum center distance along the flow axis, as a multiple of the
/// larger flow-axis dimension, for two lines to be adjacent.
const ADJACENT_DISTANCE_RATIO: f32 = 1.9;

/// Group single-line paragraphs into multi-line ones. Furigana lines are
/// excluded from grouping and re-emitted as standalone paragraphs at the
/// end of the list.
pub fn group_lines_into_paragraphs(lines: Vec<Paragraph>) -> Vec<Paragraph> {
    if lines.is_empty() {
        return Vec::new();
    }
    let total = lines.len();

    let (main_lines, furigana_lines) = classify_lines_by_size(lines);
    debug!("separated {} furigana lines", furigana_lines.len());

    let (vertical, horizontal): (Vec<_>, Vec<_>) =
        main_lines.into_iter().partition(|p| p.vertical);

    let mut paragraphs = Vec::new();
    for mut line_set in [vertical, horizontal] {
        while !line_set.is_empty() {
            let mut group = vec![line_set.remove(0)];
            let mut i = 0;
            while i < line_set.len() {
                let adjacent = group
                    .iter()
                    .any(|grouped| are_lines_adjacent(grouped, &line_set[i]));
                if adjacent {
                    group.push(line_set.remove(i));
                    // the group grew; earlier rejects may now be adjacent
                    i = 0;
                } else {
                    i += 1;
                }
            }
            paragraphs.push(merge_lines(group));
        }
    }

    paragraphs.extend(furigana_lines);
    debug!("regrouped {} raw lines into {} paragraphs", total, paragraphs.len());
    paragraphs
}

/// Split lines into (main, furigana) by comparing each line's cross-axis
/// size against the median of its orientation class. A single line is
/// always main text.
fn classify_lines_by_size(lines: Vec<Paragraph>) -> (Vec<Paragraph>, Vec<Paragraph>) {
    let mut main = Vec::new();
    let mut furigana = Vec::new();

    let (vertical, horizontal): (Vec<_>, Vec<_>) = lines.into_iter().partition(|p| p.vertical);

    for (lines, cross_size) in [
        (vertical, (|b: &BoundingBox| b.width) as fn(&BoundingBox) -> f32),
        (horizontal, |b: &BoundingBox| b.height),
    ] {
        if lines.len() < 2 {
            main.extend(lines);
            continue;
        }
        let sizes: Vec<f32> = lines.iter().map(|p| cross_size(&p.bounds)).collect();
        let threshold = median(&sizes) * FURIGANA_SIZE_RATIO;
        for line in lines {
            if cross_size(&line.bounds) < threshold {
                furigana.push(line);
            } else {
                main.push(line);
            }
        }
    }

    (main, furigana)
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Two lines belong to the same paragraph when they overlap enough along
/// the cross axis and their centers are close along the flow axis.
fn are_lines_adjacent(a: &Paragraph, b: &Paragraph) -> bool {
    let (ba, bb) = (&a.bounds, &b.bounds);

    if a.vertical {
        let overlap = (ba.bottom().min(bb.bottom()) - ba.top().max(bb.top())).max(0.0);
        let enough_overlap = overlap > ba.height.min(bb.height) * ADJACENT_OVERLAP_RATIO;
        let close_enough = (ba.center_x - bb.center_x).abs()
            < ADJACENT_DISTANCE_RATIO * ba.width.max(bb.width);
        enough_overlap && close_enough
    } else {
        let overlap = (ba.right().min(bb.right()) - ba.left().max(bb.left())).max(0.0);
        let enough_overlap = overlap > ba.width.min(bb.width) * ADJACENT_OVERLAP_RATIO;
        let close_enough = (ba.center_y - bb.center_y).abs()
            < ADJACENT_DISTANCE_RATIO * ba.height.max(bb.height);
        enough_overlap && close_enough
    }
}

/// Merge a group of lines into one paragraph, ordered along the flow axis:
/// top-to-bottom for horizontal text, right-to-left for vertical.
fn merge_lines(mut lines: Vec<Paragraph>) -> Paragraph {
    let vertical = lines.first().is_some_and(|l| l.vertical);

    if vertical {
        lines.sort_by(|a, b| b.bounds.center_x.total_cmp(&a.bounds.center_x));
    } else {
        lines.sort_by(|a, b| a.bounds.center_y.total_cmp(&b.bounds.center_y));
    }

    let bounds = BoundingBox::enclosing(lines.iter().map(|l| l.bounds));
    let words: Vec<Word> = lines.into_iter().flat_map(|l| l.words).collect();
    Paragraph::from_words(words, bounds, vertical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, bounds: BoundingBox, vertical: bool) -> Paragraph {
        let word = Word {
            text: text.to_string(),
            separator: String::new(),
            bounds,
        };
        Paragraph::from_words(vec![word], bounds, vertical)
    }

    #[test]
    fn test_horizontal_lines_merge_top_to_bottom() {
        let second = line("二行目", BoundingBox::new(0.5, 0.56, 0.6, 0.05), false);
        let first = line("一行目", BoundingBox::new(0.5, 0.50, 0.6, 0.05), false);
        let merged = group_lines_into_paragraphs(vec![second, first]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].full_text, "一行目二行目");
        assert!(!merged[0].vertical);
    }

    #[test]
    fn test_vertical_lines_merge_right_to_left() {
        let left = line("二列目", BoundingBox::new(0.40, 0.5, 0.05, 0.6), true);
        let right = line("一列目", BoundingBox::new(0.46, 0.5, 0.05, 0.6), true);
        let merged = group_lines_into_paragraphs(vec![left, right]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].full_text, "一列目二列目");
        assert!(merged[0].vertical);
    }

    #[test]
    fn test_distant_lines_stay_separate() {
        let a = line("上の段落", BoundingBox::new(0.5, 0.1, 0.6, 0.05), false);
        let b = line("下の段落", BoundingBox::new(0.5, 0.9, 0.6, 0.05), false);
        let merged = group_lines_into_paragraphs(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_non_overlapping_columns_stay_separate() {
        // same height band, no horizontal overlap at all
        let a = line("左", BoundingBox::new(0.2, 0.5, 0.1, 0.05), false);
        let b = line("右", BoundingBox::new(0.8, 0.5, 0.1, 0.05), false);
        let merged = group_lines_into_paragraphs(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_furigana_split_off_horizontal() {
        // two body lines plus one much shorter line right above the first
        let body1 = line("漢字だらけ", BoundingBox::new(0.5, 0.50, 0.6, 0.05), false);
        let body2 = line("続きの行", BoundingBox::new(0.5, 0.56, 0.6, 0.05), false);
        let ruby = line("かんじ", BoundingBox::new(0.35, 0.465, 0.2, 0.02), false);
        let merged = group_lines_into_paragraphs(vec![body1, body2, ruby]);
        // body lines merge; the furigana line survives alone at the end
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].full_text, "漢字だらけ続きの行");
        assert_eq!(merged[1].full_text, "かんじ");
    }

    #[test]
    fn test_single_line_is_never_furigana() {
        let thin = line("ほそい", BoundingBox::new(0.5, 0.5, 0.3, 0.01), false);
        let merged = group_lines_into_paragraphs(vec![thin]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].full_text, "ほそい");
    }

    #[test]
    fn test_merged_bounds_enclose_lines() {
        let a = line("上", BoundingBox::new(0.5, 0.50, 0.6, 0.05), false);
        let b = line("下", BoundingBox::new(0.5, 0.56, 0.6, 0.05), false);
        let merged = group_lines_into_paragraphs(vec![a, b]);
        let bounds = merged[0].bounds;
        assert!(bounds.top() <= 0.475 + 1e-6);
        assert!(bounds.bottom() >= 0.585 - 1e-6);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_lines_into_paragraphs(Vec::new()).is_empty());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
