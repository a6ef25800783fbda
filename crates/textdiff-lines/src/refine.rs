//! Refinement of line-level hunks into character-level mappings.
//!
//! A line hunk is re-diffed as two flat character sequences, then the raw
//! character diffs are post-processed: boundary optimization, extension to
//! whole words where the edit density justifies it, smoothing, and removal
//! of coincidental tiny matches. The surviving diffs are translated back
//! into document ranges.

use textdiff_range::OffsetRange;
use textdiff_seq::optimize::{optimize, smoothen};
use textdiff_seq::{dp, myers, Sequence, SequenceDiff, Timeout};

use crate::char_sequence::CharSliceSequence;
use crate::line_sequence::LineSequence;
use crate::mappings::RangeMapping;

/// Character mappings for one refined hunk.
pub struct RefinedDiff {
    pub mappings: Vec<RangeMapping>,
    pub hit_timeout: bool,
}

/// Below this combined length the quadratic DP kernel is affordable and
/// produces nicer alignments than Myers.
const DP_REFINEMENT_LIMIT: usize = 500;

/// Produce character-level mappings for a line-level hunk.
pub fn refine_diff(
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    diff: &SequenceDiff,
    timeout: &Timeout,
    consider_whitespace_changes: bool,
) -> RefinedDiff {
    let slice1 =
        CharSliceSequence::new(original_lines, diff.seq1_range, consider_whitespace_changes);
    let slice2 =
        CharSliceSequence::new(modified_lines, diff.seq2_range, consider_whitespace_changes);

    let result = if slice1.len() + slice2.len() < DP_REFINEMENT_LIMIT {
        dp::diff(&slice1, &slice2, timeout, None)
    } else {
        myers::diff(&slice1, &slice2, timeout)
    };

    let mut diffs = optimize(&slice1, &slice2, result.diffs);
    diffs = cover_full_words(&slice1, &slice2, diffs);
    diffs = smoothen(&slice1, &slice2, diffs);
    diffs = remove_random_matches(&slice1, &slice2, diffs);

    let mappings = diffs
        .iter()
        .map(|d| {
            RangeMapping::new(
                slice1.translate_range(d.seq1_range),
                slice2.translate_range(d.seq2_range),
            )
        })
        .collect();
    RefinedDiff { mappings, hit_timeout: result.hit_timeout }
}

/// Rolling accumulator over the words touched by consecutive diffs.
struct WordPair {
    s1: OffsetRange,
    s2: OffsetRange,
    /// Characters of side 1 deleted within the accumulated word ranges.
    deleted: usize,
    /// Characters of side 2 added within the accumulated word ranges.
    added: usize,
    /// Number of diffs folded into the accumulator.
    count: usize,
}

/// Extend diffs to cover whole words where several small edits fall into
/// the same word: a word with dense enough changes reads better as a
/// single word-level edit.
pub fn cover_full_words(
    seq1: &CharSliceSequence,
    seq2: &CharSliceSequence,
    diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    let mut additional: Vec<SequenceDiff> = Vec::new();
    let mut last_modified_word: Option<WordPair> = None;

    fn flush(acc: &mut Option<WordPair>, additional: &mut Vec<SequenceDiff>) {
        if let Some(w) = acc.take() {
            // The unchanged counts of the two sides can disagree here;
            // side 1 decides.
            let unchanged = w.s1.len().saturating_sub(w.deleted);
            if w.deleted.max(w.added) + (w.count - 1) > unchanged {
                additional.push(SequenceDiff::new(w.s1, w.s2));
            }
        }
    }

    for s in &diffs {
        let w1_before =
            s.seq1_range.start.checked_sub(1).and_then(|o| seq1.find_word_containing(o));
        let w2_before =
            s.seq2_range.start.checked_sub(1).and_then(|o| seq2.find_word_containing(o));
        let w1_after = seq1.find_word_containing(s.seq1_range.end_exclusive);
        let w2_after = seq2.find_word_containing(s.seq2_range.end_exclusive);

        let mut word_pairs: Vec<(OffsetRange, OffsetRange)> = Vec::new();
        match (w1_before, w2_before, w1_after, w2_after) {
            (Some(a), Some(b), Some(c), Some(d)) if a == c && b == d => {
                word_pairs.push((a, b));
            }
            _ => {
                if let (Some(a), Some(b)) = (w1_before, w2_before) {
                    word_pairs.push((a, b));
                }
                if let (Some(c), Some(d)) = (w1_after, w2_after) {
                    word_pairs.push((c, d));
                }
            }
        }

        for (w1, w2) in word_pairs {
            let contained = matches!(
                &last_modified_word,
                Some(acc) if acc.s1.contains_range(&w1) && acc.s2.contains_range(&w2)
            );
            if !contained {
                let extendable = matches!(
                    &last_modified_word,
                    Some(acc) if !(acc.s1.end_exclusive < w1.start && acc.s2.end_exclusive < w2.start)
                );
                if extendable {
                    // The new word overlaps or touches the accumulated
                    // ranges: widen them, counting the skipped gap as
                    // changed on both sides.
                    let acc = last_modified_word.as_mut().unwrap();
                    acc.deleted +=
                        OffsetRange::try_new(acc.s1.end_exclusive, w1.start).map_or(0, |r| r.len());
                    acc.added +=
                        OffsetRange::try_new(acc.s2.end_exclusive, w2.start).map_or(0, |r| r.len());
                    acc.s1 = acc.s1.join(&w1);
                    acc.s2 = acc.s2.join(&w2);
                } else {
                    flush(&mut last_modified_word, &mut additional);
                    last_modified_word =
                        Some(WordPair { s1: w1, s2: w2, deleted: 0, added: 0, count: 0 });
                }
            }
            let acc = last_modified_word.as_mut().unwrap();
            acc.count += 1;
            acc.deleted += w1.intersect(&s.seq1_range).map_or(0, |r| r.len());
            acc.added += w2.intersect(&s.seq2_range).map_or(0, |r| r.len());
        }
    }
    flush(&mut last_modified_word, &mut additional);

    merge_diffs(diffs, additional)
}

/// Merge two start-ordered diff lists, joining results that touch or
/// overlap their predecessor.
fn merge_diffs(original: Vec<SequenceDiff>, additional: Vec<SequenceDiff>) -> Vec<SequenceDiff> {
    if additional.is_empty() {
        return original;
    }
    let mut result: Vec<SequenceDiff> = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < original.len() || j < additional.len() {
        let next = if i < original.len()
            && (j >= additional.len()
                || original[i].seq1_range.start < additional[j].seq1_range.start)
        {
            i += 1;
            original[i - 1]
        } else {
            j += 1;
            additional[j - 1]
        };
        match result.last_mut() {
            Some(last) if last.seq1_range.end_exclusive >= next.seq1_range.start => {
                *last = last.join(&next);
            }
            _ => result.push(next),
        }
    }
    result
}

const SHORT_MATCH_MAX_NON_WS: usize = 4;
const LONG_DIFF_MIN_SPAN: usize = 5;
const MAX_JOIN_ROUNDS: usize = 10;

/// Delete accidental tiny matches inside otherwise-modified regions: two
/// diffs separated by an unchanged run of at most four non-whitespace
/// characters are joined when either neighbour is a substantial edit.
pub fn remove_random_matches(
    seq1: &CharSliceSequence,
    _seq2: &CharSliceSequence,
    mut diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    if diffs.is_empty() {
        return diffs;
    }
    for _round in 0..MAX_JOIN_ROUNDS {
        let mut joined_any = false;
        let mut result: Vec<SequenceDiff> = vec![diffs[0]];
        for &cur in &diffs[1..] {
            let last = *result.last().unwrap();
            let unchanged =
                OffsetRange::new(last.seq1_range.end_exclusive, cur.seq1_range.start);
            let non_ws = seq1
                .slice_text(unchanged)
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .count();
            let should_join = non_ws <= SHORT_MATCH_MAX_NON_WS
                && (last.seq1_range.len() + last.seq2_range.len() > LONG_DIFF_MIN_SPAN
                    || cur.seq1_range.len() + cur.seq2_range.len() > LONG_DIFF_MIN_SPAN);
            if should_join {
                joined_any = true;
                *result.last_mut().unwrap() = last.join(&cur);
            } else {
                result.push(cur);
            }
        }
        diffs = result;
        if !joined_any {
            break;
        }
    }
    diffs
}

const SHORT_LINE_MATCH_MAX_LINES: usize = 4;
const SHORT_LINE_MATCH_MAX_TEXT: usize = 20;

/// The line-level counterpart of [`remove_random_matches`]: a handful of
/// short unchanged lines between two substantial hunks is a coincidental
/// match, not meaningful shared structure.
pub fn remove_random_line_matches(
    seq1: &LineSequence<'_>,
    _seq2: &LineSequence<'_>,
    mut diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    if diffs.is_empty() {
        return diffs;
    }
    for _round in 0..MAX_JOIN_ROUNDS {
        let mut joined_any = false;
        let mut result: Vec<SequenceDiff> = vec![diffs[0]];
        for &cur in &diffs[1..] {
            let last = *result.last().unwrap();
            let gap_lines = cur.seq1_range.start - last.seq1_range.end_exclusive;
            let gap_text: usize = (last.seq1_range.end_exclusive..cur.seq1_range.start)
                .map(|i| seq1.trimmed_len(i))
                .sum();
            let should_join = gap_lines <= SHORT_LINE_MATCH_MAX_LINES
                && gap_text <= SHORT_LINE_MATCH_MAX_TEXT
                && (last.seq1_range.len() + last.seq2_range.len() > LONG_DIFF_MIN_SPAN
                    || cur.seq1_range.len() + cur.seq2_range.len() > LONG_DIFF_MIN_SPAN);
            if should_join {
                joined_any = true;
                *result.last_mut().unwrap() = last.join(&cur);
            } else {
                result.push(cur);
            }
        }
        diffs = result;
        if !joined_any {
            break;
        }
    }
    diffs
}
