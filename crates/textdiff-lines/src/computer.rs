//! Top-level diff orchestration.

use std::collections::HashMap;

use bstr::ByteSlice;
use textdiff_range::{LineRange, OffsetRange, Position, TextRange};
use textdiff_seq::optimize::optimize;
use textdiff_seq::{dp, myers, Sequence, SequenceDiff, Timeout};

use crate::line_sequence::LineSequence;
use crate::mappings::{
    check_line_range_mappings, line_range_mappings_from_range_mappings, DetailedLineRangeMapping,
    RangeMapping,
};
use crate::refine::{refine_diff, remove_random_line_matches};
use crate::{moves, DiffOptions, LinesDiff};

/// Above this combined line count the quadratic DP kernel is too
/// expensive and Myers is used for the line-level pass.
const LINE_DP_LIMIT: usize = 1700;

/// Alignment reward for a pair of equal empty lines. Far below the reward
/// of any non-empty line, so the DP kernel does not anchor an alignment on
/// arbitrary blank lines.
const EMPTY_LINE_ALIGNMENT_SCORE: f64 = 0.1;

/// Alignment reward for lines that are equal after trimming but not
/// byte-identical.
const TRIM_EQUAL_ALIGNMENT_SCORE: f64 = 0.99;

/// Diff two documents, given as arrays of lines without terminators.
///
/// Both inputs must contain at least one line (an empty document is one
/// empty line). The result is always well-formed; if the time budget runs
/// out it may be partial, with `hit_timeout` set.
pub fn compute_diff(
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    options: &DiffOptions,
) -> LinesDiff {
    if original_lines.len() <= 1 && original_lines == modified_lines {
        return LinesDiff { changes: Vec::new(), moves: Vec::new(), hit_timeout: false };
    }
    if (original_lines.len() == 1 && original_lines[0].is_empty())
        || (modified_lines.len() == 1 && modified_lines[0].is_empty())
    {
        // One side is the empty document: a single mapping replaces
        // everything with everything.
        let change = DetailedLineRangeMapping::new(
            LineRange::new(1, original_lines.len() + 1),
            LineRange::new(1, modified_lines.len() + 1),
            vec![RangeMapping::new(
                whole_document_range(original_lines),
                whole_document_range(modified_lines),
            )],
        );
        return LinesDiff { changes: vec![change], moves: Vec::new(), hit_timeout: false };
    }

    let timeout = Timeout::from_max_duration_ms(options.max_computation_time_ms);
    let consider_whitespace_changes = !options.ignore_trim_whitespace;

    // One perfect hash per distinct trimmed line content, shared across
    // both inputs.
    let mut interner: HashMap<&[u8], u32> = HashMap::new();
    let original_hashes = assign_hashes(&mut interner, original_lines);
    let modified_hashes = assign_hashes(&mut interner, modified_lines);

    let seq1 = LineSequence::new(&original_hashes, original_lines);
    let seq2 = LineSequence::new(&modified_hashes, modified_lines);

    let line_result = if seq1.len() + seq2.len() < LINE_DP_LIMIT {
        let score = |o1: usize, o2: usize| -> f64 {
            if original_lines[o1] == modified_lines[o2] {
                if modified_lines[o2].is_empty() {
                    EMPTY_LINE_ALIGNMENT_SCORE
                } else {
                    1.0 + (1.0 + modified_lines[o2].len() as f64).ln()
                }
            } else {
                TRIM_EQUAL_ALIGNMENT_SCORE
            }
        };
        dp::diff(&seq1, &seq2, &timeout, Some(&score))
    } else {
        myers::diff(&seq1, &seq2, &timeout)
    };
    let mut hit_timeout = line_result.hit_timeout;

    let mut line_diffs = optimize(&seq1, &seq2, line_result.diffs);
    line_diffs = remove_random_line_matches(&seq1, &seq2, line_diffs);

    let mut alignments: Vec<RangeMapping> = Vec::new();
    let mut seq1_last_start = 0;
    let mut seq2_last_start = 0;

    for diff in &line_diffs {
        // Between changes, both sides skip the same number of equal lines.
        debug_assert_eq!(
            diff.seq1_range.start - seq1_last_start,
            diff.seq2_range.start - seq2_last_start
        );
        let equal_lines_count = diff.seq1_range.start - seq1_last_start;
        scan_for_whitespace_changes(
            original_lines,
            modified_lines,
            seq1_last_start,
            seq2_last_start,
            equal_lines_count,
            consider_whitespace_changes,
            &timeout,
            &mut alignments,
            &mut hit_timeout,
        );
        seq1_last_start = diff.seq1_range.end_exclusive;
        seq2_last_start = diff.seq2_range.end_exclusive;

        let refined =
            refine_diff(original_lines, modified_lines, diff, &timeout, consider_whitespace_changes);
        if refined.hit_timeout {
            hit_timeout = true;
        }
        alignments.extend(refined.mappings);
    }
    scan_for_whitespace_changes(
        original_lines,
        modified_lines,
        seq1_last_start,
        seq2_last_start,
        original_lines.len() - seq1_last_start,
        consider_whitespace_changes,
        &timeout,
        &mut alignments,
        &mut hit_timeout,
    );

    let changes =
        line_range_mappings_from_range_mappings(&alignments, original_lines, modified_lines, false);

    let moves = if options.compute_moves {
        moves::compute_moves(
            &changes,
            original_lines,
            modified_lines,
            &original_hashes,
            &modified_hashes,
            &timeout,
            consider_whitespace_changes,
        )
    } else {
        Vec::new()
    };

    debug_assert!(validate(&changes, original_lines, modified_lines));
    LinesDiff { changes, moves, hit_timeout }
}

fn whole_document_range(lines: &[&[u8]]) -> TextRange {
    TextRange::new(
        Position::new(1, 1),
        Position::new(lines.len(), lines[lines.len() - 1].len() + 1),
    )
}

fn assign_hashes<'a>(interner: &mut HashMap<&'a [u8], u32>, lines: &[&'a [u8]]) -> Vec<u32> {
    lines
        .iter()
        .map(|line| {
            let trimmed = line.trim();
            let next = interner.len() as u32;
            *interner.entry(trimmed).or_insert(next)
        })
        .collect()
}

/// Lines inside an equal run hash equal only after trimming; when
/// whitespace is significant, refine every pair that is not byte-identical
/// so the whitespace edit shows up as a character mapping.
#[allow(clippy::too_many_arguments)]
fn scan_for_whitespace_changes(
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    seq1_start: usize,
    seq2_start: usize,
    equal_lines_count: usize,
    consider_whitespace_changes: bool,
    timeout: &Timeout,
    alignments: &mut Vec<RangeMapping>,
    hit_timeout: &mut bool,
) {
    if !consider_whitespace_changes {
        return;
    }
    for i in 0..equal_lines_count {
        let seq1_offset = seq1_start + i;
        let seq2_offset = seq2_start + i;
        if original_lines[seq1_offset] != modified_lines[seq2_offset] {
            let refined = refine_diff(
                original_lines,
                modified_lines,
                &SequenceDiff::new(
                    OffsetRange::of_length(seq1_offset, 1),
                    OffsetRange::of_length(seq2_offset, 1),
                ),
                timeout,
                true,
            );
            alignments.extend(refined.mappings);
            if refined.hit_timeout {
                *hit_timeout = true;
            }
        }
    }
}

/// Every range endpoint sits inside its document and the change list
/// satisfies the ordering and gap invariants.
fn validate(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
) -> bool {
    fn position_ok(p: &Position, lines: &[&[u8]]) -> bool {
        p.line_number >= 1
            && p.line_number <= lines.len()
            && p.column >= 1
            && p.column <= lines[p.line_number - 1].len() + 1
    }
    fn line_range_ok(r: &LineRange, lines: &[&[u8]]) -> bool {
        r.start_line_number >= 1
            && r.start_line_number <= lines.len() + 1
            && r.end_line_number_exclusive >= 1
            && r.end_line_number_exclusive <= lines.len() + 1
    }
    changes.iter().all(|c| {
        line_range_ok(&c.original, original_lines)
            && line_range_ok(&c.modified, modified_lines)
            && c.inner_changes.iter().all(|ic| {
                position_ok(&ic.original_range.start, original_lines)
                    && position_ok(&ic.original_range.end, original_lines)
                    && position_ok(&ic.modified_range.start, modified_lines)
                    && position_ok(&ic.modified_range.end, modified_lines)
            })
    }) && check_line_range_mappings(changes, original_lines, modified_lines, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_are_an_empty_diff() {
        let lines: Vec<&[u8]> = vec![b"a", b"b", b"c"];
        let diff = compute_diff(&lines, &lines, &DiffOptions::default());
        assert!(diff.changes.is_empty());
        assert!(diff.moves.is_empty());
        assert!(!diff.hit_timeout);
    }

    #[test]
    fn single_empty_line_fast_path() {
        let original: Vec<&[u8]> = vec![b""];
        let modified: Vec<&[u8]> = vec![b"a", b"b"];
        let diff = compute_diff(&original, &modified, &DiffOptions::default());
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].original, LineRange::new(1, 2));
        assert_eq!(diff.changes[0].modified, LineRange::new(1, 3));
        let inner = &diff.changes[0].inner_changes[0];
        assert_eq!(inner.original_range.end, Position::new(1, 1));
        assert_eq!(inner.modified_range.end, Position::new(2, 2));
    }

    #[test]
    fn trimmed_hashes_are_shared_across_inputs() {
        let mut interner = HashMap::new();
        let a: Vec<&[u8]> = vec![b"x", b"  x", b"y"];
        let b: Vec<&[u8]> = vec![b"y", b"x  "];
        let ha = assign_hashes(&mut interner, &a);
        let hb = assign_hashes(&mut interner, &b);
        assert_eq!(ha[0], ha[1]);
        assert_eq!(ha[0], hb[1]);
        assert_eq!(ha[2], hb[0]);
        assert_ne!(ha[0], ha[2]);
    }
}
