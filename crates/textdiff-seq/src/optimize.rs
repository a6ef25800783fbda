//! Post-processors that reshape raw kernel output for human readability.
//!
//! `optimize` relocates insertions/deletions to the highest-scoring
//! boundaries and joins diffs that touch after relocation. `smoothen`
//! absorbs very small unchanged runs between neighbouring diffs.

use crate::{Sequence, SequenceDiff};
use textdiff_range::OffsetRange;

/// Join touching diffs, slide one-side-empty diffs to better boundaries,
/// and join again. Earlier positions win ties.
pub fn optimize<S1, S2>(seq1: &S1, seq2: &S2, diffs: Vec<SequenceDiff>) -> Vec<SequenceDiff>
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    let diffs = join_diffs(seq1, seq2, diffs);
    let diffs = shift_diffs(seq1, seq2, diffs);
    join_diffs(seq1, seq2, diffs)
}

/// Join neighbouring diffs separated by an unchanged run of at most two
/// elements on either side.
pub fn smoothen<S1, S2>(_seq1: &S1, _seq2: &S2, diffs: Vec<SequenceDiff>) -> Vec<SequenceDiff>
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    let mut result: Vec<SequenceDiff> = Vec::new();
    for cur in diffs {
        match result.last_mut() {
            Some(last)
                if cur.seq1_range.start - last.seq1_range.end_exclusive <= 2
                    || cur.seq2_range.start - last.seq2_range.end_exclusive <= 2 =>
            {
                *last = last.join(&cur);
            }
            _ => result.push(cur),
        }
    }
    result
}

/// Merge diffs that touch, sliding one-side-empty diffs left over repeated
/// content when that lets them fuse with their predecessor.
fn join_diffs<S1, S2>(seq1: &S1, seq2: &S2, diffs: Vec<SequenceDiff>) -> Vec<SequenceDiff>
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    let mut result: Vec<SequenceDiff> = Vec::new();
    for mut cur in diffs {
        let prev = match result.last() {
            Some(prev) => *prev,
            None => {
                result.push(cur);
                continue;
            }
        };

        if cur.seq1_range.is_empty() || cur.seq2_range.is_empty() {
            // The unchanged run separating two diffs has the same length on
            // both sequences.
            let gap = cur.seq1_range.start - prev.seq1_range.end_exclusive;
            let mut d = 1;
            while d <= gap {
                if !seq1.is_strongly_equal(cur.seq1_range.start - d, cur.seq1_range.end_exclusive - d)
                    || !seq2.is_strongly_equal(cur.seq2_range.start - d, cur.seq2_range.end_exclusive - d)
                {
                    break;
                }
                d += 1;
            }
            d -= 1;
            if d == gap {
                // The whole gap repeats: the diff slides onto its predecessor.
                *result.last_mut().unwrap() = SequenceDiff::new(
                    OffsetRange::new(prev.seq1_range.start, cur.seq1_range.end_exclusive - gap),
                    OffsetRange::new(prev.seq2_range.start, cur.seq2_range.end_exclusive - gap),
                );
                continue;
            }
            cur = cur.delta(-(d as isize));
        }

        let prev = result.last_mut().unwrap();
        if cur.seq1_range.start == prev.seq1_range.end_exclusive
            && cur.seq2_range.start == prev.seq2_range.end_exclusive
        {
            *prev = prev.join(&cur);
        } else {
            result.push(cur);
        }
    }
    result
}

const MAX_SHIFT: isize = 100;

/// Slide each insertion/deletion within the gap to its neighbours to the
/// position with the best summed boundary score.
fn shift_diffs<S1, S2>(seq1: &S1, seq2: &S2, mut diffs: Vec<SequenceDiff>) -> Vec<SequenceDiff>
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    for i in 0..diffs.len() {
        // Keep one unchanged element between this diff and its neighbours.
        let valid1_start = if i > 0 { diffs[i - 1].seq1_range.end_exclusive + 1 } else { 0 };
        let valid2_start = if i > 0 { diffs[i - 1].seq2_range.end_exclusive + 1 } else { 0 };
        let valid1_end =
            if i + 1 < diffs.len() { diffs[i + 1].seq1_range.start - 1 } else { seq1.len() };
        let valid2_end =
            if i + 1 < diffs.len() { diffs[i + 1].seq2_range.start - 1 } else { seq2.len() };

        let diff = diffs[i];
        if diff.seq1_range.is_empty() {
            diffs[i] = shift_diff_to_better_position(
                diff,
                seq1,
                seq2,
                (valid1_start, valid1_end),
                (valid2_start, valid2_end),
            );
        } else if diff.seq2_range.is_empty() {
            diffs[i] = shift_diff_to_better_position(
                diff.swapped(),
                seq2,
                seq1,
                (valid2_start, valid2_end),
                (valid1_start, valid1_end),
            )
            .swapped();
        }
    }
    diffs
}

/// `diff.seq1_range` is empty: the inserted/deleted content lives entirely
/// in sequence 2, so shifts are validated against sequence 2's elements and
/// scored at both sequences' boundaries.
fn shift_diff_to_better_position<S1, S2>(
    diff: SequenceDiff,
    seq1: &S1,
    seq2: &S2,
    (valid1_start, valid1_end): (usize, usize),
    (valid2_start, valid2_end): (usize, usize),
) -> SequenceDiff
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    let start1 = diff.seq1_range.start as isize;
    let start2 = diff.seq2_range.start as isize;
    let end2 = diff.seq2_range.end_exclusive as isize;

    let mut delta_before: isize = 1;
    while start1 - delta_before >= valid1_start as isize
        && start2 - delta_before >= valid2_start as isize
        && seq2.is_strongly_equal((start2 - delta_before) as usize, (end2 - delta_before) as usize)
        && delta_before <= MAX_SHIFT
    {
        delta_before += 1;
    }
    delta_before -= 1;

    let mut delta_after: isize = 0;
    while start1 + delta_after < valid1_end as isize
        && end2 + delta_after < valid2_end as isize
        && seq2.is_strongly_equal((start2 + delta_after) as usize, (end2 + delta_after) as usize)
        && delta_after <= MAX_SHIFT
    {
        delta_after += 1;
    }

    if delta_before == 0 && delta_after == 0 {
        return diff;
    }

    let mut best_delta = 0;
    let mut best_score = -1;
    for delta in -delta_before..=delta_after {
        let score = seq1.get_boundary_score((start1 + delta) as usize)
            + seq2.get_boundary_score((start2 + delta) as usize)
            + seq2.get_boundary_score((end2 + delta) as usize);
        if score > best_score {
            best_score = score;
            best_delta = delta;
        }
    }
    diff.delta(best_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ByteSequence;
    use crate::{myers, Timeout};

    fn sd(s1: (usize, usize), s2: (usize, usize)) -> SequenceDiff {
        SequenceDiff::new(OffsetRange::new(s1.0, s1.1), OffsetRange::new(s2.0, s2.1))
    }

    #[test]
    fn join_merges_touching_diffs() {
        let a = ByteSequence(b"abcd");
        let b = ByteSequence(b"axyd");
        let joined = join_diffs(&a, &b, vec![sd((1, 2), (1, 2)), sd((2, 3), (2, 3))]);
        assert_eq!(joined, vec![sd((1, 3), (1, 3))]);
    }

    #[test]
    fn join_fuses_insertions_at_the_same_point() {
        let a = ByteSequence(b"ab");
        let b = ByteSequence(b"aXYb");
        let joined = join_diffs(&a, &b, vec![sd((1, 1), (1, 2)), sd((1, 1), (2, 3))]);
        assert_eq!(joined, vec![sd((1, 1), (1, 3))]);
    }

    #[test]
    fn smoothen_joins_small_gaps() {
        let a = ByteSequence(b"abXcdYef");
        let b = ByteSequence(b"abPcdQef");
        let diffs = vec![sd((2, 3), (2, 3)), sd((5, 6), (5, 6))];
        let smoothed = smoothen(&a, &b, diffs);
        assert_eq!(smoothed, vec![sd((2, 6), (2, 6))]);
    }

    #[test]
    fn smoothen_keeps_large_gaps() {
        let a = ByteSequence(b"abXcdefgY");
        let b = ByteSequence(b"abPcdefgQ");
        let diffs = vec![sd((2, 3), (2, 3)), sd((8, 9), (8, 9))];
        let smoothed = smoothen(&a, &b, diffs.clone());
        assert_eq!(smoothed, diffs);
    }

    /// A sequence with a strong boundary before every '|'.
    struct Scored<'a>(&'a [u8]);

    impl Sequence for Scored<'_> {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn get_element(&self, offset: usize) -> u32 {
            self.0[offset] as u32
        }

        fn get_boundary_score(&self, offset: usize) -> i32 {
            let after_pipe = offset > 0 && self.0[offset - 1] == b'|';
            if after_pipe {
                10
            } else {
                0
            }
        }
    }

    #[test]
    fn shift_prefers_high_boundary_score() {
        // Deleting one 'x' from "a|xxb" -> "a|xb": every position in the run
        // is equivalent, the boundary score picks the one after '|'.
        let s1 = Scored(b"a|xxxb");
        let s2 = Scored(b"a|xxb");
        let result = myers::diff(&s1, &s2, &Timeout::infinite());
        let optimized = optimize(&s1, &s2, result.diffs);
        assert_eq!(optimized, vec![sd((2, 3), (2, 2))]);
    }

    #[test]
    fn optimize_empty_input() {
        let a = ByteSequence(b"ab");
        let b = ByteSequence(b"ab");
        assert!(optimize(&a, &b, Vec::new()).is_empty());
    }
}
