//! Myers O(ND) diff.
//!
//! Implements Eugene Myers' difference algorithm ("An O(ND) Difference
//! Algorithm and Its Variations", 1986) over abstract sequences, with
//! common prefix/suffix trimming before the search. The full V-array is
//! kept per step for backtracking.

use crate::{DiffAlgorithmResult, Sequence, SequenceDiff, Timeout};
use textdiff_range::OffsetRange;

/// Compute a diff between two sequences.
///
/// The timeout is polled once per edit-distance step; on expiry the
/// trivial whole-range diff is returned with `hit_timeout` set.
pub fn diff<S1, S2>(seq1: &S1, seq2: &S2, timeout: &Timeout) -> DiffAlgorithmResult
where
    S1: Sequence + ?Sized,
    S2: Sequence + ?Sized,
{
    let len1 = seq1.len();
    let len2 = seq2.len();
    if len1 == 0 && len2 == 0 {
        return DiffAlgorithmResult::new(Vec::new());
    }
    if len1 == 0 || len2 == 0 {
        return DiffAlgorithmResult::trivial(len1, len2);
    }

    // Trim the common prefix and suffix; the O(ND) search runs on the middle.
    let mut prefix = 0;
    while prefix < len1 && prefix < len2 && seq1.get_element(prefix) == seq2.get_element(prefix) {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < len1 - prefix
        && suffix < len2 - prefix
        && seq1.get_element(len1 - 1 - suffix) == seq2.get_element(len2 - 1 - suffix)
    {
        suffix += 1;
    }

    let n = len1 - prefix - suffix;
    let m = len2 - prefix - suffix;
    if n == 0 && m == 0 {
        return DiffAlgorithmResult::new(Vec::new());
    }
    if n == 0 || m == 0 {
        return DiffAlgorithmResult::new(vec![SequenceDiff::new(
            OffsetRange::of_length(prefix, n),
            OffsetRange::of_length(prefix, m),
        )]);
    }

    let elem1 = |x: usize| seq1.get_element(prefix + x);
    let elem2 = |y: usize| seq2.get_element(prefix + y);

    // v[k + offset] = furthest-reaching x on diagonal k. One snapshot of v
    // is kept per step d so the path can be reconstructed.
    let max_d = n + m;
    let offset = max_d as isize;
    let mut v = vec![0usize; 2 * max_d + 1];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    'outer: for d in 0..=max_d {
        if !timeout.is_valid() {
            return DiffAlgorithmResult::trivial_timed_out(len1, len2);
        }
        let mut row = v.clone();
        let mut k = -(d as isize);
        while k <= d as isize {
            let mut x = if k == -(d as isize)
                || (k != d as isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                // Step down (insertion).
                v[(k + 1 + offset) as usize]
            } else {
                // Step right (deletion).
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = (x as isize - k) as usize;

            // Follow the snake.
            while x < n && y < m && elem1(x) == elem2(y) {
                x += 1;
                y += 1;
            }

            row[(k + offset) as usize] = x;
            if x >= n && y >= m {
                trace.push(row);
                break 'outer;
            }
            k += 2;
        }
        trace.push(row.clone());
        v = row;
    }

    let ops = backtrack(&trace, n, m, offset);
    DiffAlgorithmResult::new(ops_to_diffs(&ops, prefix))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Walk the trace backwards from `(n, m)`, reproducing each step's choice
/// to recover the edit path.
fn backtrack(trace: &[Vec<usize>], n: usize, m: usize, offset: isize) -> Vec<Op> {
    let mut ops = Vec::with_capacity(n + m);
    let mut x = n;
    let mut y = m;

    for d in (0..trace.len()).rev() {
        let k = x as isize - y as isize;
        let prev_k = if d == 0 {
            k
        } else if k == -(d as isize)
            || (k != d as isize
                && trace[d - 1][(k - 1 + offset) as usize] < trace[d - 1][(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { trace[d - 1][(prev_k + offset) as usize] };
        let prev_y = (prev_x as isize - prev_k) as usize;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            ops.push(Op::Equal);
        }
        if d > 0 {
            if prev_k == k + 1 {
                y -= 1;
                ops.push(Op::Insert);
            } else {
                x -= 1;
                ops.push(Op::Delete);
            }
        }
    }

    ops.reverse();
    ops
}

/// Group runs of non-equal ops into diffs, shifted by the trimmed prefix.
fn ops_to_diffs(ops: &[Op], prefix: usize) -> Vec<SequenceDiff> {
    let mut diffs: Vec<SequenceDiff> = Vec::new();
    let mut x = 0usize;
    let mut y = 0usize;
    let mut run_start: Option<(usize, usize)> = None;
    for op in ops {
        match op {
            Op::Equal => {
                if let Some((s1, s2)) = run_start.take() {
                    diffs.push(SequenceDiff::new(OffsetRange::new(s1, x), OffsetRange::new(s2, y)));
                }
                x += 1;
                y += 1;
            }
            Op::Delete => {
                run_start.get_or_insert((x, y));
                x += 1;
            }
            Op::Insert => {
                run_start.get_or_insert((x, y));
                y += 1;
            }
        }
    }
    if let Some((s1, s2)) = run_start {
        diffs.push(SequenceDiff::new(OffsetRange::new(s1, x), OffsetRange::new(s2, y)));
    }
    diffs.into_iter().map(|d| d.delta(prefix as isize)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_covers, ByteSequence};

    fn run(a: &[u8], b: &[u8]) -> Vec<SequenceDiff> {
        let s1 = ByteSequence(a);
        let s2 = ByteSequence(b);
        let result = diff(&s1, &s2, &Timeout::infinite());
        assert!(!result.hit_timeout);
        assert_covers(&s1, &s2, &result.diffs);
        result.diffs
    }

    #[test]
    fn identical() {
        assert!(run(b"abc", b"abc").is_empty());
        assert!(run(b"", b"").is_empty());
    }

    #[test]
    fn all_different() {
        let diffs = run(b"ab", b"cd");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].seq1_range, OffsetRange::new(0, 2));
        assert_eq!(diffs[0].seq2_range, OffsetRange::new(0, 2));
    }

    #[test]
    fn insert_at_end() {
        let diffs = run(b"ab", b"abc");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].seq1_range, OffsetRange::new(2, 2));
        assert_eq!(diffs[0].seq2_range, OffsetRange::new(2, 3));
    }

    #[test]
    fn delete_from_middle() {
        let diffs = run(b"abc", b"ac");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].seq1_range.len(), 1);
        assert!(diffs[0].seq2_range.is_empty());
    }

    #[test]
    fn empty_sides() {
        let diffs = run(b"", b"ab");
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].seq1_range.is_empty());
        assert_eq!(diffs[0].seq2_range.len(), 2);

        let diffs = run(b"ab", b"");
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].seq2_range.is_empty());
    }

    #[test]
    fn two_separate_edits() {
        let diffs = run(b"aXbbbbYc", b"aPbbbbQc");
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].seq1_range, OffsetRange::new(1, 2));
        assert_eq!(diffs[1].seq1_range, OffsetRange::new(6, 7));
    }

    #[test]
    fn expired_timeout_degrades_to_trivial() {
        let s1 = ByteSequence(b"abcdef");
        let s2 = ByteSequence(b"abXdef");
        let timeout =
            Timeout::Deadline(std::time::Instant::now() - std::time::Duration::from_millis(1));
        let result = diff(&s1, &s2, &timeout);
        assert!(result.hit_timeout);
        assert_eq!(result.diffs.len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reconstructs_for_arbitrary_inputs(
                a in proptest::collection::vec(0u8..4, 0..24),
                b in proptest::collection::vec(0u8..4, 0..24),
            ) {
                let s1 = ByteSequence(&a);
                let s2 = ByteSequence(&b);
                let result = diff(&s1, &s2, &Timeout::infinite());
                prop_assert!(!result.hit_timeout);
                assert_covers(&s1, &s2, &result.diffs);
            }
        }
    }
}
