//! Move detection: contiguous regions relocated rather than edited.
//!
//! Two complementary heuristics. Whole deletions are paired with whole
//! insertions by character-histogram similarity; unchanged relocated
//! blocks inside larger changes are found by trigram hashing over trimmed
//! line hashes, reconciled along diagonals. Candidates are then joined,
//! filtered, and refined individually.

use std::collections::{HashMap, HashSet};

use bstr::ByteSlice;
use textdiff_range::{LineRange, LineRangeSet};
use textdiff_seq::{SequenceDiff, Timeout};

use crate::mappings::{
    line_range_mappings_from_range_mappings, DetailedLineRangeMapping, LineRangeMapping, MovedText,
};
use crate::refine::refine_diff;

const MIN_FRAGMENT_LINES: usize = 3;
const SIMILARITY_THRESHOLD: f64 = 0.90;
const MIN_TRIGRAM_MOVE_LINES: usize = 3;
const MAX_JOIN_GAP: isize = 2;
const MIN_MOVED_TEXT_LEN: usize = 11;

/// Detect moved regions among the given changes.
pub fn compute_moves(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    original_hashes: &[u32],
    modified_hashes: &[u32],
    timeout: &Timeout,
    consider_whitespace_changes: bool,
) -> Vec<MovedText> {
    let (mut moves, excluded) =
        simple_deletion_insertion_moves(changes, original_lines, modified_lines, timeout);
    if !timeout.is_valid() {
        return Vec::new();
    }

    let remaining: Vec<&DetailedLineRangeMapping> = changes
        .iter()
        .enumerate()
        .filter(|(i, _)| !excluded.contains(i))
        .map(|(_, c)| c)
        .collect();
    moves.extend(unchanged_trigram_moves(&remaining, original_hashes, modified_hashes, timeout));

    let mut moves = join_close_consecutive_moves(moves);
    // Moves are shape-preserving; joining may have produced lopsided
    // candidates, which are discarded.
    moves.retain(|m| m.original.len() == m.modified.len());
    moves.retain(|m| trimmed_text_len(&m.original, original_lines) >= MIN_MOVED_TEXT_LEN);
    let moves = remove_moves_implied_by_changes(changes, moves);

    moves
        .into_iter()
        .map(|m| {
            let refined = refine_diff(
                original_lines,
                modified_lines,
                &SequenceDiff::new(m.original.to_offset_range(), m.modified.to_offset_range()),
                timeout,
                consider_whitespace_changes,
            );
            let mappings = line_range_mappings_from_range_mappings(
                &refined.mappings,
                original_lines,
                modified_lines,
                true,
            );
            MovedText::new(m, mappings)
        })
        .collect()
}

/// A line range summarized as a per-character histogram. The histogram is
/// indexed by byte value, with one `\n` counted per line.
struct LineRangeFragment {
    range: LineRange,
    /// Index of the change this fragment was built from.
    source: usize,
    total: u32,
    histogram: Box<[u32; 256]>,
}

impl LineRangeFragment {
    fn new(range: LineRange, lines: &[&[u8]], source: usize) -> Self {
        let mut histogram = Box::new([0u32; 256]);
        let mut total = 0u32;
        for line_number in range.iter() {
            for &b in lines[line_number - 1] {
                histogram[b as usize] += 1;
                total += 1;
            }
            histogram[b'\n' as usize] += 1;
            total += 1;
        }
        Self { range, source, total, histogram }
    }

    /// `1 − Σ|h1[i] − h2[i]| / (total1 + total2)`, in `[−1, 1]`.
    fn similarity(&self, other: &LineRangeFragment) -> f64 {
        let sum_differences: u64 = self
            .histogram
            .iter()
            .zip(other.histogram.iter())
            .map(|(&a, &b)| (a as i64 - b as i64).unsigned_abs())
            .sum();
        1.0 - sum_differences as f64 / (self.total + other.total) as f64
    }
}

/// Pair whole deletions with whole insertions of near-identical content.
/// Returns the moves plus the indices of the consumed changes.
fn simple_deletion_insertion_moves(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    timeout: &Timeout,
) -> (Vec<LineRangeMapping>, HashSet<usize>) {
    let deletions: Vec<LineRangeFragment> = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.modified.is_empty() && c.original.len() >= MIN_FRAGMENT_LINES)
        .map(|(i, c)| LineRangeFragment::new(c.original, original_lines, i))
        .collect();
    let insertions: Vec<LineRangeFragment> = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.original.is_empty() && c.modified.len() >= MIN_FRAGMENT_LINES)
        .map(|(i, c)| LineRangeFragment::new(c.modified, modified_lines, i))
        .collect();

    let mut moves = Vec::new();
    let mut excluded = HashSet::new();
    let mut used = vec![false; insertions.len()];
    for deletion in &deletions {
        let mut best: Option<usize> = None;
        let mut best_similarity = -1.0f64;
        for (i, insertion) in insertions.iter().enumerate() {
            if used[i] {
                continue;
            }
            let similarity = deletion.similarity(insertion);
            if similarity > best_similarity {
                best_similarity = similarity;
                best = Some(i);
            }
        }
        if best_similarity > SIMILARITY_THRESHOLD {
            if let Some(i) = best {
                used[i] = true;
                moves.push(LineRangeMapping::new(deletion.range, insertions[i].range));
                excluded.insert(deletion.source);
                excluded.insert(insertions[i].source);
            }
        }
        if !timeout.is_valid() {
            return (moves, excluded);
        }
    }
    (moves, excluded)
}

#[derive(Debug, Clone, Copy)]
struct PossibleMapping {
    original: LineRange,
    modified: LineRange,
}

/// Find relocated unchanged blocks: index every three-line window of the
/// changes' original ranges by its trimmed-hash trigram, sweep the
/// modified ranges against the index while growing diagonal runs, then
/// allocate candidates longest-first through taken-line bookkeeping.
fn unchanged_trigram_moves(
    changes: &[&DetailedLineRangeMapping],
    original_hashes: &[u32],
    modified_hashes: &[u32],
    timeout: &Timeout,
) -> Vec<LineRangeMapping> {
    let mut original_trigrams: HashMap<(u32, u32, u32), Vec<LineRange>> = HashMap::new();
    for change in changes {
        let range = change.original;
        if range.len() < 3 {
            continue;
        }
        for i in range.start_line_number..range.end_line_number_exclusive - 2 {
            let key = (original_hashes[i - 1], original_hashes[i], original_hashes[i + 1]);
            original_trigrams.entry(key).or_default().push(LineRange::new(i, i + 3));
        }
    }

    let mut possible: Vec<PossibleMapping> = Vec::new();
    let mut ordered: Vec<&DetailedLineRangeMapping> = changes.to_vec();
    ordered.sort_by_key(|c| c.modified.start_line_number);

    for change in &ordered {
        let range = change.modified;
        // Candidates extended or created by the previous window, as indices
        // into `possible`.
        let mut last_round: Vec<usize> = Vec::new();
        if range.len() >= 3 {
            for i in range.start_line_number..range.end_line_number_exclusive - 2 {
                let key = (modified_hashes[i - 1], modified_hashes[i], modified_hashes[i + 1]);
                let current_modified = LineRange::new(i, i + 3);
                let mut next_round: Vec<usize> = Vec::new();
                if let Some(ranges) = original_trigrams.get(&key) {
                    for &original_range in ranges {
                        // Grow a candidate whose windows both advanced by
                        // exactly one line; otherwise open a new one.
                        let grown = last_round.iter().copied().find(|&idx| {
                            possible[idx].original.end_line_number_exclusive + 1
                                == original_range.end_line_number_exclusive
                                && possible[idx].modified.end_line_number_exclusive + 1
                                    == current_modified.end_line_number_exclusive
                        });
                        let idx = match grown {
                            Some(idx) => {
                                let p = &mut possible[idx];
                                p.original = LineRange::new(
                                    p.original.start_line_number,
                                    original_range.end_line_number_exclusive,
                                );
                                p.modified = LineRange::new(
                                    p.modified.start_line_number,
                                    current_modified.end_line_number_exclusive,
                                );
                                idx
                            }
                            None => {
                                possible.push(PossibleMapping {
                                    original: original_range,
                                    modified: current_modified,
                                });
                                possible.len() - 1
                            }
                        };
                        next_round.push(idx);
                    }
                }
                last_round = next_round;
            }
        }
        if !timeout.is_valid() {
            return Vec::new();
        }
    }

    possible.sort_by_key(|m| std::cmp::Reverse(m.modified.len()));

    let mut moves = Vec::new();
    let mut modified_taken = LineRangeSet::new();
    let mut original_taken = LineRangeSet::new();
    for mapping in &possible {
        let delta =
            mapping.modified.start_line_number as isize - mapping.original.start_line_number as isize;
        let modified_sections = modified_taken.subtract_from(&mapping.modified);
        let original_translated =
            original_taken.subtract_from(&mapping.original).get_with_delta(delta);
        let intersected = modified_sections.get_intersection(&original_translated);
        for section in intersected.ranges() {
            if section.len() < MIN_TRIGRAM_MOVE_LINES {
                continue;
            }
            let original = section.delta(-delta);
            moves.push(LineRangeMapping::new(original, *section));
            modified_taken.add_range(section);
            original_taken.add_range(&original);
        }
    }
    moves
}

/// Join moves that follow each other closely on both sides.
fn join_close_consecutive_moves(mut moves: Vec<LineRangeMapping>) -> Vec<LineRangeMapping> {
    if moves.is_empty() {
        return moves;
    }
    moves.sort_by_key(|m| m.original.start_line_number);
    let mut result = vec![moves[0]];
    for &current in &moves[1..] {
        let last = *result.last().unwrap();
        let original_dist = current.original.start_line_number as isize
            - last.original.end_line_number_exclusive as isize;
        let modified_dist = current.modified.start_line_number as isize
            - last.modified.end_line_number_exclusive as isize;
        if original_dist >= 0 && modified_dist >= 0 && original_dist + modified_dist <= MAX_JOIN_GAP
        {
            *result.last_mut().unwrap() = last.join(&current);
        } else {
            result.push(current);
        }
    }
    result
}

/// Drop moves whose relocation is already explained by the preceding
/// change's line delta: when the nearest change before the move's end is
/// the same on both sides, nothing actually moved.
fn remove_moves_implied_by_changes(
    changes: &[DetailedLineRangeMapping],
    moves: Vec<LineRangeMapping>,
) -> Vec<LineRangeMapping> {
    moves
        .into_iter()
        .filter(|m| {
            let by_original = changes
                .partition_point(|c| c.original.start_line_number < m.original.end_line_number_exclusive);
            let by_modified = changes
                .partition_point(|c| c.modified.start_line_number < m.modified.end_line_number_exclusive);
            by_original != by_modified
        })
        .collect()
}

/// Length of the range's trimmed text, joined with newlines.
fn trimmed_text_len(range: &LineRange, lines: &[&[u8]]) -> usize {
    let text: usize = range.iter().map(|ln| lines[ln - 1].trim().len()).sum();
    text + range.len().saturating_sub(1)
}
