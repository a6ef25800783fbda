//! A set of line numbers, stored as sorted, coalesced line ranges.

use crate::LineRange;

/// A set of 1-based line numbers represented as sorted, pairwise
/// non-touching `LineRange`s. Touching ranges are coalesced on insert.
#[derive(Debug, Clone, Default)]
pub struct LineRangeSet {
    ranges: Vec<LineRange>,
}

impl LineRangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn from_ranges(ranges: Vec<LineRange>) -> Self {
        let mut set = Self::new();
        for r in ranges {
            set.add_range(&r);
        }
        set
    }

    /// The normalized ranges, sorted and non-touching.
    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, line_number: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(line_number))
    }

    /// Add `range` to the set, merging with every overlapping or touching
    /// member so the representation stays normalized.
    pub fn add_range(&mut self, range: &LineRange) {
        if range.is_empty() {
            return;
        }
        let first = self
            .ranges
            .partition_point(|r| r.end_line_number_exclusive < range.start_line_number);
        let after = self
            .ranges
            .partition_point(|r| r.start_line_number <= range.end_line_number_exclusive);
        if first == after {
            self.ranges.insert(first, *range);
        } else {
            let mut joined = *range;
            for r in &self.ranges[first..after] {
                joined = joined.join(r);
            }
            self.ranges.splice(first..after, std::iter::once(joined));
        }
    }

    /// The parts of `range` that are not in the set.
    pub fn subtract_from(&self, range: &LineRange) -> LineRangeSet {
        let mut result = Vec::new();
        let mut cursor = range.start_line_number;
        for r in &self.ranges {
            if r.end_line_number_exclusive <= range.start_line_number {
                continue;
            }
            if r.start_line_number >= range.end_line_number_exclusive {
                break;
            }
            if r.start_line_number > cursor {
                result.push(LineRange::new(cursor, r.start_line_number));
            }
            cursor = cursor.max(r.end_line_number_exclusive);
        }
        if cursor < range.end_line_number_exclusive {
            result.push(LineRange::new(cursor, range.end_line_number_exclusive));
        }
        LineRangeSet { ranges: result }
    }

    /// Every range shifted by `delta` lines.
    pub fn get_with_delta(&self, delta: isize) -> LineRangeSet {
        LineRangeSet {
            ranges: self.ranges.iter().map(|r| r.delta(delta)).collect(),
        }
    }

    /// The pointwise intersection of two sets.
    pub fn get_intersection(&self, other: &LineRangeSet) -> LineRangeSet {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = &self.ranges[i];
            let b = &other.ranges[j];
            if let Some(overlap) = a.intersect(b) {
                if !overlap.is_empty() {
                    result.push(overlap);
                }
            }
            if a.end_line_number_exclusive < b.end_line_number_exclusive {
                i += 1;
            } else {
                j += 1;
            }
        }
        LineRangeSet { ranges: result }
    }
}
