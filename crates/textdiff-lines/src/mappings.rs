//! Mapping types and aggregation of character mappings into line mappings.

use std::fmt;

use textdiff_range::{LineRange, TextRange};

/// A pair of document ranges asserting that the original range should be
/// replaced by the modified range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMapping {
    pub original_range: TextRange,
    pub modified_range: TextRange,
}

impl RangeMapping {
    pub fn new(original_range: TextRange, modified_range: TextRange) -> Self {
        Self { original_range, modified_range }
    }
}

impl fmt::Display for RangeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.original_range, self.modified_range)
    }
}

/// A pair of line ranges paired across the two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRangeMapping {
    pub original: LineRange,
    pub modified: LineRange,
}

impl LineRangeMapping {
    pub fn new(original: LineRange, modified: LineRange) -> Self {
        Self { original, modified }
    }

    /// The smallest mapping covering both.
    pub fn join(&self, other: &LineRangeMapping) -> LineRangeMapping {
        LineRangeMapping::new(
            self.original.join(&other.original),
            self.modified.join(&other.modified),
        )
    }
}

impl fmt::Display for LineRangeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.original, self.modified)
    }
}

/// A changed region: a line-range pair plus the ordered character-level
/// mappings it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedLineRangeMapping {
    pub original: LineRange,
    pub modified: LineRange,
    pub inner_changes: Vec<RangeMapping>,
}

impl DetailedLineRangeMapping {
    pub fn new(original: LineRange, modified: LineRange, inner_changes: Vec<RangeMapping>) -> Self {
        Self { original, modified, inner_changes }
    }

    pub fn line_range_mapping(&self) -> LineRangeMapping {
        LineRangeMapping::new(self.original, self.modified)
    }
}

/// A contiguous region that was relocated rather than edited. Both sides
/// cover the same number of lines; `changes` holds the edits within the
/// moved region, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedText {
    pub line_range_mapping: LineRangeMapping,
    pub changes: Vec<DetailedLineRangeMapping>,
}

impl MovedText {
    pub fn new(line_range_mapping: LineRangeMapping, changes: Vec<DetailedLineRangeMapping>) -> Self {
        debug_assert_eq!(line_range_mapping.original.len(), line_range_mapping.modified.len());
        Self { line_range_mapping, changes }
    }
}

/// Group character mappings into line-level changes.
///
/// Each mapping is first converted to a preliminary line-range pair (with
/// unchanged leading/trailing newlines excluded); mappings whose line
/// ranges overlap or touch on either side are then merged into a single
/// change covering their joined ranges.
pub fn line_range_mappings_from_range_mappings(
    alignments: &[RangeMapping],
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    allow_start_mismatch: bool,
) -> Vec<DetailedLineRangeMapping> {
    let mut changes: Vec<DetailedLineRangeMapping> = Vec::new();
    let mut prev_item: Option<LineRangeMapping> = None;
    for alignment in alignments {
        let m = get_line_range_mapping(alignment, original_lines, modified_lines);
        let grouped = match (&prev_item, changes.last_mut()) {
            (Some(prev), Some(last))
                if prev.original.overlap_or_touch(&m.original)
                    || prev.modified.overlap_or_touch(&m.modified) =>
            {
                last.original = last.original.join(&m.original);
                last.modified = last.modified.join(&m.modified);
                last.inner_changes.extend(m.inner_changes.iter().copied());
                true
            }
            _ => false,
        };
        let item_ranges = m.line_range_mapping();
        if !grouped {
            changes.push(m);
        }
        prev_item = Some(item_ranges);
    }

    debug_assert!(check_line_range_mappings(
        &changes,
        original_lines,
        modified_lines,
        allow_start_mismatch
    ));
    changes
}

/// Derive the line-range pair of a single character mapping.
fn get_line_range_mapping(
    mapping: &RangeMapping,
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
) -> DetailedLineRangeMapping {
    let orig = &mapping.original_range;
    let modi = &mapping.modified_range;

    // Both sides end at column 1 of a later line: the trailing newline is
    // unchanged, so the end line does not take part in the change.
    let mut line_end_delta: isize = 0;
    if modi.end.column == 1
        && orig.end.column == 1
        && orig.start.line_number <= orig.end.line_number
        && modi.start.line_number <= modi.end.line_number
    {
        line_end_delta = -1;
    }

    // Both sides start past the end of a line: the leading newline is
    // unchanged, so the change only begins on the next line.
    let mut line_start_delta: usize = 0;
    if modi.start.column - 1 >= modified_lines[modi.start.line_number - 1].len()
        && orig.start.column - 1 >= original_lines[orig.start.line_number - 1].len()
        && orig.start.line_number as isize <= orig.end.line_number as isize + line_end_delta
        && modi.start.line_number as isize <= modi.end.line_number as isize + line_end_delta
    {
        line_start_delta = 1;
    }

    let original = LineRange::new(
        orig.start.line_number + line_start_delta,
        (orig.end.line_number as isize + 1 + line_end_delta) as usize,
    );
    let modified = LineRange::new(
        modi.start.line_number + line_start_delta,
        (modi.end.line_number as isize + 1 + line_end_delta) as usize,
    );
    DetailedLineRangeMapping::new(original, modified, vec![*mapping])
}

/// Well-formedness of an ordered change list: the first change starts at
/// the same line on both sides, the tails agree, and adjacent changes are
/// separated by equally many (and at least one) unchanged lines.
pub(crate) fn check_line_range_mappings(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&[u8]],
    modified_lines: &[&[u8]],
    allow_start_mismatch: bool,
) -> bool {
    if !allow_start_mismatch {
        if let (Some(first), Some(last)) = (changes.first(), changes.last()) {
            if first.modified.start_line_number != first.original.start_line_number {
                return false;
            }
            if modified_lines.len() + 1 - last.modified.end_line_number_exclusive
                != original_lines.len() + 1 - last.original.end_line_number_exclusive
            {
                return false;
            }
        }
    }
    changes.windows(2).all(|pair| {
        let (m1, m2) = (&pair[0], &pair[1]);
        m2.original.start_line_number as isize - m1.original.end_line_number_exclusive as isize
            == m2.modified.start_line_number as isize
                - m1.modified.end_line_number_exclusive as isize
            && m1.original.end_line_number_exclusive < m2.original.start_line_number
            && m1.modified.end_line_number_exclusive < m2.modified.start_line_number
    })
}
