//! A slice of a document viewed as a flat sequence of character codes.

use bstr::ByteSlice;
use textdiff_range::{OffsetRange, Position, TextRange};
use textdiff_seq::Sequence;

/// A view of the lines in a 0-based line-offset range as one flat run of
/// bytes with LF separators, carrying per-line offset tables so any flat
/// offset can be translated back to a `(line, column)` position.
///
/// When `consider_whitespace_changes` is false, each line contributes its
/// trimmed text and the stripped leading-whitespace count is recorded so
/// translated columns still point into the untrimmed document.
pub struct CharSliceSequence {
    line_range: OffsetRange,
    elements: Vec<u8>,
    /// Element offset at which each line of the slice begins.
    first_char_offset_by_line: Vec<usize>,
    /// Leading whitespace stripped from each line (0 when whitespace is kept).
    additional_offset_by_line: Vec<usize>,
}

impl CharSliceSequence {
    pub fn new(
        lines: &[&[u8]],
        line_range: OffsetRange,
        consider_whitespace_changes: bool,
    ) -> Self {
        // A slice that touches the end of the document but not its start is
        // extended one line back, with that prepended line fully trimmed
        // away. The concatenation then carries one LF per covered line,
        // which avoids a pathological empty-slice diff.
        let mut line_range = line_range;
        let mut trim_first_line_fully = false;
        if line_range.start > 0 && line_range.end_exclusive >= lines.len() {
            line_range = OffsetRange::new(line_range.start - 1, line_range.end_exclusive);
            trim_first_line_fully = true;
        }

        let mut elements: Vec<u8> = Vec::new();
        let mut first_char_offset_by_line = Vec::with_capacity(line_range.len());
        let mut additional_offset_by_line = Vec::with_capacity(line_range.len());

        for i in line_range.start..line_range.end_exclusive {
            let mut line: &[u8] = lines[i];
            let mut offset = 0;
            if trim_first_line_fully {
                offset = line.len();
                line = b"";
                trim_first_line_fully = false;
            } else if !consider_whitespace_changes {
                let without_leading = line.trim_start();
                offset = line.len() - without_leading.len();
                line = without_leading.trim_end();
            }
            additional_offset_by_line.push(offset);
            first_char_offset_by_line.push(elements.len());
            elements.extend_from_slice(line);
            // No LF after the final line of the document.
            if i < lines.len() - 1 {
                elements.push(b'\n');
            }
        }
        if line_range.end_exclusive < lines.len() {
            // The slice ends in a trailing LF; the offset one past it
            // belongs to the line after the slice, at column 1.
            first_char_offset_by_line.push(elements.len());
            additional_offset_by_line.push(0);
        }

        Self { line_range, elements, first_char_offset_by_line, additional_offset_by_line }
    }

    /// Translate a flat element offset into a document position.
    pub fn translate_offset(&self, offset: usize) -> Position {
        if self.line_range.is_empty() {
            return Position::new(self.line_range.start + 1, 1);
        }
        let i = self.first_char_offset_by_line.partition_point(|&v| v <= offset) - 1;
        Position::new(
            self.line_range.start + i + 1,
            offset - self.first_char_offset_by_line[i] + self.additional_offset_by_line[i] + 1,
        )
    }

    /// Translate a flat offset range into a document range.
    pub fn translate_range(&self, range: OffsetRange) -> TextRange {
        TextRange::from_positions(
            self.translate_offset(range.start),
            self.translate_offset(range.end_exclusive),
        )
    }

    /// The maximal run of word characters (`[A-Za-z0-9]`) containing
    /// `offset`, or `None` if the offset is out of bounds or non-word.
    pub fn find_word_containing(&self, offset: usize) -> Option<OffsetRange> {
        if offset >= self.elements.len() || !is_word_char(self.elements[offset]) {
            return None;
        }
        let mut start = offset;
        while start > 0 && is_word_char(self.elements[start - 1]) {
            start -= 1;
        }
        let mut end = offset;
        while end < self.elements.len() && is_word_char(self.elements[end]) {
            end += 1;
        }
        Some(OffsetRange::new(start, end))
    }

    /// Widen a range to the smallest enclosing range whose endpoints sit
    /// on line boundaries.
    pub fn extend_to_full_lines(&self, range: OffsetRange) -> OffsetRange {
        let i = self.first_char_offset_by_line.partition_point(|&v| v <= range.start);
        let start = if i > 0 { self.first_char_offset_by_line[i - 1] } else { 0 };
        let j = self
            .first_char_offset_by_line
            .partition_point(|&v| v < range.end_exclusive);
        let end = self
            .first_char_offset_by_line
            .get(j)
            .copied()
            .unwrap_or(self.elements.len());
        OffsetRange::new(start, end)
    }

    /// The raw element bytes of a range.
    pub fn slice_text(&self, range: OffsetRange) -> &[u8] {
        &self.elements[range.start..range.end_exclusive]
    }
}

impl Sequence for CharSliceSequence {
    fn len(&self) -> usize {
        self.elements.len()
    }

    fn get_element(&self, offset: usize) -> u32 {
        self.elements[offset] as u32
    }

    fn get_boundary_score(&self, offset: usize) -> i32 {
        let prev = self.category_at(offset.checked_sub(1));
        let next = self.category_at(Some(offset));
        if prev == CharBoundaryCategory::LineBreakCr && next == CharBoundaryCategory::LineBreakLf {
            // Never split between \r and \n.
            return 0;
        }
        let mut score = 0;
        if prev != next {
            score += 10;
        }
        if next == CharBoundaryCategory::WordUpper {
            // A camelCase hump is a good split point.
            score += 1;
        }
        score += prev.score() + next.score();
        score
    }
}

impl CharSliceSequence {
    fn category_at(&self, offset: Option<usize>) -> CharBoundaryCategory {
        match offset {
            Some(o) if o < self.elements.len() => CharBoundaryCategory::of(self.elements[o]),
            _ => CharBoundaryCategory::End,
        }
    }
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharBoundaryCategory {
    WordLower,
    WordUpper,
    WordNumber,
    End,
    Other,
    Space,
    LineBreakCr,
    LineBreakLf,
}

impl CharBoundaryCategory {
    fn of(b: u8) -> Self {
        match b {
            b'\r' => Self::LineBreakCr,
            b'\n' => Self::LineBreakLf,
            b' ' | b'\t' => Self::Space,
            b'a'..=b'z' => Self::WordLower,
            b'A'..=b'Z' => Self::WordUpper,
            b'0'..=b'9' => Self::WordNumber,
            _ => Self::Other,
        }
    }

    fn score(self) -> i32 {
        match self {
            Self::End | Self::LineBreakCr | Self::LineBreakLf => 10,
            Self::Space => 3,
            Self::Other => 2,
            Self::WordLower | Self::WordUpper | Self::WordNumber => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_slice(lines: &[&[u8]]) -> CharSliceSequence {
        CharSliceSequence::new(lines, OffsetRange::new(0, lines.len()), true)
    }

    #[test]
    fn full_document_has_one_lf_per_line_gap() {
        let lines: Vec<&[u8]> = vec![b"ab", b"c", b"de"];
        let s = full_slice(&lines);
        let lf_count = (0..s.len()).filter(|&i| s.get_element(i) == b'\n' as u32).count();
        assert_eq!(lf_count, lines.len() - 1);
        assert_eq!(s.len(), 2 + 1 + 1 + 1 + 2);
    }

    #[test]
    fn translate_offset_round_trips() {
        let lines: Vec<&[u8]> = vec![b"ab", b"", b"cd"];
        let s = full_slice(&lines);
        // "ab\n\ncd": offsets 0..=6 (inclusive end position).
        let expected = [
            (1, 1),
            (1, 2),
            (1, 3),
            (2, 1),
            (3, 1),
            (3, 2),
            (3, 3),
        ];
        for (offset, &(line, col)) in expected.iter().enumerate() {
            assert_eq!(s.translate_offset(offset), Position::new(line, col), "offset {offset}");
        }
    }

    #[test]
    fn translate_offset_accounts_for_trimmed_whitespace() {
        let lines: Vec<&[u8]> = vec![b"  ab  ", b"c"];
        let s = CharSliceSequence::new(&lines, OffsetRange::new(0, 2), false);
        // Elements: "ab\nc"; column of 'a' is 3 in the untrimmed document.
        assert_eq!(s.len(), 4);
        assert_eq!(s.translate_offset(0), Position::new(1, 3));
        assert_eq!(s.translate_offset(1), Position::new(1, 4));
        assert_eq!(s.translate_offset(3), Position::new(2, 1));
    }

    #[test]
    fn offset_past_trailing_lf_maps_to_next_line_start() {
        let lines: Vec<&[u8]> = vec![b"x", b"A", b"y"];
        let s = CharSliceSequence::new(&lines, OffsetRange::new(0, 1), true);
        // Elements are "x\n"; the exclusive end of a whole-slice range sits
        // at the start of the following line.
        assert_eq!(s.len(), 2);
        assert_eq!(s.translate_offset(1), Position::new(1, 2));
        assert_eq!(s.translate_offset(2), Position::new(2, 1));
    }

    #[test]
    fn empty_line_range_translates_to_line_start() {
        let lines: Vec<&[u8]> = vec![b"ab", b"cd"];
        let s = CharSliceSequence::new(&lines, OffsetRange::new(1, 1), true);
        assert_eq!(s.translate_offset(0), Position::new(2, 1));
    }

    #[test]
    fn end_touching_slice_prepends_emptied_line() {
        let lines: Vec<&[u8]> = vec![b"aa", b"bb", b"cc"];
        let s = CharSliceSequence::new(&lines, OffsetRange::new(1, 3), true);
        // The slice is extended to line 0, whose text is emptied, leaving
        // "\nbb\ncc": one LF per covered line.
        assert_eq!(s.slice_text(OffsetRange::new(0, s.len())), b"\nbb\ncc");
        // Offset 0 maps to the end of the emptied first line.
        assert_eq!(s.translate_offset(0), Position::new(1, 3));
        assert_eq!(s.translate_offset(1), Position::new(2, 1));
    }

    #[test]
    fn find_word_containing_expands_to_word_bounds() {
        let lines: Vec<&[u8]> = vec![b"foo bar9,x"];
        let s = full_slice(&lines);
        assert_eq!(s.find_word_containing(1), Some(OffsetRange::new(0, 3)));
        assert_eq!(s.find_word_containing(4), Some(OffsetRange::new(4, 8)));
        assert_eq!(s.find_word_containing(7), Some(OffsetRange::new(4, 8)));
        assert_eq!(s.find_word_containing(3), None);
        assert_eq!(s.find_word_containing(8), None);
        assert_eq!(s.find_word_containing(99), None);
    }

    #[test]
    fn extend_to_full_lines_snaps_to_boundaries() {
        let lines: Vec<&[u8]> = vec![b"ab", b"cd", b"ef"];
        let s = full_slice(&lines);
        // "ab\ncd\nef": extending the "d" (offset 4) covers "cd\n".
        assert_eq!(s.extend_to_full_lines(OffsetRange::new(4, 5)), OffsetRange::new(3, 6));
        // A range already on boundaries is unchanged.
        assert_eq!(s.extend_to_full_lines(OffsetRange::new(3, 6)), OffsetRange::new(3, 6));
        // Spanning into the last line extends to the sequence end.
        assert_eq!(s.extend_to_full_lines(OffsetRange::new(4, 7)), OffsetRange::new(3, 8));
    }

    #[test]
    fn boundary_score_never_splits_crlf() {
        let lines: Vec<&[u8]> = vec![b"a\r", b"b"];
        let s = full_slice(&lines);
        // Elements: "a\r\nb"; offset 2 sits between \r and \n.
        assert_eq!(s.get_boundary_score(2), 0);
    }

    #[test]
    fn boundary_score_prefers_word_edges() {
        let lines: Vec<&[u8]> = vec![b"ab cd"];
        let s = full_slice(&lines);
        let within_word = s.get_boundary_score(1);
        let at_word_edge = s.get_boundary_score(2);
        assert!(at_word_edge > within_word);
    }

    #[test]
    fn boundary_score_rewards_camel_case_humps() {
        let lines: Vec<&[u8]> = vec![b"fooBar"];
        let s = full_slice(&lines);
        assert!(s.get_boundary_score(3) > s.get_boundary_score(2));
    }
}
