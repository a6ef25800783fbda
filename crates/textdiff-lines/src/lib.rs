//! Line-and-character diff engine.
//!
//! Given two documents as line arrays, [`compute_diff`] produces a list of
//! line-range mappings with nested character-range mappings describing the
//! finest edits inside each hunk, and optionally a list of moved regions.
//! The engine favors human-readable alignments (whole words, whole lines,
//! no coincidental tiny matches) over minimal edit scripts.

pub mod char_sequence;
pub mod computer;
pub mod line_sequence;
pub mod mappings;
pub mod moves;
pub mod refine;

pub use char_sequence::CharSliceSequence;
pub use computer::compute_diff;
pub use line_sequence::LineSequence;
pub use mappings::{DetailedLineRangeMapping, LineRangeMapping, MovedText, RangeMapping};

/// Options controlling diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Treat lines differing only in leading/trailing whitespace as equal.
    /// When false, such lines are refined to character mappings showing the
    /// whitespace edit.
    pub ignore_trim_whitespace: bool,
    /// Detect moved regions in addition to changes.
    pub compute_moves: bool,
    /// Wall-clock budget in milliseconds; 0 means no limit.
    pub max_computation_time_ms: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_trim_whitespace: true,
            compute_moves: false,
            max_computation_time_ms: 0,
        }
    }
}

/// Result of diffing two documents.
#[derive(Debug, Clone)]
pub struct LinesDiff {
    /// The changed regions, strictly ordered on both sides, with at least
    /// one unchanged line between consecutive entries.
    pub changes: Vec<DetailedLineRangeMapping>,
    /// Moved regions; empty unless requested via
    /// [`DiffOptions::compute_moves`].
    pub moves: Vec<MovedText>,
    /// True if the computation hit its time budget and the result may be
    /// partial. The result is well-formed regardless.
    pub hit_timeout: bool,
}

impl LinesDiff {
    /// True if the documents were found identical.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.moves.is_empty()
    }
}
