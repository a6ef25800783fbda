//! Geometry primitives for the textdiff engine.
//!
//! Provides half-open ranges over character offsets (`OffsetRange`) and
//! 1-based line numbers (`LineRange`), document positions (`Position`,
//! `TextRange`), and a coalescing set of line ranges (`LineRangeSet`).

pub mod line_range;
pub mod line_range_set;
pub mod offset_range;
pub mod position;

pub use line_range::LineRange;
pub use line_range_set::LineRangeSet;
pub use offset_range::OffsetRange;
pub use position::{Position, TextRange};
