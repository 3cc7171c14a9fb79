//! Per-line lexical classification.
//!
//! Determines, for every character of a line, whether it is code, string content, or part of a
//! trailing comment, given only the context the previous line ended in. Brace nesting is
//! tracked as a running indentation; closing brackets without a matching opener are recorded
//! as excess rather than driving the indentation negative.
//!
//! Everything in this crate is pure: records are immutable values and classification never
//! fails on malformed input.

mod code;
mod context;
mod error;
mod indent;
mod line;

pub use context::{Delimiter, LexicalContext, Transition};
pub use error::InvariantViolation;
pub use indent::{classify_lines, reindent};
pub use line::{Boundaries, LineRecord, Offsets, classify};
