use thiserror::Error;

use crate::LexicalContext;

/// A classified line violates one of its structural invariants.
///
/// These indicate a defect in the classifier or in a caller constructing records by hand;
/// malformed source text never produces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
	/// String boundaries do not come in pairs.
	#[error("string boundaries must come in pairs, found {count}")]
	UnpairedBoundaries {
		/// Number of boundaries found.
		count: usize,
	},
	/// String boundaries are not strictly ascending.
	#[error("string boundary {index} is not strictly ascending")]
	BoundariesNotAscending {
		/// Index of the first offending boundary.
		index: usize,
	},
	/// A boundary lies outside the line, or a dangling marker is misplaced.
	#[error("string boundary {offset} is out of range for a line of length {len}")]
	BoundaryOutOfRange {
		/// The offending offset.
		offset: isize,
		/// Character length of the line.
		len: usize,
	},
	/// A beginning or ending context disagrees with the dangling markers.
	#[error("context {context:?} disagrees with the string boundaries")]
	ContextMismatch {
		/// The inconsistent context.
		context: LexicalContext,
	},
	/// Excess bracket offsets are not strictly ascending.
	#[error("excess bracket offsets are not strictly ascending")]
	ExcessBracketsNotAscending,
	/// An excess bracket offset does not denote a closing bracket in code.
	#[error("excess bracket offset {offset} is not a closing bracket in code")]
	InvalidExcessBracket {
		/// The offending offset.
		offset: usize,
	},
	/// Malformed delimiter offsets are not strictly ascending.
	#[error("malformed delimiter offsets are not strictly ascending")]
	MalformedDelimitersNotAscending,
}
