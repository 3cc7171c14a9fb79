//! Conversions between quire coordinates and `lsp_types`.
//!
//! Columns are treated as character offsets on both sides; encoding negotiation happens
//! in the transport layer.

use crate::{Position, Range};

/// A single content change: the replaced range (pre-change positions) and its replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
	/// Range being replaced.
	pub range: Range,
	/// Text inserted in place of the range.
	pub text: String,
}

impl TextChange {
	/// Creates a new change.
	pub fn new(range: Range, text: impl Into<String>) -> Self {
		Self { range, text: text.into() }
	}

	/// Creates an insertion at `pos`.
	pub fn insert(pos: Position, text: impl Into<String>) -> Self {
		Self::new(Range::point(pos), text)
	}

	/// Converts an LSP change event; an event without a range replaces `[0, end_of_file)`.
	pub fn from_lsp(event: lsp_types::TextDocumentContentChangeEvent, end_of_file: Position) -> Self {
		let range = event.range.map(Range::from).unwrap_or(Range::new(Position::ZERO, end_of_file));
		Self { range, text: event.text }
	}

	/// Returns true if the change touches a single line.
	pub fn is_single_line(&self) -> bool {
		self.range.start.line == self.range.end.line
	}
}

impl From<lsp_types::Position> for Position {
	fn from(pos: lsp_types::Position) -> Self {
		Self::new(pos.line as usize, pos.character as usize)
	}
}

impl From<Position> for lsp_types::Position {
	fn from(pos: Position) -> Self {
		let clamp = |v: usize| u32::try_from(v).unwrap_or(u32::MAX);
		lsp_types::Position::new(clamp(pos.line), clamp(pos.column))
	}
}

impl From<lsp_types::Range> for Range {
	fn from(range: lsp_types::Range) -> Self {
		Self::new(range.start.into(), range.end.into())
	}
}

impl From<Range> for lsp_types::Range {
	fn from(range: Range) -> Self {
		lsp_types::Range::new(range.start.into(), range.end.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_full_document_change_spans_file() {
		let event = lsp_types::TextDocumentContentChangeEvent {
			range: None,
			range_length: None,
			text: "x".into(),
		};
		let change = TextChange::from_lsp(event, Position::new(3, 7));
		assert_eq!(change.range, Range::new(Position::ZERO, Position::new(3, 7)));
		assert!(!change.is_single_line());
	}

	#[test]
	fn test_lsp_range_conversion() {
		let lsp = lsp_types::Range::new(lsp_types::Position::new(1, 2), lsp_types::Position::new(1, 5));
		let range = Range::from(lsp);
		assert_eq!(range, Range::new(Position::new(1, 2), Position::new(1, 5)));
		assert_eq!(lsp_types::Range::from(range), lsp);
	}
}
