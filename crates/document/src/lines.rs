//! The classified line sequence of one file.

use std::collections::BTreeSet;

use quire_lexer::{LexicalContext, LineRecord};
use quire_primitives::{LineIdx, Position, Range, ends_with_line_break};

use crate::{Error, Result};

/// Ordered line records; a file always has at least one line and its last line has no terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStore {
	lines: Vec<LineRecord>,
}

impl Default for LineStore {
	fn default() -> Self {
		Self {
			lines: vec![LineRecord::classify(LexicalContext::NoOpenString, "")],
		}
	}
}

impl LineStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn get(&self, idx: LineIdx) -> Option<&LineRecord> {
		self.lines.get(idx)
	}

	/// Like [`Self::get`], failing with an invalid-argument error for out-of-range lines.
	pub fn line(&self, idx: LineIdx) -> Result<&LineRecord> {
		self.lines
			.get(idx)
			.ok_or_else(|| Error::InvalidArgument(format!("line {idx} out of range ({} lines)", self.lines.len())))
	}

	pub fn lines(&self) -> &[LineRecord] {
		&self.lines
	}

	/// Lines `[start, start + count)`.
	pub fn range(&self, start: LineIdx, count: usize) -> Result<&[LineRecord]> {
		self.lines
			.get(start..start.saturating_add(count))
			.ok_or_else(|| Error::InvalidArgument(format!("lines {start}..{} out of range", start.saturating_add(count))))
	}

	pub fn last(&self) -> &LineRecord {
		&self.lines[self.lines.len() - 1]
	}

	/// Position after the last character of the file.
	pub fn end(&self) -> Position {
		let last = self.lines.len() - 1;
		Position::new(last, self.lines[last].len())
	}

	pub fn contains_position(&self, pos: Position) -> bool {
		self.lines.get(pos.line).is_some_and(|line| pos.column <= line.len())
	}

	pub fn contains_range(&self, range: &Range) -> bool {
		range.is_valid() && self.contains_position(range.start) && self.contains_position(range.end)
	}

	/// Full text of the file.
	pub fn text(&self) -> String {
		self.lines.iter().map(LineRecord::text).collect()
	}

	/// Replaces lines `[start, start + count)` with `replacement`.
	///
	/// The replacement must continue seamlessly into the unchanged lines on both sides: matching
	/// lexical context and indentation, and a terminator on every line except the file's last.
	pub fn replace(&mut self, start: LineIdx, count: usize, replacement: Vec<LineRecord>) -> Result<()> {
		self.verify_replacement(start, count, &replacement)?;
		self.lines.splice(start..start + count, replacement);
		Ok(())
	}

	fn verify_replacement(&self, start: LineIdx, count: usize, replacement: &[LineRecord]) -> Result<()> {
		let len = self.lines.len();
		if start >= len || start + count > len {
			return Err(Error::InvalidArgument(format!("replaced lines {start}..{} out of range ({len} lines)", start + count)));
		}
		let (Some(first), Some(last)) = (replacement.first(), replacement.last()) else {
			return Err(Error::InvalidArgument("replacement must contain at least one line".into()));
		};

		if let Some(previous) = start.checked_sub(1).map(|idx| &self.lines[idx]) {
			if previous.end_context() != first.begin_context() {
				return Err(Error::InvalidArgument(format!(
					"replacement begins in {:?} but line {} ends in {:?}",
					first.begin_context(),
					start - 1,
					previous.end_context()
				)));
			}
			if previous.final_indentation() != first.indentation() {
				return Err(Error::InvalidArgument(format!(
					"replacement begins at indentation {} but line {} ends at {}",
					first.indentation(),
					start - 1,
					previous.final_indentation()
				)));
			}
		}

		let continuation = self.lines.get(start + count);
		if let Some(next) = continuation {
			if next.begin_context() != last.end_context() {
				return Err(Error::InvalidArgument(format!(
					"replacement ends in {:?} but line {} begins in {:?}",
					last.end_context(),
					start + count,
					next.begin_context()
				)));
			}
			if next.indentation() != last.final_indentation() {
				return Err(Error::InvalidArgument(format!(
					"replacement changes the indentation of line {} from {} to {}",
					start + count,
					next.indentation(),
					last.final_indentation()
				)));
			}
		}

		let body = &replacement[..replacement.len() - 1];
		if let Some(idx) = body.iter().position(|line| !ends_with_line_break(line.text())) {
			return Err(Error::InvalidArgument(format!("replacement line {idx} is missing its terminator")));
		}
		match (continuation.is_some(), ends_with_line_break(last.text())) {
			(true, false) => Err(Error::InvalidArgument("last replacement line must end in a terminator".into())),
			(false, true) => Err(Error::InvalidArgument("the last line of a file must not end in a terminator".into())),
			_ => Ok(()),
		}
	}
}

/// Drops entries in `[start, start + count)` and shifts entries at or after `start + count` by `delta`.
pub(crate) fn invalidate_or_update(set: &mut BTreeSet<LineIdx>, start: LineIdx, count: usize, delta: isize) {
	let end = start + count;
	let shifted: Vec<LineIdx> = set.range(end..).filter_map(|&line| line.checked_add_signed(delta)).collect();
	set.retain(|&line| line < start);
	set.extend(shifted);
}

#[cfg(test)]
mod tests;
