//! Fragment boundaries over the classified lines.
//!
//! A fragment runs from just after the previous `{`, `}` or `;` in code up to and including the
//! next one. These helpers find those boundaries, compute the span that must be re-checked after
//! an edit, and cut the code of edited lines into unclassified fragments.

use std::collections::BTreeSet;

use quire_lexer::LineRecord;
use quire_primitives::{Column, LineIdx, Position, Range, byte_offset};

use crate::fragment::{Fragment, FragmentDelimiter};
use crate::lines::LineStore;
use crate::{Error, Result};

/// Last delimiter column in `[start, end)`, strings and comments excluded.
fn statement_end(line: &LineRecord, start: Column, end: Column) -> Option<Column> {
	line.code_chars()
		.filter(|(col, ch)| (start..end).contains(col) && FragmentDelimiter::is_delimiter(*ch))
		.last()
		.map(|(col, _)| col)
}

/// First delimiter column at or after `start`.
fn statement_start(line: &LineRecord, start: Column) -> Option<Column> {
	line.find_in_code_between(start, line.code_len(), false, FragmentDelimiter::is_delimiter)
}

fn is_blank(line: &LineRecord) -> bool {
	line.without_ending().trim().is_empty()
}

/// Characters `[from, to)` of `text`, clamped to its length.
fn char_slice(text: &str, from: Column, to: Column) -> &str {
	let len = text.chars().count();
	let start = byte_offset(text, from.min(len)).unwrap_or(text.len());
	let end = byte_offset(text, to.min(len)).unwrap_or(text.len());
	&text[start..end.max(start)]
}

impl LineStore {
	/// Position right after the last code character of the file, or the start of the file if
	/// there is no code at all.
	pub fn last_in_file(&self) -> Position {
		self.lines()
			.iter()
			.enumerate()
			.rev()
			.find(|(_, line)| !is_blank(line))
			.map_or(Position::ZERO, |(idx, line)| Position::new(idx, line.code_len()))
	}

	/// Position right after the delimiter ending the fragment before the one containing `pos`.
	pub fn position_after_previous(&self, pos: Position) -> Result<Position> {
		if !self.contains_position(pos) {
			return Err(Error::InvalidArgument(format!("position {pos} is outside the file")));
		}
		let mut idx = pos.line;
		let mut found = statement_end(self.line(idx)?, 0, pos.column);
		while found.is_none() && idx > 0 {
			idx -= 1;
			found = statement_end(self.line(idx)?, 0, Column::MAX);
		}
		Ok(found.map_or(Position::ZERO, |col| Position::new(idx, col + 1)))
	}

	/// Position right after the delimiter ending the fragment at `current`.
	///
	/// Moves `current` forward to the first code character of that fragment. Without a further
	/// delimiter the fragment ends at [`Self::last_in_file`].
	pub fn fragment_end(&self, current: &mut Position) -> Result<Position> {
		if !self.contains_position(*current) {
			return Err(Error::InvalidArgument(format!("position {current} is outside the file")));
		}
		let last = self.last_in_file();
		if last <= *current {
			return Err(Error::InvalidArgument(format!("no fragment starts at {current}")));
		}

		let line = self.line(current.line)?;
		let rest_is_blank = line.without_ending().chars().skip(current.column).all(char::is_whitespace);
		if rest_is_blank {
			match (current.line + 1..self.len()).find(|&idx| self.get(idx).is_some_and(|line| !is_blank(line))) {
				Some(idx) => *current = Position::new(idx, 0),
				None => {
					*current = last;
					return Ok(last);
				}
			}
		}
		let line = self.line(current.line)?;
		current.column += line.without_ending().chars().skip(current.column).take_while(|c| c.is_whitespace()).count();

		let mut idx = current.line;
		let mut end = statement_start(line, current.column);
		while end.is_none() && idx + 1 < self.len() {
			idx += 1;
			end = statement_start(self.line(idx)?, 0);
		}
		Ok(end.map_or(last, |col| Position::new(idx, col + 1)))
	}

	/// The span to re-check after lines `[start, start + count)` were replaced: from the end of the
	/// preceding fragment to the end of the fragment following the replacement.
	pub fn syntax_check_range(&self, start: LineIdx, count: usize) -> Result<Range> {
		if start >= self.len() || start + count > self.len() {
			return Err(Error::InvalidArgument(format!("lines {start}..{} out of range", start + count)));
		}
		let check_start = self.position_after_previous(Position::new(start, 0))?;
		let last = self.last_in_file();
		let mut first_after = Position::new(start + count, 0);
		let check_end = if first_after < last { self.fragment_end(&mut first_after)? } else { self.end() };
		Ok(Range::new(check_start, if last <= check_end { self.end() } else { check_end }))
	}

	/// Code in `range` with trailing comments stripped; excess brackets are kept.
	pub fn code_snippet(&self, range: Range) -> Result<String> {
		if !self.contains_range(&range) {
			return Err(Error::InvalidArgument(format!("range {range} is outside the file")));
		}
		let code_line = |idx: LineIdx| -> Result<String> {
			let line = self.line(idx)?;
			Ok(format!("{}{}", line.without_ending(), line.terminator()))
		};
		if range.start.line == range.end.line {
			let text = code_line(range.start.line)?;
			return Ok(char_slice(&text, range.start.column, range.end.column).to_string());
		}
		let mut snippet = String::new();
		let first = code_line(range.start.line)?;
		snippet.push_str(char_slice(&first, range.start.column, Column::MAX));
		for idx in range.start.line + 1..range.end.line {
			snippet.push_str(&code_line(idx)?);
		}
		let last = code_line(range.end.line)?;
		snippet.push_str(char_slice(&last, 0, range.end.column));
		Ok(snippet)
	}

	/// Cuts the fragments overlapping `changed` lines out of the current content.
	///
	/// Leading whitespace and comments of the file, and anything after its last code, are
	/// skipped. The fragments come back unclassified with absolute ranges.
	pub fn fragments_to_process(&self, changed: &BTreeSet<LineIdx>) -> Result<Vec<Fragment>> {
		let last = self.last_in_file();
		let mut processed = Position::ZERO;
		let mut fragments = Vec::new();
		for &line in changed {
			if line >= self.len() {
				return Err(Error::Internal(format!("changed line {line} is outside the file")));
			}
			if processed.line < line {
				processed = processed.max(self.position_after_previous(Position::new(line, 0))?);
			}
			while processed.line <= line && processed < last {
				let next_end = self.fragment_end(&mut processed)?;
				let piece = self.code_snippet(Range::new(processed, next_end))?;
				if !piece.is_empty() {
					fragments.push(self.cut_fragment(processed, next_end, &piece)?);
				}
				processed = next_end;
			}
		}
		Ok(fragments)
	}

	fn cut_fragment(&self, start: Position, next_end: Position, piece: &str) -> Result<Fragment> {
		let piece_len = piece.chars().count();
		let ends_in_excess = next_end.column > 0 && self.line(next_end.line)?.is_excess_bracket(next_end.column - 1);
		let code_len = piece_len - usize::from(ends_in_excess);
		let code = char_slice(piece, 0, code_len);

		let (body, delimiter, end_column) = match code.chars().last().and_then(FragmentDelimiter::from_char) {
			Some(delimiter) => (char_slice(code, 0, code_len - 1), delimiter, next_end.column.checked_sub(1 + usize::from(ends_in_excess))),
			None => (code, FragmentDelimiter::Missing, (next_end.column + code_len + 1).checked_sub(piece_len + 1)),
		};
		let end_column = end_column.ok_or_else(|| Error::Internal(format!("fragment ending at {next_end} has no room for its delimiter")))?;

		let range = Range::new(start, Position::new(next_end.line, end_column));
		let indentation = self.line(start.line)?.indentation_at(start.column);
		Ok(Fragment::new(range, indentation, body.trim(), delimiter))
	}
}
