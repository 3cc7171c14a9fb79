//! Line-terminator handling.
//!
//! Recognised terminators are CRLF, LF, CR, and the Unicode line separator (U+2028),
//! paragraph separator (U+2029) and next-line (U+0085) characters.

use thiserror::Error;

use crate::Column;

/// Errors raised when splicing text with out-of-range columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
	/// A column lies past the end of the line content.
	#[error("column {column} is out of range for a line of length {len}")]
	ColumnOutOfRange {
		/// The offending column.
		column: Column,
		/// Character length of the line content, excluding its terminator.
		len: usize,
	},
	/// The start column comes after the end column.
	#[error("start column {start} is after end column {end}")]
	InvertedRange {
		/// Start column.
		start: Column,
		/// End column.
		end: Column,
	},
}

#[inline]
fn is_break_char(c: char) -> bool {
	matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}' | '\u{0085}')
}

/// Returns the character length of `text`.
#[inline]
pub fn char_len(text: &str) -> usize {
	text.chars().count()
}

/// Returns the terminator `text` ends with, or the empty string.
pub fn line_terminator(text: &str) -> &str {
	if text.ends_with("\r\n") {
		return &text[text.len() - 2..];
	}
	match text.chars().next_back() {
		Some(c) if is_break_char(c) => &text[text.len() - c.len_utf8()..],
		_ => "",
	}
}

/// Returns true if `text` ends with a line terminator.
#[inline]
pub fn ends_with_line_break(text: &str) -> bool {
	!line_terminator(text).is_empty()
}

/// Returns `text` without its trailing terminator.
pub fn strip_terminator(text: &str) -> &str {
	&text[..text.len() - line_terminator(text).len()]
}

/// Splits `text` into lines, keeping each terminator attached to its line.
///
/// A trailing empty piece is never produced: `"a\n"` yields `["a\n"]`.
pub fn split_lines(text: &str) -> Vec<&str> {
	let mut lines = Vec::new();
	let mut start = 0;
	let mut chars = text.char_indices().peekable();
	while let Some((idx, c)) = chars.next() {
		if !is_break_char(c) {
			continue;
		}
		let mut end = idx + c.len_utf8();
		if c == '\r'
			&& let Some(&(next_idx, '\n')) = chars.peek()
		{
			end = next_idx + 1;
			chars.next();
		}
		lines.push(&text[start..end]);
		start = end;
	}
	if start < text.len() {
		lines.push(&text[start..]);
	}
	lines
}

/// Converts a character column into a byte offset, allowing the one-past-the-end column.
pub fn byte_offset(text: &str, column: Column) -> Option<usize> {
	if column == 0 {
		return Some(0);
	}
	match text.char_indices().nth(column) {
		Some((idx, _)) => Some(idx),
		None if char_len(text) == column => Some(text.len()),
		None => None,
	}
}

/// Replaces columns `[start, end)` of `original` with `insert`.
///
/// Columns refer to the line content; the terminator of `original` is preserved after the splice.
pub fn changed_text(original: &str, start: Column, end: Column, insert: &str) -> Result<String, TextError> {
	if start > end {
		return Err(TextError::InvertedRange { start, end });
	}
	let content = strip_terminator(original);
	let len = char_len(content);
	let out_of_range = |column| TextError::ColumnOutOfRange { column, len };
	let start_byte = byte_offset(content, start).ok_or_else(|| out_of_range(start))?;
	let end_byte = byte_offset(content, end).ok_or_else(|| out_of_range(end))?;

	let mut text = String::with_capacity(original.len() + insert.len());
	text.push_str(&original[..start_byte]);
	text.push_str(insert);
	text.push_str(&original[end_byte..]);
	Ok(text)
}
