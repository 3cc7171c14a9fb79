//! Classified line records.
//!
//! A [`LineRecord`] is immutable once built; edits replace records wholesale. String regions are
//! stored as paired boundary offsets: each pair `[open, close]` covers string content including
//! its delimiters. A leading `-1` marks a string continued from the previous line and a trailing
//! offset equal to the text length marks one continuing onto the next line.

use quire_primitives::{Column, line_terminator};
use smallvec::SmallVec;

use crate::context::{Delimiter, LexicalContext};
use crate::error::InvariantViolation;

/// Offsets of string-region boundaries.
pub type Boundaries = SmallVec<[isize; 4]>;

/// Sorted column offsets (excess brackets, malformed delimiters).
pub type Offsets = SmallVec<[Column; 2]>;

/// One line of source text together with its lexical classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
	text: String,
	/// Byte length of the terminator at the end of `text`.
	terminator_len: usize,
	/// Byte length of the code part (text before the trailing comment and terminator).
	code_end: usize,
	/// Character length of `text`, terminator included.
	text_len: usize,
	/// Character length of the code part.
	code_len: usize,
	trailing_comment: Option<String>,
	indentation: usize,
	string_boundaries: Boundaries,
	excess_brackets: Offsets,
	malformed_delimiters: Offsets,
	opens: usize,
	closes: usize,
	begin_context: LexicalContext,
	end_context: LexicalContext,
}

/// Classifies `text` given the ending context of the previous line.
///
/// The returned record has indentation zero and no excess brackets; use
/// [`LineRecord::with_indentation`] to apply the running indentation.
pub fn classify(previous_context: LexicalContext, text: &str) -> LineRecord {
	LineRecord::classify(previous_context, text)
}

fn is_escaped(chars: &[char], idx: usize) -> bool {
	chars[..idx].iter().rev().take_while(|&&c| c == '\\').count() % 2 == 1
}

impl LineRecord {
	/// Classifies `text` given the ending context of the previous line.
	pub fn classify(begin_context: LexicalContext, text: &str) -> Self {
		let terminator_len = line_terminator(text).len();
		let content = &text[..text.len() - terminator_len];
		let chars: Vec<char> = content.chars().collect();

		let mut boundaries = Boundaries::new();
		let mut malformed = Offsets::new();
		if begin_context.is_string() {
			boundaries.push(-1);
		}

		let mut ctx = begin_context;
		let mut comment_start = None;
		let mut idx = 0;
		while idx < chars.len() {
			let c = chars[idx];
			if !ctx.is_string() && c == '/' && chars.get(idx + 1) == Some(&'/') {
				comment_start = Some(idx);
				break;
			}

			let (delimiter, width) = match c {
				'"' if !(ctx.is_string() && is_escaped(&chars, idx)) => (Delimiter::Quote, 1),
				'$' if !ctx.is_string() && chars.get(idx + 1) == Some(&'"') => (Delimiter::InterpolatedQuote, 2),
				'{' if ctx == LexicalContext::OpenInterpolatedString && !is_escaped(&chars, idx) => (Delimiter::OpenBrace, 1),
				'{' if ctx == LexicalContext::OpenInterpolatedArgument => (Delimiter::OpenBrace, 1),
				'}' if ctx == LexicalContext::OpenInterpolatedArgument => (Delimiter::CloseBrace, 1),
				_ => {
					idx += 1;
					continue;
				}
			};

			let step = ctx.transition(delimiter);
			let mut boundary = idx;
			if !step.valid {
				malformed.push(idx);
				if delimiter == Delimiter::InterpolatedQuote {
					boundary = idx + 1;
				}
			}
			if step.next.is_string() != ctx.is_string() {
				boundaries.push(boundary as isize);
			}
			ctx = step.next;
			idx += width;
		}

		let text_len = chars.len() + text[content.len()..].chars().count();
		if ctx.is_string() {
			boundaries.push(text_len as isize);
		}

		let code_len = comment_start.unwrap_or(chars.len());
		let code_end = chars[..code_len].iter().map(|c| c.len_utf8()).sum();
		let trailing_comment = comment_start.and_then(|start| {
			let comment: String = chars[start..].iter().collect();
			let is_doc = chars[..start].iter().all(|c| c.is_whitespace()) && comment.starts_with("///") && !comment.starts_with("////");
			(!is_doc).then(|| comment[2..].trim().to_string())
		});

		let mut line = Self {
			text: text.to_string(),
			terminator_len,
			code_end,
			text_len,
			code_len,
			trailing_comment,
			indentation: 0,
			string_boundaries: boundaries,
			excess_brackets: Offsets::new(),
			malformed_delimiters: malformed,
			opens: 0,
			closes: 0,
			begin_context,
			end_context: ctx,
		};
		let (opens, closes) = line.code_chars().fold((0, 0), |(o, c), (_, ch)| match ch {
			'{' => (o + 1, c),
			'}' => (o, c + 1),
			_ => (o, c),
		});
		line.opens = opens;
		line.closes = closes;
		line
	}

	/// Full text including the terminator.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// The terminator (empty for the last line of a file).
	pub fn terminator(&self) -> &str {
		&self.text[self.text.len() - self.terminator_len..]
	}

	/// Text without the trailing comment and terminator.
	pub fn without_ending(&self) -> &str {
		&self.text[..self.code_end]
	}

	/// Trailing comment without its slashes, trimmed; `None` for documenting comments.
	pub fn trailing_comment(&self) -> Option<&str> {
		self.trailing_comment.as_deref()
	}

	/// Character length of the full text, terminator included.
	pub fn len(&self) -> usize {
		self.text_len
	}

	/// Character length of the line content, terminator excluded.
	pub fn content_len(&self) -> usize {
		self.text_len - self.terminator().chars().count()
	}

	/// Returns true if the line has no text at all.
	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}

	/// Character length of [`Self::without_ending`].
	pub fn code_len(&self) -> usize {
		self.code_len
	}

	/// Indentation at the start of the line.
	pub fn indentation(&self) -> usize {
		self.indentation
	}

	/// String-region boundary offsets.
	pub fn string_boundaries(&self) -> &[isize] {
		&self.string_boundaries
	}

	/// Offsets of closing brackets with no matching opener.
	pub fn excess_brackets(&self) -> &[Column] {
		&self.excess_brackets
	}

	/// Offsets of delimiters that are not allowed where they appear.
	pub fn malformed_delimiters(&self) -> &[Column] {
		&self.malformed_delimiters
	}

	/// Context at the start of the line.
	pub fn begin_context(&self) -> LexicalContext {
		self.begin_context
	}

	/// Context at the end of the line.
	pub fn end_context(&self) -> LexicalContext {
		self.end_context
	}

	/// Number of `{` in code.
	pub fn opening_brackets(&self) -> usize {
		self.opens
	}

	/// Number of `}` in code, excess ones included.
	pub fn closing_brackets(&self) -> usize {
		self.closes
	}

	/// Returns true if a string is still open at the end of the line.
	pub fn continues_string(&self) -> bool {
		self.end_context.is_string()
	}

	/// Returns true if `column` lies inside a string region (delimiters included).
	pub fn in_string(&self, column: Column) -> bool {
		let column = column as isize;
		self.string_boundaries.chunks(2).any(|pair| match pair {
			[open, close] => *open <= column && column <= *close,
			_ => false,
		})
	}

	/// Returns true if `column` is real code: before the trailing comment, outside strings,
	/// and not a malformed delimiter.
	pub fn is_code(&self, column: Column) -> bool {
		column < self.code_len && !self.in_string(column) && self.malformed_delimiters.binary_search(&column).is_err()
	}

	/// Iterates over `(column, char)` for every code character.
	pub fn code_chars(&self) -> impl Iterator<Item = (Column, char)> + '_ {
		self.without_ending().chars().enumerate().filter(|(col, _)| self.is_code(*col))
	}

	/// Returns a copy with the running `indentation` applied and excess brackets recomputed.
	///
	/// Closers only count as excess while the running total, plus the excess closers already
	/// seen on this line, would drop below zero. Each excess closer therefore also pays back
	/// one unit of debt for the rest of the line.
	pub fn with_indentation(&self, indentation: usize) -> Self {
		let mut excess = Offsets::new();
		if indentation < self.closes {
			let mut effective = indentation as isize;
			for (column, ch) in self.code_chars() {
				match ch {
					'{' => effective += 1,
					'}' => {
						effective -= 1;
						if effective + (excess.len() as isize) < 0 {
							excess.push(column);
						}
					}
					_ => {}
				}
			}
		}
		Self {
			indentation,
			excess_brackets: excess,
			..self.clone()
		}
	}

	/// Indentation carried into the following line.
	///
	/// Excess closing brackets are ignored, so this never drops below zero.
	pub fn final_indentation(&self) -> usize {
		(self.indentation + self.opens + self.excess_brackets.len()).saturating_sub(self.closes)
	}

	/// Validates the structural invariants of the record.
	pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
		let bounds = &self.string_boundaries;
		if bounds.len() % 2 != 0 {
			return Err(InvariantViolation::UnpairedBoundaries { count: bounds.len() });
		}
		if let Some(idx) = bounds.windows(2).position(|w| w[0] >= w[1]) {
			return Err(InvariantViolation::BoundariesNotAscending { index: idx + 1 });
		}
		let len = self.text_len as isize;
		for (idx, &offset) in bounds.iter().enumerate() {
			let dangling_start = offset == -1 && idx == 0;
			let dangling_end = offset == len && idx + 1 == bounds.len();
			if !(dangling_start || dangling_end || (0..len).contains(&offset)) {
				return Err(InvariantViolation::BoundaryOutOfRange { offset, len: self.text_len });
			}
		}
		if self.begin_context.is_string() != (bounds.first() == Some(&-1)) {
			return Err(InvariantViolation::ContextMismatch { context: self.begin_context });
		}
		if self.end_context.is_string() != (bounds.last() == Some(&len)) {
			return Err(InvariantViolation::ContextMismatch { context: self.end_context });
		}

		if self.excess_brackets.windows(2).any(|w| w[0] >= w[1]) {
			return Err(InvariantViolation::ExcessBracketsNotAscending);
		}
		for &offset in &self.excess_brackets {
			if !self.is_code(offset) || self.without_ending().chars().nth(offset) != Some('}') {
				return Err(InvariantViolation::InvalidExcessBracket { offset });
			}
		}
		if self.malformed_delimiters.windows(2).any(|w| w[0] >= w[1]) {
			return Err(InvariantViolation::MalformedDelimitersNotAscending);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests;
