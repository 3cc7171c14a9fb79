//! Queries over the code portion of a classified line.

use quire_primitives::Column;

use crate::LineRecord;

impl LineRecord {
	/// Returns true if `column` is an excess closing bracket.
	pub fn is_excess_bracket(&self, column: Column) -> bool {
		self.excess_brackets().binary_search(&column).is_ok()
	}

	/// Iterates over every code column.
	pub fn code_columns(&self) -> impl Iterator<Item = Column> + '_ {
		self.code_chars().map(|(col, _)| col)
	}

	/// Returns the first code column whose character satisfies `predicate`.
	///
	/// Columns inside strings, the trailing comment, and malformed delimiters are never
	/// offered; excess closing brackets are skipped when `ignore_excess` is set.
	pub fn find_in_code(&self, ignore_excess: bool, mut predicate: impl FnMut(char) -> bool) -> Option<Column> {
		self.code_chars()
			.filter(|(col, _)| !(ignore_excess && self.is_excess_bracket(*col)))
			.find(|(_, ch)| predicate(*ch))
			.map(|(col, _)| col)
	}

	/// Same as [`Self::find_in_code`], restricted to columns in `[start, end)`.
	pub fn find_in_code_between(
		&self,
		start: Column,
		end: Column,
		ignore_excess: bool,
		mut predicate: impl FnMut(char) -> bool,
	) -> Option<Column> {
		self.code_chars()
			.skip_while(|(col, _)| *col < start)
			.take_while(|(col, _)| *col < end)
			.filter(|(col, _)| !(ignore_excess && self.is_excess_bracket(*col)))
			.find(|(_, ch)| predicate(*ch))
			.map(|(col, _)| col)
	}

	/// Effective indentation just before `column`, ignoring excess brackets.
	///
	/// Past the end of the code this is the final indentation of the line.
	pub fn indentation_at(&self, column: Column) -> usize {
		if column >= self.code_len() {
			return self.final_indentation();
		}
		let (opens, closes) = self
			.code_chars()
			.take_while(|(col, _)| *col < column)
			.filter(|(col, _)| !self.is_excess_bracket(*col))
			.fold((0, 0), |(o, c), (_, ch)| match ch {
				'{' => (o + 1, c),
				'}' => (o, c + 1),
				_ => (o, c),
			});
		(self.indentation() + opens).saturating_sub(closes)
	}
}

#[cfg(test)]
mod tests {
	use crate::{LexicalContext, LineRecord};

	fn line(text: &str, indentation: usize) -> LineRecord {
		LineRecord::classify(LexicalContext::NoOpenString, text).with_indentation(indentation)
	}

	#[test]
	fn test_find_in_code_skips_strings_and_comments() {
		let l = line(r#"a "{" b // {"#, 0);
		assert_eq!(l.find_in_code(true, |c| c == '{'), None);
		assert_eq!(l.find_in_code(true, |c| c == 'b'), Some(6));
		assert_eq!(l.code_columns().collect::<Vec<_>>(), vec![0, 1, 5, 6, 7]);
	}

	#[test]
	fn test_find_in_code_ignores_excess_brackets_on_request() {
		let l = line("} }", 0);
		assert_eq!(l.excess_brackets(), &[0, 2]);
		assert_eq!(l.find_in_code(true, |c| c == '}'), None);
		assert_eq!(l.find_in_code(false, |c| c == '}'), Some(0));
		assert_eq!(l.find_in_code_between(1, 3, false, |c| c == '}'), Some(2));
	}

	#[test]
	fn test_indentation_at_counts_preceding_braces() {
		let l = line("x { y { z } }", 1);
		assert_eq!(l.indentation_at(0), 1);
		assert_eq!(l.indentation_at(3), 2);
		assert_eq!(l.indentation_at(7), 3);
		assert_eq!(l.indentation_at(11), 2);
		assert_eq!(l.indentation_at(40), 1);
	}

	#[test]
	fn test_indentation_at_ignores_excess() {
		let l = line("}}{ x", 0);
		assert_eq!(l.indentation_at(2), 0);
		assert_eq!(l.indentation_at(4), 1);
	}
}
