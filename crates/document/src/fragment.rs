//! Syntactic fragments: statement-sized pieces of code ending in `{`, `}` or `;`.

use quire_primitives::{Position, Range};

/// The character that ends a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentDelimiter {
	OpenBrace,
	CloseBrace,
	Semicolon,
	/// The fragment runs into the end of the code without a delimiter.
	Missing,
}

impl FragmentDelimiter {
	/// Maps a delimiting character; anything else yields `None`.
	pub const fn from_char(c: char) -> Option<Self> {
		match c {
			'{' => Some(Self::OpenBrace),
			'}' => Some(Self::CloseBrace),
			';' => Some(Self::Semicolon),
			_ => None,
		}
	}

	pub const fn is_delimiter(c: char) -> bool {
		Self::from_char(c).is_some()
	}

	pub const fn as_char(self) -> Option<char> {
		match self {
			Self::OpenBrace => Some('{'),
			Self::CloseBrace => Some('}'),
			Self::Semicolon => Some(';'),
			Self::Missing => None,
		}
	}
}

/// Trailing line comments attached to a fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
	/// Comments on the fragment-less lines directly above it.
	pub opening: Vec<String>,
	/// Comments on the lines the fragment spans.
	pub closing: Vec<String>,
}

impl Comments {
	/// Trims leading and trailing absent comments; interior gaps become empty strings.
	pub(crate) fn collect(comments: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
		let mut comments: Vec<Option<String>> = comments.into_iter().skip_while(Option::is_none).collect();
		while comments.last().is_some_and(Option::is_none) {
			comments.pop();
		}
		comments.into_iter().map(Option::unwrap_or_default).collect()
	}
}

/// Header declarations tracked per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclarationCategory {
	Namespace,
	OpenDirective,
	Type,
	Callable,
}

impl DeclarationCategory {
	pub const ALL: [Self; 4] = [Self::Namespace, Self::OpenDirective, Self::Type, Self::Callable];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Namespace => "namespace",
			Self::OpenDirective => "open",
			Self::Type => "type",
			Self::Callable => "callable",
		}
	}
}

/// Classification assigned by the parsing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FragmentKind {
	/// A header item; `name` is its identity (qualified for types and callables).
	Declaration { category: DeclarationCategory, name: String },
	Statement,
	/// Text that could not be parsed.
	Invalid,
}

impl FragmentKind {
	pub fn declaration(&self) -> Option<(DeclarationCategory, &str)> {
		match self {
			Self::Declaration { category, name } => Some((*category, name)),
			_ => None,
		}
	}
}

/// A syntactic unit spanning one or more lines.
///
/// `range` ends at the delimiter, which is not part of `text`. Inside the fragment store ranges
/// are relative to the fragment's start line; everywhere else they are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
	pub range: Range,
	/// The lexically significant prefix; the whole range unless the classifier narrows it.
	pub header_range: Range,
	pub indentation: usize,
	pub text: String,
	pub delimiter: FragmentDelimiter,
	pub comments: Comments,
	pub kind: Option<FragmentKind>,
	/// False for structurally misplaced fragments that are excluded from compilation.
	pub included: bool,
}

impl Fragment {
	pub fn new(range: Range, indentation: usize, text: impl Into<String>, delimiter: FragmentDelimiter) -> Self {
		Self {
			range,
			header_range: range,
			indentation,
			text: text.into(),
			delimiter,
			comments: Comments::default(),
			kind: None,
			included: true,
		}
	}

	pub fn with_kind(mut self, kind: FragmentKind) -> Self {
		self.kind = Some(kind);
		self
	}

	/// Shifts both ranges by `delta` lines.
	pub(crate) fn with_line_offset(mut self, delta: isize) -> Option<Self> {
		self.range = self.range.with_line_offset(delta)?;
		self.header_range = self.header_range.with_line_offset(delta)?;
		Some(self)
	}

	pub fn declaration(&self) -> Option<(DeclarationCategory, &str)> {
		self.kind.as_ref().and_then(FragmentKind::declaration)
	}

	/// The range including the delimiter position, so that even empty fragments occupy a column.
	pub fn extent(&self) -> Range {
		let end = Position::new(self.range.end.line, self.range.end.column + 1);
		Range::new(self.range.start, end)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_delimiters() {
		assert_eq!(FragmentDelimiter::from_char(';'), Some(FragmentDelimiter::Semicolon));
		assert_eq!(FragmentDelimiter::from_char('x'), None);
		assert_eq!(FragmentDelimiter::Missing.as_char(), None);
		assert!(FragmentDelimiter::is_delimiter('}'));
	}

	#[test]
	fn test_comment_collection_trims_gaps_at_the_ends() {
		let comments = Comments::collect([None, Some("a".into()), None, Some("b".into()), None]);
		assert_eq!(comments, vec!["a".to_string(), String::new(), "b".to_string()]);
		assert!(Comments::collect([None, None]).is_empty());
	}
}
