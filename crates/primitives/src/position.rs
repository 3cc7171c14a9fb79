/// Zero-based line index.
pub type LineIdx = usize;

/// Zero-based column, measured in characters (not bytes).
pub type Column = usize;

/// A position in a document, ordered line-major.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
	/// Zero-based line index.
	pub line: LineIdx,
	/// Zero-based character column within the line.
	pub column: Column,
}

impl Position {
	/// Start of the document.
	pub const ZERO: Self = Self { line: 0, column: 0 };

	/// Creates a new position.
	pub const fn new(line: LineIdx, column: Column) -> Self {
		Self { line, column }
	}

	/// Shifts the line by `delta`, returning `None` if the result would be negative.
	pub fn with_line_offset(self, delta: isize) -> Option<Self> {
		let line = self.line.checked_add_signed(delta)?;
		Some(Self { line, ..self })
	}
}

impl std::fmt::Display for Position {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({}, {})", self.line, self.column)
	}
}

/// A half-open range `[start, end)` between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
	/// Start position (inclusive).
	pub start: Position,
	/// End position (exclusive).
	pub end: Position,
}

impl Range {
	/// Creates a new range.
	pub const fn new(start: Position, end: Position) -> Self {
		Self { start, end }
	}

	/// Creates a zero-width range at `pos`.
	pub const fn point(pos: Position) -> Self {
		Self { start: pos, end: pos }
	}

	/// Returns true if start does not come after end.
	pub fn is_valid(&self) -> bool {
		self.start <= self.end
	}

	/// Returns true if `pos` lies within `[start, end)`.
	#[inline]
	pub fn contains(&self, pos: Position) -> bool {
		self.start <= pos && pos < self.end
	}

	/// Returns true if the two ranges share at least one position.
	///
	/// Ranges that merely touch (one ends where the other starts) do not overlap.
	#[inline]
	pub fn overlaps(&self, other: &Range) -> bool {
		self.start < other.end && other.start < self.end
	}

	/// Shifts both ends by `delta` lines.
	pub fn with_line_offset(self, delta: isize) -> Option<Self> {
		Some(Self {
			start: self.start.with_line_offset(delta)?,
			end: self.end.with_line_offset(delta)?,
		})
	}
}

impl std::fmt::Display for Range {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} - {}", self.start, self.end)
	}
}
