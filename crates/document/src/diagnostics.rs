//! Diagnostic bags and their invalidation on line-range updates.
//!
//! Each file keeps one bag per [`DiagnosticCategory`]. Staged categories accumulate updates in
//! a staging buffer that only becomes visible on [`DiagnosticStore::finalize`]. Every content
//! update drops the diagnostics touching the replaced lines and shifts the ones after them, in
//! visible and staged buffers alike.

use std::collections::BTreeSet;

use lsp_types::{DiagnosticSeverity, NumberOrString, PublishDiagnosticsParams, Uri};
use quire_primitives::{LineIdx, Position, Range};

use crate::{Error, Result};

/// Who raised a diagnostic, which also decides its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCategory {
	/// Lexical and bracket structure, recomputed by every update.
	Scope,
	Syntax,
	/// Fragment nesting and placement.
	Context,
	Header,
	Semantic,
}

/// How updates to a category become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
	Direct,
	/// Accumulate in a staging buffer, publish on finalize.
	Staged,
}

impl DiagnosticCategory {
	pub const ALL: [Self; 5] = [Self::Scope, Self::Syntax, Self::Context, Self::Header, Self::Semantic];

	pub const fn policy(self) -> UpdatePolicy {
		match self {
			Self::Header | Self::Semantic => UpdatePolicy::Staged,
			Self::Scope | Self::Syntax | Self::Context => UpdatePolicy::Direct,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Scope => "scope",
			Self::Syntax => "syntax",
			Self::Context => "context",
			Self::Header => "header",
			Self::Semantic => "semantic",
		}
	}

	const fn index(self) -> usize {
		self as usize
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
	Error,
	Warning,
	Information,
	Hint,
}

impl From<Severity> for DiagnosticSeverity {
	fn from(severity: Severity) -> Self {
		match severity {
			Severity::Error => DiagnosticSeverity::ERROR,
			Severity::Warning => DiagnosticSeverity::WARNING,
			Severity::Information => DiagnosticSeverity::INFORMATION,
			Severity::Hint => DiagnosticSeverity::HINT,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
	ExcessBracket,
	MissingClosingBracket,
	MissingStringDelimiter,
	MalformedDelimiter,
	EmptyStatement,
	MisplacedOpeningBracket,
	/// A code raised by a collaborator (parser, context builder, type checker).
	External(String),
}

impl DiagnosticCode {
	pub fn as_str(&self) -> &str {
		match self {
			Self::ExcessBracket => "excess-bracket",
			Self::MissingClosingBracket => "missing-closing-bracket",
			Self::MissingStringDelimiter => "missing-string-delimiter",
			Self::MalformedDelimiter => "malformed-delimiter",
			Self::EmptyStatement => "empty-statement",
			Self::MisplacedOpeningBracket => "misplaced-opening-bracket",
			Self::External(code) => code,
		}
	}

	/// Diagnostics reported at the end of the file rather than at the offending text.
	pub fn is_end_of_file(&self) -> bool {
		matches!(self, Self::MissingClosingBracket | Self::MissingStringDelimiter)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
	pub range: Range,
	pub severity: Severity,
	pub code: DiagnosticCode,
	pub message: String,
	pub category: DiagnosticCategory,
}

impl Diagnostic {
	pub fn new(category: DiagnosticCategory, code: DiagnosticCode, severity: Severity, range: Range, message: impl Into<String>) -> Self {
		Self {
			range,
			severity,
			code,
			message: message.into(),
			category,
		}
	}

	fn at_char(pos: Position) -> Range {
		Range::new(pos, Position::new(pos.line, pos.column + 1))
	}

	pub fn excess_bracket(pos: Position) -> Self {
		Self::new(
			DiagnosticCategory::Scope,
			DiagnosticCode::ExcessBracket,
			Severity::Error,
			Self::at_char(pos),
			"closing bracket without a matching opening bracket",
		)
	}

	pub fn malformed_delimiter(pos: Position) -> Self {
		Self::new(
			DiagnosticCategory::Scope,
			DiagnosticCode::MalformedDelimiter,
			Severity::Error,
			Self::at_char(pos),
			"delimiter is not allowed inside an interpolation argument",
		)
	}

	pub fn missing_closing_bracket(end_of_file: Position) -> Self {
		Self::new(
			DiagnosticCategory::Scope,
			DiagnosticCode::MissingClosingBracket,
			Severity::Error,
			Range::point(end_of_file),
			"missing closing bracket",
		)
	}

	pub fn missing_string_delimiter(end_of_file: Position) -> Self {
		Self::new(
			DiagnosticCategory::Scope,
			DiagnosticCode::MissingStringDelimiter,
			Severity::Error,
			Range::point(end_of_file),
			"unterminated string",
		)
	}

	pub fn empty_statement(pos: Position) -> Self {
		Self::new(
			DiagnosticCategory::Syntax,
			DiagnosticCode::EmptyStatement,
			Severity::Warning,
			Self::at_char(pos),
			"empty statement",
		)
	}

	pub fn misplaced_opening_bracket(pos: Position) -> Self {
		Self::new(
			DiagnosticCategory::Syntax,
			DiagnosticCode::MisplacedOpeningBracket,
			Severity::Error,
			Self::at_char(pos),
			"opening bracket does not follow a statement or declaration",
		)
	}

	/// Returns true if the diagnostic touches any line in `[start, end)`.
	fn touches_lines(&self, start: LineIdx, end: LineIdx) -> bool {
		self.range.start.line < end && self.range.end.line >= start
	}

	pub fn to_lsp(&self) -> lsp_types::Diagnostic {
		lsp_types::Diagnostic {
			range: self.range.into(),
			severity: Some(self.severity.into()),
			code: Some(NumberOrString::String(self.code.as_str().to_string())),
			source: Some(format!("quire.{}", self.category.as_str())),
			message: self.message.clone(),
			..Default::default()
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Bag {
	visible: Vec<Diagnostic>,
	staged: Vec<Diagnostic>,
}

/// The five diagnostic bags of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticStore {
	bags: [Bag; 5],
}

impl DiagnosticStore {
	fn bag(&self, category: DiagnosticCategory) -> &Bag {
		&self.bags[category.index()]
	}

	fn bag_mut(&mut self, category: DiagnosticCategory) -> &mut Bag {
		&mut self.bags[category.index()]
	}

	fn staged_bag(&mut self, category: DiagnosticCategory) -> Result<&mut Bag> {
		match category.policy() {
			UpdatePolicy::Staged => Ok(self.bag_mut(category)),
			UpdatePolicy::Direct => Err(Error::InvalidArgument(format!("{} diagnostics are not staged", category.as_str()))),
		}
	}

	/// Makes `diagnostics` visible immediately.
	pub fn add(&mut self, category: DiagnosticCategory, diagnostics: impl IntoIterator<Item = Diagnostic>) {
		self.bag_mut(category).visible.extend(diagnostics);
	}

	/// Adds `diagnostics` to the staging buffer of a staged category.
	pub fn stage(&mut self, category: DiagnosticCategory, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Result<()> {
		self.staged_bag(category)?.staged.extend(diagnostics);
		Ok(())
	}

	/// Publishes the staging buffer; it stays the base for further staging.
	pub fn finalize(&mut self, category: DiagnosticCategory) -> Result<()> {
		let bag = self.staged_bag(category)?;
		bag.visible = bag.staged.clone();
		Ok(())
	}

	/// Replaces a category's content: staged categories are staged and finalized in one step.
	pub fn replace(&mut self, category: DiagnosticCategory, diagnostics: Vec<Diagnostic>) {
		let bag = self.bag_mut(category);
		if category.policy() == UpdatePolicy::Staged {
			bag.staged = diagnostics.clone();
		}
		bag.visible = diagnostics;
	}

	/// Drops context diagnostics starting on `obsolete` lines, then adds `diagnostics`.
	pub fn update_context(&mut self, obsolete: &BTreeSet<LineIdx>, diagnostics: impl IntoIterator<Item = Diagnostic>) {
		let bag = self.bag_mut(DiagnosticCategory::Context);
		bag.visible.retain(|d| !obsolete.contains(&d.range.start.line));
		bag.visible.extend(diagnostics);
	}

	/// Applies a replacement of lines `[start, start + count)` that changed the line count by `delta`.
	///
	/// Diagnostics touching the replaced lines are dropped, later ones are shifted, and the
	/// end-of-file scope diagnostics are always dropped.
	pub fn invalidate(&mut self, start: LineIdx, count: usize, delta: isize) {
		let end = start + count;
		let relocate = |diagnostics: &mut Vec<Diagnostic>| {
			diagnostics.retain(|d| !d.touches_lines(start, end));
			if delta == 0 {
				return;
			}
			for diagnostic in diagnostics.iter_mut().filter(|d| d.range.start.line >= end) {
				if let Some(range) = diagnostic.range.with_line_offset(delta) {
					diagnostic.range = range;
				}
			}
		};
		for category in DiagnosticCategory::ALL {
			let bag = self.bag_mut(category);
			if category == DiagnosticCategory::Scope {
				bag.visible.retain(|d| !d.code.is_end_of_file());
			}
			relocate(&mut bag.visible);
			relocate(&mut bag.staged);
		}
	}

	/// Drops staged diagnostics of `category` overlapping `range`.
	pub fn invalidate_staged(&mut self, category: DiagnosticCategory, range: Range) -> Result<()> {
		self.staged_bag(category)?.staged.retain(|d| !(d.range.overlaps(&range) || range.contains(d.range.start)));
		Ok(())
	}

	/// Drops visible diagnostics of `category` starting inside `range`.
	pub fn remove_within(&mut self, category: DiagnosticCategory, range: Range) {
		self.bag_mut(category).visible.retain(|d| !range.contains(d.range.start));
	}

	/// Empties both buffers of `category`.
	pub fn clear(&mut self, category: DiagnosticCategory) {
		*self.bag_mut(category) = Bag::default();
	}

	/// Visible diagnostics of `category`.
	pub fn get(&self, category: DiagnosticCategory) -> Vec<Diagnostic> {
		self.bag(category).visible.clone()
	}

	/// Staged diagnostics of `category`.
	pub fn staged(&self, category: DiagnosticCategory) -> Vec<Diagnostic> {
		self.bag(category).staged.clone()
	}

	/// All visible diagnostics, category by category.
	pub fn all(&self) -> Vec<Diagnostic> {
		self.bags.iter().flat_map(|bag| bag.visible.iter().cloned()).collect()
	}

	pub fn publish_params(&self, uri: Uri, version: Option<i32>) -> PublishDiagnosticsParams {
		let diagnostics = self.bags.iter().flat_map(|bag| bag.visible.iter().map(Diagnostic::to_lsp)).collect();
		PublishDiagnosticsParams::new(uri, diagnostics, version)
	}
}
