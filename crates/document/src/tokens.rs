//! Per-line fragment storage with stable `(line, slot)` locators.
//!
//! Fragments are stored under their start line with ranges relative to it, so replacing lines
//! never has to rewrite the fragments after them. Every accessor hands out absolute copies.

use std::collections::BTreeSet;

use quire_primitives::{LineIdx, Position, Range};

use crate::fragment::{Comments, Fragment, FragmentDelimiter};
use crate::lines::LineStore;
use crate::{Error, Result};

/// Address of a fragment; only valid until the store changes at that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenLocator {
	pub line: LineIdx,
	pub slot: usize,
}

impl TokenLocator {
	pub const fn new(line: LineIdx, slot: usize) -> Self {
		Self { line, slot }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
	lines: Vec<Vec<Fragment>>,
}

impl Default for TokenStore {
	fn default() -> Self {
		Self { lines: vec![Vec::new()] }
	}
}

fn absolute(line: LineIdx, fragment: &Fragment) -> Fragment {
	let mut fragment = fragment.clone();
	fragment.range = shift(fragment.range, line);
	fragment.header_range = shift(fragment.header_range, line);
	fragment
}

fn shift(range: Range, line: LineIdx) -> Range {
	Range::new(
		Position::new(range.start.line + line, range.start.column),
		Position::new(range.end.line + line, range.end.column),
	)
}

impl TokenStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of lines tracked; always equal to the number of lines of the file.
	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Fragments starting on `line`, with absolute ranges.
	pub fn line(&self, line: LineIdx) -> Result<Vec<Fragment>> {
		let fragments = self
			.lines
			.get(line)
			.ok_or_else(|| Error::InvalidArgument(format!("token line {line} out of range ({} lines)", self.lines.len())))?;
		Ok(fragments.iter().map(|f| absolute(line, f)).collect())
	}

	/// Every fragment in document order, with absolute ranges.
	pub fn fragments(&self) -> Vec<Fragment> {
		self.lines
			.iter()
			.enumerate()
			.flat_map(|(line, fragments)| fragments.iter().map(move |f| absolute(line, f)))
			.collect()
	}

	pub fn locators(&self) -> impl Iterator<Item = TokenLocator> + '_ {
		self.lines
			.iter()
			.enumerate()
			.flat_map(|(line, fragments)| (0..fragments.len()).map(move |slot| TokenLocator::new(line, slot)))
	}

	fn slot(&self, loc: TokenLocator) -> Result<&Fragment> {
		self.lines
			.get(loc.line)
			.and_then(|fragments| fragments.get(loc.slot))
			.ok_or_else(|| Error::Internal(format!("stale token locator {loc:?}")))
	}

	/// The fragment at `loc` with an absolute range.
	pub fn get(&self, loc: TokenLocator) -> Result<Fragment> {
		self.slot(loc).map(|f| absolute(loc.line, f))
	}

	/// The next fragment in document order, skipping fragment-less lines.
	pub fn next(&self, loc: TokenLocator) -> Result<Option<TokenLocator>> {
		self.slot(loc)?;
		if loc.slot + 1 < self.lines[loc.line].len() {
			return Ok(Some(TokenLocator::new(loc.line, loc.slot + 1)));
		}
		Ok((loc.line + 1..self.lines.len())
			.find(|&line| !self.lines[line].is_empty())
			.map(|line| TokenLocator::new(line, 0)))
	}

	/// The previous fragment in document order, skipping fragment-less lines.
	pub fn previous(&self, loc: TokenLocator) -> Result<Option<TokenLocator>> {
		self.slot(loc)?;
		if loc.slot > 0 {
			return Ok(Some(TokenLocator::new(loc.line, loc.slot - 1)));
		}
		Ok(self.last_before_line(loc.line))
	}

	fn last_before_line(&self, line: LineIdx) -> Option<TokenLocator> {
		(0..line.min(self.lines.len()))
			.rev()
			.find(|&idx| !self.lines[idx].is_empty())
			.map(|idx| TokenLocator::new(idx, self.lines[idx].len() - 1))
	}

	/// The fragment whose extent contains `pos`.
	pub fn fragment_at(&self, pos: Position) -> Option<TokenLocator> {
		let on_line = self.lines.get(pos.line).and_then(|fragments| {
			fragments
				.iter()
				.rposition(|f| f.range.start.column <= pos.column)
				.map(|slot| TokenLocator::new(pos.line, slot))
		});
		let candidate = on_line.or_else(|| self.last_before_line(pos.line))?;
		let fragment = absolute(candidate.line, &self.lines[candidate.line][candidate.slot]);
		fragment.extent().contains(pos).then_some(candidate)
	}

	/// Returns true if any stored fragment overlaps `range`.
	pub fn overlaps_existing(&self, range: &Range) -> bool {
		!self.overlapping(range).is_empty()
	}

	fn overlapping(&self, range: &Range) -> Vec<TokenLocator> {
		let last = range.end.line.min(self.lines.len().saturating_sub(1));
		let mut found: Vec<TokenLocator> = (range.start.line..=last)
			.flat_map(|line| {
				self.lines[line]
					.iter()
					.enumerate()
					.filter(move |(_, f)| absolute(line, f).extent().overlaps(range))
					.map(move |(slot, _)| TokenLocator::new(line, slot))
			})
			.collect();
		found.extend(self.fragment_at(range.start));
		found.sort();
		found.dedup();
		found
	}

	/// Lines of `loc` and its document-order neighbours.
	fn neighbourhood(&self, loc: TokenLocator) -> Result<[Option<LineIdx>; 3]> {
		Ok([
			self.previous(loc)?.map(|l| l.line),
			Some(loc.line),
			self.next(loc)?.map(|l| l.line),
		])
	}

	/// Removes every fragment overlapping `range`, including one enveloping its start.
	///
	/// Returns the lines whose fragments changed together with the lines of their neighbours.
	pub fn remove_overlapping(&mut self, range: Range) -> Result<BTreeSet<LineIdx>> {
		if range.end.line >= self.lines.len() || !range.is_valid() {
			return Err(Error::Internal(format!("cannot remove tokens in {range}: {} token lines", self.lines.len())));
		}
		let removed = self.overlapping(&range);
		let mut edited = BTreeSet::new();
		for &loc in &removed {
			edited.extend(self.neighbourhood(loc)?.into_iter().flatten());
		}
		for loc in removed.into_iter().rev() {
			self.lines[loc.line].remove(loc.slot);
		}
		Ok(edited)
	}

	/// Replaces the fragment lists of lines `[start, start + count)` with `new_count` empty lines.
	pub fn replace_lines(&mut self, start: LineIdx, count: usize, new_count: usize) -> Result<()> {
		if start + count > self.lines.len() {
			return Err(Error::Internal(format!("cannot replace token lines {start}..{}", start + count)));
		}
		self.lines.splice(start..start + count, std::iter::repeat_with(Vec::new).take(new_count));
		Ok(())
	}

	/// Merges newly classified fragments into the store.
	///
	/// The fragments must lie inside the file, be ordered, be mutually disjoint, and not overlap
	/// anything already stored. Trailing comments of fragment-less lines directly above the first
	/// fragment of each start line become its opening comments; comments on the lines spanned by
	/// the last one become its closing comments. Returns the lines whose fragments changed
	/// together with the lines of their neighbours.
	pub fn merge(&mut self, fragments: Vec<Fragment>, content: &LineStore) -> Result<BTreeSet<LineIdx>> {
		self.verify_merge(&fragments, content)?;

		let mut groups: Vec<(LineIdx, Vec<Fragment>)> = Vec::new();
		for fragment in fragments {
			let line = fragment.range.start.line;
			let relative = fragment
				.with_line_offset(-(line as isize))
				.ok_or_else(|| Error::Internal("fragment range before its own start line".into()))?;
			match groups.last_mut() {
				Some((start, group)) if *start == line => group.push(relative),
				_ => groups.push((line, vec![relative])),
			}
		}

		let mut added = Vec::new();
		for (line, group) in groups {
			added.extend(group.iter().map(|f| (line, f.range.start)));
			let mut merged: Vec<Fragment> = std::mem::take(&mut self.lines[line]);
			merged.extend(group);
			merged.sort_by_key(|f| f.range.start);
			for fragment in &mut merged {
				fragment.comments = Comments::default();
			}
			self.attach_comments(line, &mut merged, content);
			self.lines[line] = merged;
		}

		let mut edited = BTreeSet::new();
		for (line, start) in added {
			let slot = self.lines[line]
				.iter()
				.position(|f| f.range.start == start)
				.ok_or_else(|| Error::Internal(format!("merged fragment at {line}:{} not found", start.column)))?;
			edited.extend(self.neighbourhood(TokenLocator::new(line, slot))?.into_iter().flatten());
		}
		Ok(edited)
	}

	fn verify_merge(&self, fragments: &[Fragment], content: &LineStore) -> Result<()> {
		if let Some(fragment) = fragments.iter().find(|f| !content.contains_range(&f.range)) {
			return Err(Error::InvalidArgument(format!("fragment range {} is outside the file", fragment.range)));
		}
		if let Some(pair) = fragments.windows(2).find(|w| w[0].extent().end > w[1].range.start) {
			return Err(Error::InvalidArgument(format!(
				"fragments {} and {} are out of order or overlap",
				pair[0].range, pair[1].range
			)));
		}
		if let Some(fragment) = fragments.iter().find(|f| self.overlaps_existing(&f.extent())) {
			return Err(Error::InvalidArgument(format!("fragment {} overlaps existing tokens", fragment.range)));
		}
		Ok(())
	}

	fn attach_comments(&self, line: LineIdx, merged: &mut [Fragment], content: &LineStore) {
		let comment = |idx: LineIdx| content.get(idx).and_then(|l| l.trailing_comment()).map(str::to_string);
		let Some(first) = merged.first_mut() else {
			return;
		};
		let above = (0..line).rev().take_while(|&idx| self.lines[idx].is_empty()).collect::<Vec<_>>();
		first.comments.opening = Comments::collect(above.into_iter().rev().map(comment));

		let Some(last) = merged.last_mut() else {
			return;
		};
		let mut end = line + last.range.end.line;
		if end != line && self.lines.get(end).is_some_and(|fragments| !fragments.is_empty()) {
			end -= 1;
		}
		last.comments.closing = Comments::collect((line..=end).map(comment));
	}

	/// Fragments one level deeper than the `{`-terminated fragment at `loc`, up to the end of its block.
	pub fn children(&self, loc: TokenLocator) -> Result<Vec<TokenLocator>> {
		let parent = self.slot(loc)?;
		if parent.delimiter != FragmentDelimiter::OpenBrace {
			return Ok(Vec::new());
		}
		let mut children = Vec::new();
		let mut current = self.next(loc)?;
		while let Some(next) = current {
			let fragment = self.slot(next)?;
			if fragment.indentation <= parent.indentation {
				break;
			}
			if fragment.indentation == parent.indentation + 1 {
				children.push(next);
			}
			current = self.next(next)?;
		}
		Ok(children)
	}
}
