//! Coalescing of keystroke-sized edits.
//!
//! Consecutive single-line edits to the same line are held back and folded into one replacement
//! text for that line, so that typing a word costs one re-scan instead of one per character.

use std::collections::VecDeque;

use quire_primitives::{LineIdx, TextChange, changed_text, ends_with_line_break, split_lines};

use crate::Result;

/// Pending edits, all on the same line and in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditQueue {
	pending: VecDeque<TextChange>,
}

impl EditQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// The line the queued edits apply to.
	pub fn line(&self) -> Option<LineIdx> {
		self.pending.front().map(|change| change.range.start.line)
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	/// Returns true if `change` can join the queue.
	///
	/// Only single-line edits inserting at most one non-whitespace-led character, without a line
	/// break, on the line already queued (if any) are deferred.
	pub fn accepts(&self, change: &TextChange) -> bool {
		let small = change.text.trim_start().chars().count() <= 1;
		let breaks_line = split_lines(&change.text).iter().any(|piece| ends_with_line_break(piece));
		change.is_single_line() && small && !breaks_line && self.line().is_none_or(|line| line == change.range.start.line)
	}

	/// Appends `change` after checking that it splices cleanly onto `original`, the current text
	/// of the queued line, once the edits already queued are applied.
	///
	/// Callers check [`Self::accepts`] first. A rejected change leaves the queue untouched.
	pub fn push(&mut self, change: TextChange, original: &str) -> Result<()> {
		let replayed = self.replay(original)?;
		changed_text(&replayed, change.range.start.column, change.range.end.column, &change.text)?;
		tracing::trace!(line = change.range.start.line, queued = self.pending.len() + 1, "document.queue.push");
		self.pending.push_back(change);
		Ok(())
	}

	fn replay(&self, original: &str) -> Result<String> {
		let mut text = original.to_string();
		for change in &self.pending {
			text = changed_text(&text, change.range.start.column, change.range.end.column, &change.text)?;
		}
		Ok(text)
	}

	/// Applies every queued edit in order to `original` and empties the queue.
	///
	/// Returns the line and its new text, or `None` if nothing was queued. On error the queue is
	/// left as it was.
	pub fn fold(&mut self, original: &str) -> Result<Option<(LineIdx, String)>> {
		let Some(line) = self.line() else {
			return Ok(None);
		};
		let text = self.replay(original)?;
		self.pending.clear();
		Ok(Some((line, text)))
	}

	pub fn clear(&mut self) {
		self.pending.clear();
	}
}
