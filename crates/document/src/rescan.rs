//! The incremental re-scan engine.
//!
//! Given replacement texts for a contiguous line range, decides how far past the range the
//! stored classification is affected:
//!
//! * the ending context of the last replaced line changed: every later line is re-classified;
//! * otherwise the running indentation entering the first unchanged line changed: later lines
//!   only get their indentation and excess brackets recomputed, until the indentation entering a
//!   line matches what was stored;
//! * otherwise only the replacement itself is classified.

use quire_lexer::{LineRecord, classify_lines, reindent};
use quire_primitives::LineIdx;

use crate::lines::LineStore;
use crate::{Error, Result};

/// How far an update reached past its replacement lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescanKind {
	Direct,
	Reindent,
	Full,
}

impl RescanKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Direct => "direct",
			Self::Reindent => "reindent",
			Self::Full => "full",
		}
	}
}

/// Counters describing the work done by the engine since the file was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanMetrics {
	/// Updates applied.
	pub updates: usize,
	pub direct: usize,
	pub reindented: usize,
	/// Updates that re-classified the whole remainder of the file.
	pub full: usize,
	/// Lines run through the lexical state machine.
	pub lines_classified: usize,
	/// Lines whose indentation was recomputed without re-classification.
	pub lines_reindented: usize,
}

impl RescanMetrics {
	fn record(&mut self, rescan: &Rescan) {
		self.updates += 1;
		self.lines_classified += rescan.replacement_len;
		let tail = rescan.lines.len() - rescan.replacement_len;
		match rescan.kind {
			RescanKind::Direct => self.direct += 1,
			RescanKind::Reindent => {
				self.reindented += 1;
				self.lines_reindented += tail;
			}
			RescanKind::Full => {
				self.full += 1;
				self.lines_classified += tail;
			}
		}
	}
}

/// A planned replacement: store lines `[start, start + count)` become `lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rescan {
	pub start: LineIdx,
	/// Number of stored lines replaced, including any affected tail.
	pub count: usize,
	pub lines: Vec<LineRecord>,
	pub kind: RescanKind,
	/// Number of leading entries of `lines` that come from the edit itself.
	pub replacement_len: usize,
}

impl Rescan {
	/// Net change in the number of lines.
	pub fn line_delta(&self) -> isize {
		self.lines.len() as isize - self.count as isize
	}
}

/// Computes the records replacing lines `[start, start + count)` with `texts`.
pub fn plan<S: AsRef<str>>(store: &LineStore, start: LineIdx, count: usize, texts: &[S], metrics: &mut RescanMetrics) -> Result<Rescan> {
	let len = store.len();
	if start >= len || count == 0 || start + count > len {
		return Err(Error::InvalidArgument(format!("cannot rescan lines {start}..{} of {len}", start + count)));
	}
	if texts.is_empty() {
		return Err(Error::InvalidArgument("rescan needs at least one replacement line".into()));
	}

	let previous = start.checked_sub(1).and_then(|idx| store.get(idx));
	let mut lines = classify_lines(texts.iter().map(AsRef::as_ref), previous);
	let replacement_len = lines.len();
	let old_last = store.line(start + count - 1)?;
	let new_last = &lines[replacement_len - 1];
	let remaining = &store.lines()[start + count..];

	let (kind, tail) = if remaining.is_empty() {
		(RescanKind::Direct, Vec::new())
	} else if new_last.end_context() != old_last.end_context() {
		let remaining_texts = remaining.iter().map(LineRecord::text);
		(RescanKind::Full, classify_lines(remaining_texts, Some(new_last)))
	} else if new_last.final_indentation() != remaining[0].indentation() {
		(RescanKind::Reindent, reindent(remaining, new_last.final_indentation()))
	} else {
		(RescanKind::Direct, Vec::new())
	};

	let count = count + tail.len();
	lines.extend(tail);
	let rescan = Rescan {
		start,
		count,
		lines,
		kind,
		replacement_len,
	};
	metrics.record(&rescan);
	tracing::debug!(
		start,
		replaced = count,
		lines = rescan.lines.len(),
		kind = kind.as_str(),
		"document.update.rescan"
	);
	Ok(rescan)
}

#[cfg(test)]
mod tests;
