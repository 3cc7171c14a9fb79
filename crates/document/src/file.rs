//! The per-file document model.
//!
//! [`SourceFile`] is a cheap handle to one file's state behind a [`FileLock`]. Every mutation
//! takes the write lock for its whole duration; every read takes the read lock and hands back
//! owned copies, so callers never observe a half-applied update.
//!
//! An update flows through the same steps regardless of its origin (an edit, a whole-file
//! replacement, or a debounced flush): the change is expanded to whole lines, the re-scan engine
//! computes the replacement records, the line store is spliced, fragments in the syntax-check
//! span are dropped, tracked line numbers are shifted, and scope diagnostics are recomputed for
//! the touched lines.

use std::collections::BTreeSet;
use std::sync::Arc;

use lsp_types::{PublishDiagnosticsParams, Uri};
use quire_lexer::{LexicalContext, LineRecord};
use quire_primitives::{LineIdx, Position, Range, TextChange, byte_offset, ends_with_line_break, split_lines, strip_terminator};
use quire_worker::Debouncer;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::DocumentCfg;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticStore};
use crate::fragment::{DeclarationCategory, Fragment, FragmentDelimiter, FragmentKind};
use crate::header::HeaderIndex;
use crate::lines::{LineStore, invalidate_or_update};
use crate::lock::{FileLock, LockId};
use crate::queue::EditQueue;
use crate::rescan::{self, RescanMetrics};
use crate::tokens::{TokenLocator, TokenStore};
use crate::{Error, Result};

/// Posted by the debounce timer when queued edits of a file should be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushRequest {
	pub uri: Uri,
}

/// Everything tracked for one file, guarded as a unit by the file lock.
#[derive(Debug)]
pub struct FileState {
	uri: Uri,
	cfg: DocumentCfg,
	lines: LineStore,
	tokens: TokenStore,
	header: HeaderIndex,
	diagnostics: DiagnosticStore,
	queue: EditQueue,
	debouncer: Option<Debouncer<FlushRequest>>,
	/// Lines whose fragments must be re-extracted.
	edited_content: BTreeSet<LineIdx>,
	/// Lines whose fragments, or their neighbours, changed.
	edited_tokens: BTreeSet<LineIdx>,
	edited_declarations: BTreeSet<String>,
	metrics: RescanMetrics,
}

impl FileState {
	fn new(uri: Uri, cfg: DocumentCfg, debouncer: Option<Debouncer<FlushRequest>>) -> Self {
		Self {
			uri,
			cfg,
			lines: LineStore::new(),
			tokens: TokenStore::new(),
			header: HeaderIndex::default(),
			diagnostics: DiagnosticStore::default(),
			queue: EditQueue::new(),
			debouncer,
			edited_content: BTreeSet::new(),
			edited_tokens: BTreeSet::new(),
			edited_declarations: BTreeSet::new(),
			metrics: RescanMetrics::default(),
		}
	}

	pub fn uri(&self) -> &Uri {
		&self.uri
	}

	pub fn lines(&self) -> &LineStore {
		&self.lines
	}

	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	pub fn header(&self) -> &HeaderIndex {
		&self.header
	}

	pub fn diagnostics(&self) -> &DiagnosticStore {
		&self.diagnostics
	}

	/// Number of edits waiting in the queue.
	pub fn queued_edits(&self) -> usize {
		self.queue.len()
	}

	pub fn rescan_metrics(&self) -> RescanMetrics {
		self.metrics
	}

	fn push_change(&mut self, change: TextChange) -> Result<bool> {
		if !change.range.is_valid() || change.range.end.line >= self.lines.len() {
			return Err(Error::InvalidArgument(format!(
				"change range {} is outside the file ({} lines)",
				change.range,
				self.lines.len()
			)));
		}
		if !self.queue.accepts(&change) {
			self.flush_queue()?;
			self.apply_change(&change)?;
			return Ok(true);
		}

		let trigger = self.cfg.is_flush_trigger(&change.text);
		let original = self.lines.line(change.range.start.line)?.text().to_string();
		self.queue.push(change, &original)?;
		if trigger {
			self.flush_queue()?;
			return Ok(true);
		}
		if let Some(debouncer) = &mut self.debouncer {
			debouncer.schedule(FlushRequest { uri: self.uri.clone() });
		}
		Ok(false)
	}

	fn flush_queue(&mut self) -> Result<()> {
		if let Some(debouncer) = &mut self.debouncer {
			debouncer.cancel();
		}
		let Some(line) = self.queue.line() else {
			return Ok(());
		};
		let original = match self.lines.line(line) {
			Ok(record) => record.text().to_string(),
			Err(err) => {
				self.queue.clear();
				return Err(err);
			}
		};
		let queued = self.queue.len();
		if let Some((line, text)) = self.queue.fold(&original)? {
			tracing::trace!(uri = self.uri.as_str(), line, queued, "document.queue.flush");
			self.update_lines(line, 1, &text)?;
		}
		Ok(())
	}

	fn replace_content(&mut self, text: &str) -> Result<()> {
		if let Some(debouncer) = &mut self.debouncer {
			debouncer.cancel();
		}
		self.queue.clear();
		let whole = Range::new(Position::ZERO, self.lines.end());
		self.apply_change(&TextChange::new(whole, text))
	}

	/// Expands `change` to whole-line text and applies it.
	fn apply_change(&mut self, change: &TextChange) -> Result<()> {
		let range = change.range;
		if !self.lines.contains_range(&range) {
			return Err(Error::InvalidArgument(format!("change range {range} is outside the file")));
		}
		let first = self.lines.line(range.start.line)?.text();
		let last = self.lines.line(range.end.line)?.text();
		let column_error = |pos: Position| Error::InvalidArgument(format!("column of {pos} lies past the end of its line"));
		let prefix_end = byte_offset(strip_terminator(first), range.start.column).ok_or_else(|| column_error(range.start))?;
		let suffix_start = byte_offset(strip_terminator(last), range.end.column).ok_or_else(|| column_error(range.end))?;

		let mut start = range.start.line;
		let mut end = range.end.line;
		let mut text = format!("{}{}{}", &first[..prefix_end], change.text, &last[suffix_start..]);

		// a bare LF completes a CR left on the line before
		if text.starts_with('\n')
			&& let Some(previous) = start.checked_sub(1).and_then(|idx| self.lines.get(idx))
			&& previous.terminator() == "\r"
		{
			start -= 1;
			text.insert_str(0, previous.text());
		}
		while end + 1 < self.lines.len() {
			let next = self.lines.line(end + 1)?.text();
			let joins_crlf = text.ends_with('\r') && next.starts_with('\n');
			if ends_with_line_break(&text) && !joins_crlf {
				break;
			}
			end += 1;
			text.push_str(next);
		}

		tracing::trace!(
			uri = self.uri.as_str(),
			start = range.start.line,
			end = range.end.line,
			inserted = change.text.len(),
			"document.change"
		);
		self.update_lines(start, end - start + 1, &text)
	}

	/// Replaces lines `[start, start + count)` with the lines of `text`.
	fn update_lines(&mut self, start: LineIdx, count: usize, text: &str) -> Result<()> {
		let mut pieces = split_lines(text);
		let reaches_end = start + count == self.lines.len();
		if reaches_end && pieces.last().is_none_or(|piece| ends_with_line_break(piece)) {
			pieces.push("");
		}

		let orig_end = self.lines.end();
		let plan = rescan::plan(&self.lines, start, count, &pieces, &mut self.metrics)?;
		for line in &plan.lines[..plan.replacement_len] {
			line.check_invariants()?;
		}
		let (start, count, new_count) = (plan.start, plan.count, plan.lines.len());
		let kind = plan.kind;
		self.lines.replace(start, count, plan.lines)?;
		self.content_update(start, count, new_count, orig_end)?;
		self.push_scope_diagnostics(start, new_count)?;

		tracing::debug!(
			uri = self.uri.as_str(),
			start,
			replaced = count,
			lines = new_count,
			kind = kind.as_str(),
			"document.update.applied"
		);
		Ok(())
	}

	/// Brings tokens, tracked lines and diagnostics in line with a splice of the line store.
	fn content_update(&mut self, start: LineIdx, count: usize, new_count: usize, orig_end: Position) -> Result<()> {
		let delta = new_count as isize - count as isize;
		let check = self.lines.syntax_check_range(start, new_count)?;
		let end = self.lines.end();
		let check_end = if check.end == end {
			orig_end
		} else {
			check
				.end
				.with_line_offset(-delta)
				.ok_or_else(|| Error::Internal(format!("syntax check end {} precedes the update", check.end)))?
		};

		let touched = self.tokens.remove_overlapping(Range::new(check.start, check_end))?;
		self.edited_tokens.extend(touched);
		self.tokens.replace_lines(start, count, new_count)?;

		invalidate_or_update(&mut self.edited_content, start, count, delta);
		invalidate_or_update(&mut self.edited_tokens, start, count, delta);
		self.header.invalidate_or_update(start, count, delta);

		let start_check = if check.start.line < start { check.start.line + 1 } else { start };
		let mut edited: Vec<LineIdx> = (start_check..check.end.line).collect();
		if edited.is_empty() {
			edited.push(check.end.line);
		}
		if check.end == end {
			edited.push(self.lines.len() - 1);
		}
		self.edited_content.extend(edited);

		self.diagnostics.invalidate(start, count, delta);
		Ok(())
	}

	fn push_scope_diagnostics(&mut self, start: LineIdx, count: usize) -> Result<()> {
		let mut found = Vec::new();
		for (offset, line) in self.lines.range(start, count)?.iter().enumerate() {
			let idx = start + offset;
			found.extend(line.excess_brackets().iter().map(|&col| Diagnostic::excess_bracket(Position::new(idx, col))));
			if self.cfg.malformed_delimiter_diagnostics {
				found.extend(line.malformed_delimiters().iter().map(|&col| Diagnostic::malformed_delimiter(Position::new(idx, col))));
			}
		}

		let last = self.lines.last();
		let end = self.lines.end();
		if last.final_indentation() > 0 {
			found.push(Diagnostic::missing_closing_bracket(end));
		}
		if last.end_context() != LexicalContext::NoOpenString {
			found.push(Diagnostic::missing_string_delimiter(end));
		}
		self.diagnostics.add(DiagnosticCategory::Scope, found);
		Ok(())
	}

	fn merge(&mut self, fragments: Vec<Fragment>) -> Result<BTreeSet<LineIdx>> {
		let declared: Vec<Fragment> = fragments.iter().filter(|f| f.declaration().is_some()).cloned().collect();
		let edited = self.tokens.merge(fragments, &self.lines)?;
		self.header.add(&declared);
		self.edited_tokens.extend(edited.iter().copied());
		Ok(edited)
	}

	fn process_edited_lines(&mut self, mut classify: impl FnMut(&Fragment) -> FragmentKind) -> Result<BTreeSet<LineIdx>> {
		let changed = std::mem::take(&mut self.edited_content);
		if changed.is_empty() {
			return Ok(BTreeSet::new());
		}
		let mut fragments = self.lines.fragments_to_process(&changed)?;
		let mut syntax = Vec::new();
		for fragment in &mut fragments {
			self.diagnostics.remove_within(DiagnosticCategory::Syntax, fragment.extent());
			if fragment.text.is_empty() {
				match fragment.delimiter {
					FragmentDelimiter::Semicolon => syntax.push(Diagnostic::empty_statement(fragment.range.end)),
					FragmentDelimiter::OpenBrace => syntax.push(Diagnostic::misplaced_opening_bracket(fragment.range.end)),
					FragmentDelimiter::CloseBrace | FragmentDelimiter::Missing => {}
				}
			}
			fragment.kind = Some(classify(fragment));
		}
		self.diagnostics.add(DiagnosticCategory::Syntax, syntax);
		tracing::debug!(uri = self.uri.as_str(), lines = changed.len(), fragments = fragments.len(), "document.fragments.processed");
		self.merge(fragments)
	}

	fn declarations(&self, category: DeclarationCategory) -> Result<Vec<(TokenLocator, String, Range)>> {
		let mut found = Vec::new();
		for line in self.header.lines(category) {
			for (slot, fragment) in self.tokens.line(line)?.into_iter().enumerate() {
				if let Some((kind, name)) = fragment.declaration()
					&& kind == category
				{
					found.push((TokenLocator::new(line, slot), name.to_string(), fragment.range));
				}
			}
		}
		Ok(found)
	}

	fn dequeue_token_changes(&mut self) -> Result<BTreeSet<LineIdx>> {
		let mut changed = std::mem::take(&mut self.edited_tokens);
		let mut children = Vec::new();
		for &line in &changed {
			let count = self.tokens.line(line)?.len();
			for slot in 0..count {
				children.extend(self.tokens.children(TokenLocator::new(line, slot))?.into_iter().map(|loc| loc.line));
			}
		}
		changed.extend(children);
		Ok(changed)
	}
}

/// Shared handle to one open file.
#[derive(Debug, Clone)]
pub struct SourceFile {
	uri: Uri,
	inner: Arc<FileLock<FileState>>,
}

impl SourceFile {
	/// Creates an empty file whose queued edits are only applied by explicit flushes and by
	/// non-queueable edits.
	pub fn new(uri: Uri, cfg: DocumentCfg) -> Self {
		let state = FileState::new(uri.clone(), cfg, None);
		Self {
			uri,
			inner: Arc::new(FileLock::new(state)),
		}
	}

	/// Creates an empty file whose debounce timer posts [`FlushRequest`]s into `tx`.
	pub fn with_flush_channel(uri: Uri, cfg: DocumentCfg, tx: UnboundedSender<FlushRequest>) -> Self {
		let debouncer = Debouncer::new(cfg.debounce_delay(), tx);
		let state = FileState::new(uri.clone(), cfg, Some(debouncer));
		Self {
			uri,
			inner: Arc::new(FileLock::new(state)),
		}
	}

	pub fn uri(&self) -> &Uri {
		&self.uri
	}

	/// Identity of the file lock, for dependent-lock registration.
	pub fn lock_id(&self) -> LockId {
		self.inner.id()
	}

	/// Runs `f` under the read lock.
	pub fn read<R>(&self, f: impl FnOnce(&FileState) -> R) -> R {
		let guard = self.inner.read();
		f(&guard)
	}

	fn with_mut<R>(&self, f: impl FnOnce(&mut FileState) -> R) -> R {
		let mut guard = self.inner.write();
		f(&mut guard)
	}

	/// Queues or applies an editor change.
	///
	/// Returns true if the content was updated and diagnostics should be published, false if
	/// the change was deferred.
	pub fn push_change(&self, change: TextChange) -> Result<bool> {
		self.with_mut(|state| state.push_change(change))
	}

	/// Replaces the whole content, discarding queued edits.
	pub fn replace_content(&self, text: &str) -> Result<()> {
		self.with_mut(|state| state.replace_content(text))
	}

	/// Applies queued edits; a no-op that only takes a shared lock when nothing is queued.
	pub fn flush(&self) -> Result<()> {
		let guard = self.inner.upgradable_read();
		if guard.queue.is_empty() {
			return Ok(());
		}
		let mut guard = guard.upgrade();
		guard.flush_queue()
	}

	pub fn line(&self, idx: LineIdx) -> Result<LineRecord> {
		self.read(|state| state.lines.line(idx).cloned())
	}

	pub fn lines(&self) -> Vec<LineRecord> {
		self.read(|state| state.lines.lines().to_vec())
	}

	pub fn line_count(&self) -> usize {
		self.read(|state| state.lines.len())
	}

	pub fn text(&self) -> String {
		self.read(|state| state.lines.text())
	}

	/// Position after the last character of the file.
	pub fn end(&self) -> Position {
		self.read(|state| state.lines.end())
	}

	/// Effective indentation just before `pos`.
	pub fn indentation_at(&self, pos: Position) -> Result<usize> {
		self.read(|state| state.lines.line(pos.line).map(|line| line.indentation_at(pos.column)))
	}

	/// Fragments starting on `line`.
	pub fn tokenized_line(&self, line: LineIdx) -> Result<Vec<Fragment>> {
		self.read(|state| state.tokens.line(line))
	}

	pub fn fragments(&self) -> Vec<Fragment> {
		self.read(|state| state.tokens.fragments())
	}

	pub fn fragment(&self, loc: TokenLocator) -> Result<Fragment> {
		self.read(|state| state.tokens.get(loc))
	}

	pub fn next(&self, loc: TokenLocator) -> Result<Option<TokenLocator>> {
		self.read(|state| state.tokens.next(loc))
	}

	pub fn previous(&self, loc: TokenLocator) -> Result<Option<TokenLocator>> {
		self.read(|state| state.tokens.previous(loc))
	}

	pub fn fragment_at(&self, pos: Position) -> Option<TokenLocator> {
		self.read(|state| state.tokens.fragment_at(pos))
	}

	/// Children of the `{`-terminated fragment at `loc`.
	pub fn children(&self, loc: TokenLocator) -> Result<Vec<TokenLocator>> {
		self.read(|state| state.tokens.children(loc))
	}

	/// Unclassified fragments overlapping `lines`, cut from the current content.
	pub fn fragments_to_process(&self, lines: &BTreeSet<LineIdx>) -> Result<Vec<Fragment>> {
		self.read(|state| state.lines.fragments_to_process(lines))
	}

	/// Merges classified fragments; returns the lines whose fragments or neighbours changed.
	pub fn merge_fragments(&self, fragments: Vec<Fragment>) -> Result<BTreeSet<LineIdx>> {
		self.with_mut(|state| state.merge(fragments))
	}

	/// Re-extracts the fragments of every line edited since the last call, classifies them with
	/// `classify`, records empty-statement and misplaced-bracket diagnostics, and merges them.
	pub fn process_edited_lines(&self, classify: impl FnMut(&Fragment) -> FragmentKind) -> Result<BTreeSet<LineIdx>> {
		self.with_mut(|state| state.process_edited_lines(classify))
	}

	/// Lines edited since the last call whose fragments still need to be re-extracted.
	pub fn dequeue_content_changes(&self) -> BTreeSet<LineIdx> {
		self.with_mut(|state| std::mem::take(&mut state.edited_content))
	}

	/// Lines whose fragments changed since the last call, including the lines of the children of
	/// fragments on those lines.
	pub fn dequeue_token_changes(&self) -> Result<BTreeSet<LineIdx>> {
		self.with_mut(FileState::dequeue_token_changes)
	}

	/// Declarations of `category` with their locators, names and ranges.
	pub fn declarations(&self, category: DeclarationCategory) -> Result<Vec<(TokenLocator, String, Range)>> {
		self.read(|state| state.declarations(category))
	}

	/// Records declarations whose bodies changed and drops staged semantic diagnostics within them.
	pub fn mark_declarations_edited(&self, declarations: Vec<(Range, String)>) -> Result<()> {
		self.with_mut(|state| {
			for (range, name) in declarations {
				state.diagnostics.invalidate_staged(DiagnosticCategory::Semantic, range)?;
				state.edited_declarations.insert(name);
			}
			Ok(())
		})
	}

	pub fn dequeue_edited_declarations(&self) -> BTreeSet<String> {
		self.with_mut(|state| std::mem::take(&mut state.edited_declarations))
	}

	/// Clears header and semantic diagnostics and marks every callable of the file as edited.
	pub fn clear_verification(&self) -> Result<()> {
		self.with_mut(|state| {
			state.diagnostics.clear(DiagnosticCategory::Header);
			state.diagnostics.clear(DiagnosticCategory::Semantic);
			let callables = state.declarations(DeclarationCategory::Callable)?;
			state.edited_declarations.extend(callables.into_iter().map(|(_, name, _)| name));
			Ok(())
		})
	}

	pub fn add_diagnostics(&self, category: DiagnosticCategory, diagnostics: Vec<Diagnostic>) {
		self.with_mut(|state| state.diagnostics.add(category, diagnostics));
	}

	pub fn stage_diagnostics(&self, category: DiagnosticCategory, diagnostics: Vec<Diagnostic>) -> Result<()> {
		self.with_mut(|state| state.diagnostics.stage(category, diagnostics))
	}

	pub fn finalize_diagnostics(&self, category: DiagnosticCategory) -> Result<()> {
		self.with_mut(|state| state.diagnostics.finalize(category))
	}

	pub fn replace_diagnostics(&self, category: DiagnosticCategory, diagnostics: Vec<Diagnostic>) {
		self.with_mut(|state| state.diagnostics.replace(category, diagnostics));
	}

	/// Replaces the context diagnostics of `obsolete` lines.
	pub fn update_context_diagnostics(&self, obsolete: &BTreeSet<LineIdx>, diagnostics: Vec<Diagnostic>) {
		self.with_mut(|state| state.diagnostics.update_context(obsolete, diagnostics));
	}

	pub fn diagnostics(&self, category: DiagnosticCategory) -> Vec<Diagnostic> {
		self.read(|state| state.diagnostics.get(category))
	}

	/// Every visible diagnostic of the file.
	pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
		self.read(|state| state.diagnostics.all())
	}

	pub fn publish_params(&self, version: Option<i32>) -> PublishDiagnosticsParams {
		self.read(|state| state.diagnostics.publish_params(self.uri.clone(), version))
	}

	pub fn rescan_metrics(&self) -> RescanMetrics {
		self.read(FileState::rescan_metrics)
	}
}
