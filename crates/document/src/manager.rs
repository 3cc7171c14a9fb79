//! Open files and the compilation they feed.
//!
//! The compilation lock is the outer lock of the hierarchy: every open file's lock is registered
//! as its dependent, so entering the compilation while holding a file lock fails with
//! [`Error::LockOrder`] instead of risking a deadlock against a thread nesting the other way.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use lsp_types::{PublishDiagnosticsParams, Uri};
use parking_lot::{Mutex, RwLock};
use quire_primitives::TextChange;
use quire_worker::{TaskClass, spawn_named_thread};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::DocumentCfg;
use crate::file::{FlushRequest, SourceFile};
use crate::fragment::DeclarationCategory;
use crate::lock::CompilationLock;
use crate::{Error, Result};

/// Compilation-wide view of the declarations of every open file.
#[derive(Debug, Default)]
pub struct Compilation {
	declarations: FxHashMap<Uri, Vec<(DeclarationCategory, String)>>,
}

impl Compilation {
	/// Declarations last synchronised from `uri`.
	pub fn declarations(&self, uri: &Uri) -> &[(DeclarationCategory, String)] {
		self.declarations.get(uri).map_or(&[], Vec::as_slice)
	}

	/// Every declaration of `category` across files.
	pub fn names(&self, category: DeclarationCategory) -> Vec<String> {
		let mut names: Vec<String> = self
			.declarations
			.values()
			.flatten()
			.filter(|(kind, _)| *kind == category)
			.map(|(_, name)| name.clone())
			.collect();
		names.sort();
		names
	}

	pub fn set_declarations(&mut self, uri: Uri, declarations: Vec<(DeclarationCategory, String)>) {
		self.declarations.insert(uri, declarations);
	}

	pub fn remove(&mut self, uri: &Uri) {
		self.declarations.remove(uri);
	}
}

/// Registry of open files sharing one compilation.
#[derive(Debug)]
pub struct DocumentManager {
	cfg: DocumentCfg,
	compilation: CompilationLock<Compilation>,
	files: RwLock<FxHashMap<Uri, SourceFile>>,
	flush_tx: UnboundedSender<FlushRequest>,
	flush_rx: Mutex<Option<UnboundedReceiver<FlushRequest>>>,
}

impl DocumentManager {
	pub fn new(cfg: DocumentCfg) -> Self {
		let (flush_tx, flush_rx) = mpsc::unbounded_channel();
		Self {
			cfg,
			compilation: CompilationLock::new(Compilation::default()),
			files: RwLock::new(FxHashMap::default()),
			flush_tx,
			flush_rx: Mutex::new(Some(flush_rx)),
		}
	}

	pub fn cfg(&self) -> &DocumentCfg {
		&self.cfg
	}

	/// Opens `uri` with `text` as its content.
	pub fn open(&self, uri: Uri, text: &str) -> Result<SourceFile> {
		if self.files.read().contains_key(&uri) {
			return Err(Error::InvalidArgument(format!("{} is already open", uri.as_str())));
		}
		let file = SourceFile::with_flush_channel(uri.clone(), self.cfg.clone(), self.flush_tx.clone());
		file.replace_content(text)?;
		self.compilation.register_dependent(file.lock_id());
		self.files.write().insert(uri.clone(), file.clone());
		tracing::debug!(uri = uri.as_str(), lines = file.line_count(), "document.open");
		Ok(file)
	}

	/// Closes `uri` and drops its declarations from the compilation.
	pub fn close(&self, uri: &Uri) -> Result<()> {
		let file = self
			.files
			.write()
			.remove(uri)
			.ok_or_else(|| Error::InvalidArgument(format!("{} is not open", uri.as_str())))?;
		self.compilation.unregister_dependent(file.lock_id());
		self.compilation.write()?.remove(uri);
		tracing::debug!(uri = uri.as_str(), "document.close");
		Ok(())
	}

	pub fn file(&self, uri: &Uri) -> Option<SourceFile> {
		self.files.read().get(uri).cloned()
	}

	fn require(&self, uri: &Uri) -> Result<SourceFile> {
		self.file(uri).ok_or_else(|| Error::InvalidArgument(format!("{} is not open", uri.as_str())))
	}

	/// See [`SourceFile::push_change`].
	pub fn push_change(&self, uri: &Uri, change: TextChange) -> Result<bool> {
		self.require(uri)?.push_change(change)
	}

	pub fn replace_content(&self, uri: &Uri, text: &str) -> Result<()> {
		self.require(uri)?.replace_content(text)
	}

	pub fn flush(&self, uri: &Uri) -> Result<()> {
		self.require(uri)?.flush()
	}

	fn apply_flush(&self, request: &FlushRequest) {
		let Some(file) = self.file(&request.uri) else {
			tracing::warn!(uri = request.uri.as_str(), "document.flush.unknown_file");
			return;
		};
		if let Err(err) = file.flush() {
			tracing::warn!(uri = request.uri.as_str(), error = %err, "document.flush.rejected");
		}
	}

	/// Applies the flush requests posted by debounce timers so far, on the calling thread.
	///
	/// Returns the number of requests handled; zero once [`Self::spawn_flush_worker`] owns the channel.
	pub fn process_flush_requests(&self) -> usize {
		let mut rx = self.flush_rx.lock();
		let Some(rx) = rx.as_mut() else {
			return 0;
		};
		let mut handled = 0;
		while let Ok(request) = rx.try_recv() {
			self.apply_flush(&request);
			handled += 1;
		}
		handled
	}

	/// Moves flush handling onto a dedicated thread that lives as long as the manager.
	pub fn spawn_flush_worker(self: &Arc<Self>) -> Result<JoinHandle<()>> {
		let mut rx = self
			.flush_rx
			.lock()
			.take()
			.ok_or_else(|| Error::InvalidArgument("flush worker already running".into()))?;
		let manager: Weak<Self> = Arc::downgrade(self);
		spawn_named_thread(TaskClass::Updates, "quire-flush", move || {
			while let Some(request) = rx.blocking_recv() {
				let Some(manager) = manager.upgrade() else {
					break;
				};
				manager.apply_flush(&request);
			}
			tracing::debug!("document.flush.worker_exit");
		})
		.map_err(|err| Error::Internal(format!("cannot spawn flush worker: {err}")))
	}

	pub fn publish_diagnostics(&self, uri: &Uri, version: Option<i32>) -> Result<PublishDiagnosticsParams> {
		Ok(self.require(uri)?.publish_params(version))
	}

	/// Runs `f` under the compilation read lock.
	pub fn read_compilation<R>(&self, f: impl FnOnce(&Compilation) -> R) -> Result<R> {
		let guard = self.compilation.read()?;
		Ok(f(&guard))
	}

	/// Runs `f` under the compilation write lock.
	pub fn write_compilation<R>(&self, f: impl FnOnce(&mut Compilation) -> R) -> Result<R> {
		let mut guard = self.compilation.write()?;
		Ok(f(&mut guard))
	}

	/// Copies the declarations of `uri` into the compilation, entering the file inside the
	/// compilation lock.
	pub fn sync_compilation(&self, uri: &Uri) -> Result<()> {
		let file = self.require(uri)?;
		let mut compilation = self.compilation.write()?;
		let mut declarations = Vec::new();
		for category in DeclarationCategory::ALL {
			declarations.extend(file.declarations(category)?.into_iter().map(|(_, name, _)| (category, name)));
		}
		compilation.set_declarations(uri.clone(), declarations);
		Ok(())
	}
}
