//! Per-file document model for incremental lexical and scope tracking.
//!
//! A [`SourceFile`] keeps the classified lines of one file, the syntactic fragments cut from
//! them, a header index of declarations, and five diagnostic bags, all behind one file lock.
//! Edits go through a coalescing queue into the incremental re-scan engine, which re-classifies
//! only as much of the file as an edit can affect. [`DocumentManager`] ties open files to the
//! compilation lock and to the debounce flush path.

mod config;
mod diagnostics;
mod error;
mod file;
mod fragment;
mod header;
mod lines;
mod lock;
mod manager;
mod queue;
mod rescan;
mod scan;
mod tokens;

pub use config::DocumentCfg;
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticCode, DiagnosticStore, Severity, UpdatePolicy};
pub use error::{Error, Result};
pub use file::{FileState, FlushRequest, SourceFile};
pub use fragment::{Comments, DeclarationCategory, Fragment, FragmentDelimiter, FragmentKind};
pub use header::HeaderIndex;
pub use lines::LineStore;
pub use lock::{CompilationLock, FileLock, LockId, ReadGuard, UpgradableGuard, WriteGuard};
pub use manager::{Compilation, DocumentManager};
pub use queue::EditQueue;
pub use rescan::{Rescan, RescanKind, RescanMetrics, plan};
pub use tokens::{TokenLocator, TokenStore};
