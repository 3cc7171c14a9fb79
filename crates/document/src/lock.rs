//! Reader-writer locks with per-thread ownership tracking.
//!
//! Every file owns a [`FileLock`]; the compilation owns a [`CompilationLock`] that must always be
//! entered before any file lock registered as its dependent. Acquisitions are recorded in a
//! thread-local table so that the compilation lock can refuse, instead of deadlock, when the
//! current thread already holds a dependent file lock. The check is compiled in for debug builds
//! and for the `lock-order-checks` feature.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Error, Result};

const ORDER_CHECKS: bool = cfg!(any(debug_assertions, feature = "lock-order-checks"));

/// Process-unique identity of a tracked lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(u64);

impl LockId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns true if the current thread holds this lock in any mode.
	pub fn is_held(self) -> bool {
		HELD.with(|held| held.borrow().contains_key(&self))
	}
}

impl fmt::Display for LockId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "lock#{}", self.0)
	}
}

thread_local! {
	static HELD: RefCell<FxHashMap<LockId, usize>> = RefCell::new(FxHashMap::default());
}

/// Registration of one acquisition in the thread-local table; released on drop.
#[derive(Debug)]
struct HeldMark(LockId);

impl HeldMark {
	fn acquire(id: LockId) -> Self {
		HELD.with(|held| *held.borrow_mut().entry(id).or_default() += 1);
		Self(id)
	}
}

impl Drop for HeldMark {
	fn drop(&mut self) {
		HELD.with(|held| {
			let mut held = held.borrow_mut();
			if let Some(count) = held.get_mut(&self.0) {
				*count -= 1;
				if *count == 0 {
					held.remove(&self.0);
				}
			}
		});
	}
}

/// Shared access guard.
pub struct ReadGuard<'a, T> {
	guard: RwLockReadGuard<'a, T>,
	_held: HeldMark,
}

impl<T> Deref for ReadGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.guard
	}
}

/// Exclusive access guard.
pub struct WriteGuard<'a, T> {
	guard: RwLockWriteGuard<'a, T>,
	_held: HeldMark,
}

impl<T> Deref for WriteGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.guard
	}
}

impl<T> DerefMut for WriteGuard<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		&mut self.guard
	}
}

/// Shared access that can later be upgraded to exclusive access.
///
/// Only one upgradable guard exists per lock at a time; plain readers are not blocked.
pub struct UpgradableGuard<'a, T> {
	guard: RwLockUpgradableReadGuard<'a, T>,
	held: HeldMark,
}

impl<'a, T> UpgradableGuard<'a, T> {
	/// Waits for readers to leave and converts into a write guard.
	pub fn upgrade(self) -> WriteGuard<'a, T> {
		WriteGuard {
			guard: RwLockUpgradableReadGuard::upgrade(self.guard),
			_held: self.held,
		}
	}
}

impl<T> Deref for UpgradableGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.guard
	}
}

/// Reader-writer lock whose acquisitions are tracked per thread.
///
/// Reads are recursive: a thread may take a read lock it already holds even while a writer waits.
pub struct FileLock<T> {
	id: LockId,
	inner: RwLock<T>,
}

impl<T> FileLock<T> {
	pub fn new(value: T) -> Self {
		Self {
			id: LockId::next(),
			inner: RwLock::new(value),
		}
	}

	pub fn id(&self) -> LockId {
		self.id
	}

	pub fn read(&self) -> ReadGuard<'_, T> {
		let guard = self.inner.read_recursive();
		ReadGuard {
			guard,
			_held: HeldMark::acquire(self.id),
		}
	}

	pub fn upgradable_read(&self) -> UpgradableGuard<'_, T> {
		debug_assert!(!self.id.is_held(), "upgradable read on {} re-entered", self.id);
		let guard = self.inner.upgradable_read();
		UpgradableGuard {
			guard,
			held: HeldMark::acquire(self.id),
		}
	}

	pub fn write(&self) -> WriteGuard<'_, T> {
		debug_assert!(!self.id.is_held(), "write on {} re-entered", self.id);
		let guard = self.inner.write();
		WriteGuard {
			guard,
			_held: HeldMark::acquire(self.id),
		}
	}
}

impl<T> fmt::Debug for FileLock<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FileLock").field("id", &self.id).finish_non_exhaustive()
	}
}

/// The outer lock of the hierarchy.
///
/// Dependent locks are registered explicitly. Entering this lock while the current thread holds
/// a dependent, and does not already hold this lock, is reported as [`Error::LockOrder`].
pub struct CompilationLock<T> {
	lock: FileLock<T>,
	dependents: Mutex<FxHashSet<LockId>>,
}

impl<T> CompilationLock<T> {
	pub fn new(value: T) -> Self {
		Self {
			lock: FileLock::new(value),
			dependents: Mutex::new(FxHashSet::default()),
		}
	}

	pub fn id(&self) -> LockId {
		self.lock.id()
	}

	/// Declares `id` as a lock that must only be entered inside this one.
	pub fn register_dependent(&self, id: LockId) {
		self.dependents.lock().insert(id);
	}

	pub fn unregister_dependent(&self, id: LockId) {
		self.dependents.lock().remove(&id);
	}

	pub fn read(&self) -> Result<ReadGuard<'_, T>> {
		self.check_order("read")?;
		Ok(self.lock.read())
	}

	pub fn upgradable_read(&self) -> Result<UpgradableGuard<'_, T>> {
		self.check_reentry("upgradable read")?;
		self.check_order("upgradable read")?;
		Ok(self.lock.upgradable_read())
	}

	pub fn write(&self) -> Result<WriteGuard<'_, T>> {
		self.check_reentry("write")?;
		self.check_order("write")?;
		Ok(self.lock.write())
	}

	fn check_reentry(&self, mode: &'static str) -> Result<()> {
		if self.id().is_held() {
			tracing::error!(lock = %self.id(), mode, "lock.reentry");
			return Err(Error::LockOrder(format!("{mode} on {} requested while already held by this thread", self.id())));
		}
		Ok(())
	}

	fn check_order(&self, mode: &'static str) -> Result<()> {
		if !ORDER_CHECKS || self.id().is_held() {
			return Ok(());
		}
		let dependents = self.dependents.lock();
		if let Some(dependent) = dependents.iter().copied().find(|id| id.is_held()) {
			tracing::error!(lock = %self.id(), %dependent, mode, "lock.order_violation");
			return Err(Error::LockOrder(format!(
				"compilation {mode} requested while dependent {dependent} is held by this thread"
			)));
		}
		Ok(())
	}
}

impl<T> fmt::Debug for CompilationLock<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompilationLock").field("id", &self.id()).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests;
