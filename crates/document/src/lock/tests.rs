use super::*;

#[test]
fn test_held_marks_follow_guards() {
	let lock = FileLock::new(1u32);
	assert!(!lock.id().is_held());
	{
		let a = lock.read();
		let b = lock.read();
		assert_eq!(*a + *b, 2);
		assert!(lock.id().is_held());
		drop(a);
		assert!(lock.id().is_held());
	}
	assert!(!lock.id().is_held());

	let guard = lock.upgradable_read();
	let mut guard = guard.upgrade();
	*guard = 5;
	assert!(lock.id().is_held());
	drop(guard);
	assert!(!lock.id().is_held());
	assert_eq!(*lock.read(), 5);
}

#[test]
fn test_compilation_then_file_is_allowed() {
	let compilation = CompilationLock::new(());
	let file = FileLock::new(0);
	compilation.register_dependent(file.id());

	let _outer = compilation.write().unwrap();
	*file.write() += 1;
	assert_eq!(*file.read(), 1);
}

#[test]
fn test_reentering_read_compilation_while_holding_file() {
	let compilation = CompilationLock::new(());
	let file = FileLock::new(0);
	compilation.register_dependent(file.id());

	let _outer = compilation.read().unwrap();
	let _inner = file.read();
	assert!(compilation.read().is_ok());
}

#[cfg(any(debug_assertions, feature = "lock-order-checks"))]
#[test]
fn test_file_then_compilation_is_reported() {
	let compilation = CompilationLock::new(());
	let file = FileLock::new(0);
	compilation.register_dependent(file.id());

	let _inner = file.read();
	assert!(matches!(compilation.write(), Err(Error::LockOrder(_))));
	assert!(matches!(compilation.read(), Err(Error::LockOrder(_))));
	assert!(matches!(compilation.upgradable_read(), Err(Error::LockOrder(_))));
}

#[test]
fn test_unregistered_locks_are_not_checked() {
	let compilation = CompilationLock::new(());
	let file = FileLock::new(0);
	compilation.register_dependent(file.id());
	compilation.unregister_dependent(file.id());

	let _inner = file.read();
	assert!(compilation.write().is_ok());
}

#[test]
fn test_compilation_write_reentry_is_refused() {
	let compilation = CompilationLock::new(0);
	let _read = compilation.read().unwrap();
	assert!(matches!(compilation.write(), Err(Error::LockOrder(_))));
}
