use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use quire_lexer::{LexicalContext, classify_lines};

use super::*;

fn store(texts: &[&str]) -> LineStore {
	let mut store = LineStore::new();
	store.replace(0, 1, classify_lines(texts.iter().copied(), None)).unwrap();
	store
}

#[test]
fn test_new_store_has_one_empty_line() {
	let store = LineStore::new();
	assert_eq!(store.len(), 1);
	assert_eq!(store.end(), Position::ZERO);
	assert_eq!(store.text(), "");
}

#[test]
fn test_replace_splices_lines() {
	let mut store = store(&["a\n", "b\n", "c"]);
	let previous = store.get(0).cloned();
	let replacement = classify_lines(["x\n", "y\n"], previous.as_ref());
	store.replace(1, 1, replacement).unwrap();
	assert_eq!(store.text(), "a\nx\ny\nc");
	assert_eq!(store.end(), Position::new(3, 1));
}

#[test]
fn test_replace_rejects_terminator_on_last_line() {
	let mut store = store(&["a\n", "b"]);
	let replacement = classify_lines(["b\n"], store.get(0));
	assert!(matches!(store.replace(1, 1, replacement), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_replace_rejects_missing_terminator_before_continuation() {
	let mut store = store(&["a\n", "b"]);
	let replacement = classify_lines(["a"], None);
	assert!(matches!(store.replace(0, 1, replacement), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_replace_rejects_inconsistent_continuation() {
	let mut store = store(&["a\n", "b"]);
	let opens = classify_lines(["{\n"], None);
	assert!(matches!(store.replace(0, 1, opens), Err(Error::InvalidArgument(_))));
	let quote = classify_lines(["\"\n"], None);
	assert!(matches!(store.replace(0, 1, quote), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_replace_rejects_bad_ranges() {
	let mut store = store(&["a\n", "b"]);
	assert!(store.replace(2, 1, classify_lines(["x"], None)).is_err());
	assert!(store.replace(1, 2, classify_lines(["x"], None)).is_err());
	assert!(store.replace(0, 1, Vec::new()).is_err());
	assert_eq!(store.get(0).map(|l| l.begin_context()), Some(LexicalContext::NoOpenString));
}

#[test]
fn test_invalidate_or_update_shifts_tail() {
	let mut set: BTreeSet<usize> = [0, 2, 3, 5, 9].into_iter().collect();
	invalidate_or_update(&mut set, 2, 2, 1);
	assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 6, 10]);

	let mut set: BTreeSet<usize> = [1, 4, 6].into_iter().collect();
	invalidate_or_update(&mut set, 2, 3, -2);
	assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 4]);
}
