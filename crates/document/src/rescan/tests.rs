use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quire_lexer::classify_lines;

use super::*;

fn terminated(lines: &[&str]) -> Vec<String> {
	let last = lines.len() - 1;
	lines
		.iter()
		.enumerate()
		.map(|(idx, line)| if idx == last { line.to_string() } else { format!("{line}\n") })
		.collect()
}

fn store(lines: &[&str]) -> LineStore {
	let mut store = LineStore::new();
	let texts = terminated(lines);
	store.replace(0, 1, classify_lines(texts.iter().map(String::as_str), None)).unwrap();
	store
}

fn apply(store: &mut LineStore, start: usize, count: usize, texts: &[&str], metrics: &mut RescanMetrics) -> Rescan {
	let rescan = plan(store, start, count, texts, metrics).unwrap();
	store.replace(rescan.start, rescan.count, rescan.lines.clone()).unwrap();
	rescan
}

#[test]
fn test_same_structure_stays_direct() {
	let mut store = store(&["a", "b", "c"]);
	let mut metrics = RescanMetrics::default();
	let rescan = apply(&mut store, 1, 1, &["xyz\n"], &mut metrics);
	assert_eq!((rescan.kind, rescan.count, rescan.lines.len()), (RescanKind::Direct, 1, 1));
	assert_eq!(metrics.direct, 1);
	assert_eq!(metrics.lines_classified, 1);
}

#[test]
fn test_opening_a_string_rescans_everything_after() {
	let mut store = store(&["a", "b", "c"]);
	let mut metrics = RescanMetrics::default();
	let rescan = apply(&mut store, 0, 1, &["\"a\n"], &mut metrics);
	assert_eq!((rescan.kind, rescan.count), (RescanKind::Full, 3));
	assert!(store.lines().iter().all(|line| line.continues_string()));
	assert_eq!(metrics.full, 1);
	assert_eq!(metrics.lines_classified, 3);
}

#[test]
fn test_opening_a_brace_reindents_tail() {
	let mut store = store(&["a", "b", "}"]);
	assert_eq!(store.get(2).unwrap().excess_brackets(), &[0]);

	let mut metrics = RescanMetrics::default();
	let rescan = apply(&mut store, 0, 1, &["{\n"], &mut metrics);
	assert_eq!((rescan.kind, rescan.count), (RescanKind::Reindent, 3));
	assert_eq!(store.get(1).unwrap().indentation(), 1);
	assert!(store.get(2).unwrap().excess_brackets().is_empty());
	assert_eq!(store.last().final_indentation(), 0);
	assert_eq!(metrics.lines_reindented, 2);
}

#[test]
fn test_reindent_stops_once_indentation_settles() {
	let mut store = store(&["a", "}", "b", "c"]);
	let mut metrics = RescanMetrics::default();
	let rescan = apply(&mut store, 0, 1, &["{\n"], &mut metrics);
	assert_eq!((rescan.kind, rescan.count), (RescanKind::Reindent, 2));
	assert!(store.get(1).unwrap().excess_brackets().is_empty());
	assert_eq!(store.get(2).unwrap().indentation(), 0);
}

#[test]
fn test_line_count_changes() {
	let mut store = store(&["a", "b"]);
	let mut metrics = RescanMetrics::default();
	let rescan = apply(&mut store, 0, 1, &["x\n", "y\n", "z\n"], &mut metrics);
	assert_eq!(rescan.line_delta(), 2);
	assert_eq!(store.text(), "x\ny\nz\nb");
}

#[test]
fn test_plan_rejects_bad_arguments() {
	let store = store(&["a", "b"]);
	let mut metrics = RescanMetrics::default();
	assert!(plan(&store, 2, 1, &["x"], &mut metrics).is_err());
	assert!(plan(&store, 0, 0, &["x"], &mut metrics).is_err());
	assert!(plan(&store, 1, 1, &[] as &[&str], &mut metrics).is_err());
	assert_eq!(metrics, RescanMetrics::default());
}

fn source_lines() -> impl Strategy<Value = Vec<String>> {
	prop::collection::vec("[a{}\"$\\\\/ ]{0,8}", 1..6)
}

proptest! {
	#[test]
	fn test_incremental_matches_full_classification(
		original in source_lines(),
		replacement in source_lines(),
		start_seed in any::<usize>(),
		count_seed in any::<usize>(),
	) {
		let original: Vec<&str> = original.iter().map(String::as_str).collect();
		let mut store = store(&original);
		let start = start_seed % original.len();
		let count = 1 + count_seed % (original.len() - start);

		let mut texts: Vec<String> = replacement.iter().map(|line| format!("{line}\n")).collect();
		if start + count == original.len()
			&& let Some(last) = texts.last_mut()
		{
			last.pop();
		}
		let mut metrics = RescanMetrics::default();
		let rescan = plan(&store, start, count, &texts, &mut metrics).unwrap();
		store.replace(rescan.start, rescan.count, rescan.lines).unwrap();

		let mut expected: Vec<String> = terminated(&original);
		expected.splice(start..start + count, texts);
		let fresh = classify_lines(expected.iter().map(String::as_str), None);
		prop_assert_eq!(store.lines(), fresh.as_slice());
	}
}
