use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use crate::LexicalContext::{self, *};
use crate::{LineRecord, classify};

fn plain(text: &str) -> LineRecord {
	classify(NoOpenString, text)
}

#[rstest]
#[case::unterminated(r#"let s = "abc"#, NoOpenString, &[8, 12], OpenString)]
#[case::two_strings(r#""a" + "b""#, NoOpenString, &[0, 2, 6, 8], NoOpenString)]
#[case::escaped_quote(r#""a\"b""#, NoOpenString, &[0, 5], NoOpenString)]
#[case::escaped_backslash(r#""a\\" x"#, NoOpenString, &[0, 4], NoOpenString)]
#[case::continued(r#"abc" x"#, OpenString, &[-1, 3], NoOpenString)]
#[case::continued_to_next(r#"abc"#, OpenString, &[-1, 3], OpenString)]
#[case::interpolated(r#"$"x {y} z""#, NoOpenString, &[0, 4, 6, 9], NoOpenString)]
#[case::string_in_argument(r#"$"{"}"}""#, NoOpenString, &[0, 2, 3, 5, 6, 7], NoOpenString)]
#[case::open_argument(r#"$"a {b"#, NoOpenString, &[0, 4], OpenInterpolatedArgument)]
fn test_string_boundaries(
	#[case] text: &str,
	#[case] begin: LexicalContext,
	#[case] boundaries: &[isize],
	#[case] end: LexicalContext,
) {
	let line = classify(begin, text);
	assert_eq!(line.string_boundaries(), boundaries);
	assert_eq!(line.end_context(), end);
	assert_eq!(line.check_invariants(), Ok(()));
}

#[test]
fn test_braces_inside_strings_are_not_counted() {
	let line = plain(r#"f("{", $"{x}") {"#);
	assert_eq!(line.opening_brackets(), 1);
	assert_eq!(line.closing_brackets(), 0);
}

#[test]
fn test_open_brace_in_argument_is_malformed() {
	let line = plain(r#"$"{ { }""#);
	assert_eq!(line.string_boundaries(), &[0, 2, 6, 7]);
	assert_eq!(line.malformed_delimiters(), &[4]);
	assert_eq!(line.opening_brackets(), 0);
	assert_eq!(line.end_context(), NoOpenString);
}

#[test]
fn test_interpolated_quote_in_argument_splits() {
	let line = plain(r#"$"{$"a"}""#);
	assert_eq!(line.malformed_delimiters(), &[3]);
	assert_eq!(line.string_boundaries(), &[0, 2, 4, 6, 7, 8]);
	assert!(!line.is_code(3));
	assert_eq!(line.end_context(), NoOpenString);
}

#[test]
fn test_trailing_comment_is_trimmed() {
	let line = plain("x = 1; // note \n");
	assert_eq!(line.without_ending(), "x = 1; ");
	assert_eq!(line.trailing_comment(), Some("note"));
	assert_eq!(line.terminator(), "\n");
}

#[test]
fn test_documenting_comment_is_not_trailing() {
	let doc = plain("  /// docs");
	assert_eq!(doc.without_ending(), "  ");
	assert_eq!(doc.trailing_comment(), None);

	assert_eq!(plain("x /// after code").trailing_comment(), Some("/ after code"));
	assert_eq!(plain("//// four").trailing_comment(), Some("// four"));
}

#[test]
fn test_comment_markers_inside_strings() {
	let line = plain(r#""//" // c"#);
	assert_eq!(line.string_boundaries(), &[0, 3]);
	assert_eq!(line.trailing_comment(), Some("c"));

	let arg = plain(r#"$"{x // y"#);
	assert_eq!(arg.string_boundaries(), &[0, 2]);
	assert_eq!(arg.end_context(), OpenInterpolatedArgument);
	assert_eq!(arg.trailing_comment(), Some("y"));
}

#[test]
fn test_terminator_lengths() {
	let line = plain("ab\r\n");
	assert_eq!(line.terminator(), "\r\n");
	assert_eq!(line.len(), 4);
	assert_eq!(line.content_len(), 2);
	assert!(plain("").is_empty());
}

#[test]
fn test_excess_brackets_are_debt() {
	let line = plain("}}{ ").with_indentation(0);
	assert_eq!(line.excess_brackets(), &[0, 1]);
	assert_eq!(line.final_indentation(), 1);

	let covered = plain("}}{ ").with_indentation(2);
	assert!(covered.excess_brackets().is_empty());
	assert_eq!(covered.final_indentation(), 1);
}

#[test]
fn test_late_closer_after_opener() {
	let line = plain("{}}").with_indentation(0);
	assert_eq!(line.excess_brackets(), &[2]);
	assert_eq!(line.final_indentation(), 0);
}

fn any_context() -> impl Strategy<Value = LexicalContext> {
	prop_oneof![
		Just(NoOpenString),
		Just(OpenInterpolatedArgument),
		Just(OpenString),
		Just(OpenInterpolatedString),
		Just(OpenStringInOpenInterpolatedArgument),
	]
}

proptest! {
	#[test]
	fn test_classify_upholds_invariants(
		begin in any_context(),
		text in "[a {}\"$\\\\/]{0,32}(\n|\r\n)?",
		indentation in 0usize..4,
	) {
		let line = classify(begin, &text).with_indentation(indentation);
		prop_assert_eq!(line.check_invariants(), Ok(()));
		prop_assert_eq!(line.begin_context(), begin);
	}

	#[test]
	fn test_excess_count_matches_deepest_deficit(text in "[a{}]{0,24}", indentation in 0usize..4) {
		let line = plain(&text).with_indentation(indentation);
		let mut depth = indentation as isize;
		let mut lowest = depth;
		for ch in text.chars() {
			match ch {
				'{' => depth += 1,
				'}' => depth -= 1,
				_ => {}
			}
			lowest = lowest.min(depth);
		}
		prop_assert_eq!(line.excess_brackets().len() as isize, (-lowest).max(0));
		prop_assert_eq!(line.final_indentation() as isize, depth + (-lowest).max(0));
	}
}
