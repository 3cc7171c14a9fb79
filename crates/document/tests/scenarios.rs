use lsp_types::Uri;
use pretty_assertions::assert_eq;
use quire_document::{Diagnostic, DiagnosticCategory, DiagnosticCode, DocumentCfg, Severity, SourceFile};
use quire_lexer::LexicalContext;
use quire_primitives::{Position, Range, TextChange};
use rstest::rstest;

fn open(text: &str) -> SourceFile {
	let uri: Uri = "file:///scenario.qs".parse().unwrap();
	let file = SourceFile::new(uri, DocumentCfg::default());
	file.replace_content(text).unwrap();
	file
}

fn sorted(mut diagnostics: Vec<Diagnostic>) -> Vec<(Position, String)> {
	diagnostics.sort_by_key(|d| (d.range.start, d.code.as_str().to_string()));
	diagnostics.into_iter().map(|d| (d.range.start, d.code.as_str().to_string())).collect()
}

fn end_of_file(file: &SourceFile) -> Vec<DiagnosticCode> {
	file.diagnostics(DiagnosticCategory::Scope)
		.into_iter()
		.filter(|d| d.code.is_end_of_file())
		.map(|d| d.code)
		.collect()
}

fn external(line: usize) -> Diagnostic {
	Diagnostic::new(
		DiagnosticCategory::Syntax,
		DiagnosticCode::External("QS3000".into()),
		Severity::Error,
		Range::new(Position::new(line, 0), Position::new(line, 2)),
		"unexpected code fragment",
	)
}

#[test]
fn test_unterminated_string_at_end_of_file() {
	let file = open("let s = \"ab");
	let all = file.all_diagnostics();
	assert_eq!(all.len(), 1);
	assert_eq!(all[0].code, DiagnosticCode::MissingStringDelimiter);
	assert_eq!(all[0].range, Range::point(Position::new(0, 11)));
}

#[test]
fn test_two_line_block_indentation() {
	let file = open("{\n}");
	let lines = file.lines();
	assert_eq!(lines[0].final_indentation(), 1);
	assert_eq!(lines[1].final_indentation(), 0);
	assert!(lines.iter().all(|line| line.excess_brackets().is_empty()));
	assert!(file.all_diagnostics().is_empty());
}

#[test]
fn test_leading_excess_closers() {
	let file = open("}}{ ");
	let line = file.line(0).unwrap();
	assert_eq!(line.excess_brackets(), &[0, 1]);
	assert_eq!(line.final_indentation(), 1);
	assert_eq!(
		sorted(file.all_diagnostics()),
		vec![
			(Position::new(0, 0), "excess-bracket".to_string()),
			(Position::new(0, 1), "excess-bracket".to_string()),
			(Position::new(0, 4), "missing-closing-bracket".to_string()),
		]
	);
}

const BLOCK: &str = "a;\nb {\n  c;\n  d;\n  e;\n}\nf;\ng;\nh;\n";

#[test]
fn test_balanced_block_replacement_stays_local() {
	let file = open(BLOCK);
	file.add_diagnostics(DiagnosticCategory::Syntax, vec![external(3), external(8)]);
	let before = file.rescan_metrics();

	let block = Range::new(Position::new(2, 0), Position::new(5, 0));
	assert!(file.push_change(TextChange::new(block, "  x;\n  y;\n  z;\n")).unwrap());

	let after = file.rescan_metrics();
	assert_eq!(after.full, before.full);
	assert_eq!(after.reindented, before.reindented);
	assert_eq!(after.updates, before.updates + 1);
	assert_eq!(file.line(2).unwrap().text(), "  x;\n");
	assert_eq!(file.line(5).unwrap().final_indentation(), 0);

	let syntax = file.diagnostics(DiagnosticCategory::Syntax);
	assert_eq!(syntax, vec![external(8)]);
}

#[test]
fn test_inserted_lines_shift_later_diagnostics() {
	let file = open(BLOCK);
	file.add_diagnostics(DiagnosticCategory::Syntax, vec![external(1), external(8)]);
	file.push_change(TextChange::insert(Position::new(3, 0), "  w;\n")).unwrap();
	assert_eq!(
		file.diagnostics(DiagnosticCategory::Syntax),
		vec![external(1), external(9)]
	);
}

#[test]
fn test_opening_brace_rescans_only_arithmetic() {
	let file = open(BLOCK);
	let before = file.rescan_metrics();
	file.push_change(TextChange::insert(Position::new(0, 2), "{")).unwrap();

	let after = file.rescan_metrics();
	assert_eq!(after.full, before.full);
	assert_eq!(after.reindented, before.reindented + 1);
	assert_eq!(file.line(9).unwrap().indentation(), 1);
	assert_eq!(end_of_file(&file), vec![DiagnosticCode::MissingClosingBracket]);
}

#[test]
fn test_opening_quote_rescans_the_rest_of_the_file() {
	let file = open(BLOCK);
	file.push_change(TextChange::insert(Position::new(0, 0), "\"")).unwrap();
	assert_eq!(file.rescan_metrics().full, 1);
	assert!(file.lines().iter().skip(1).all(|line| line.begin_context() == LexicalContext::OpenString));
	assert_eq!(end_of_file(&file), vec![DiagnosticCode::MissingStringDelimiter]);

	file.push_change(TextChange::new(Range::new(Position::ZERO, Position::new(0, 1)), "")).unwrap();
	file.flush().unwrap();
	assert_eq!(file.rescan_metrics().full, 2);
	assert!(end_of_file(&file).is_empty());
	assert_eq!(file.text(), BLOCK);
}

#[test]
fn test_identical_replacement_is_idempotent() {
	let file = open("a {\n  }}\nlet s = \"x\"; // done\n\"open\nstill open");
	let lines = file.lines();
	let diagnostics = sorted(file.all_diagnostics());

	for (idx, line) in lines.iter().enumerate() {
		let content = line.text().trim_end_matches(['\r', '\n']).to_string();
		let range = Range::new(Position::new(idx, 0), Position::new(idx, content.chars().count()));
		file.push_change(TextChange::new(range, content)).unwrap();
		file.flush().unwrap();
	}

	assert_eq!(file.lines(), lines);
	assert_eq!(sorted(file.all_diagnostics()), diagnostics);
}

#[rstest]
#[case(Position::new(0, 0))]
#[case(Position::new(1, 2))]
#[case(Position::new(2, 4))]
#[case(Position::new(3, 2))]
#[case(Position::new(4, 1))]
fn test_unmatched_brace_round_trip(#[case] at: Position) {
	let file = open("namespace N {\n  function F() : Unit {\n    let x = 1;\n  }\n}\n");
	assert!(end_of_file(&file).is_empty());

	assert!(file.push_change(TextChange::insert(at, "{")).unwrap());
	assert_eq!(end_of_file(&file), vec![DiagnosticCode::MissingClosingBracket]);

	let inserted = Range::new(at, Position::new(at.line, at.column + 1));
	file.push_change(TextChange::new(inserted, "")).unwrap();
	file.flush().unwrap();
	assert!(end_of_file(&file).is_empty());
	assert!(file.all_diagnostics().is_empty());
}

#[test]
fn test_string_boundary_on_single_line_file() {
	let file = open("x");
	assert!(file.push_change(TextChange::insert(Position::new(0, 1), "\"")).unwrap());
	assert_eq!(file.line(0).unwrap().end_context(), LexicalContext::OpenString);
	assert_eq!(end_of_file(&file), vec![DiagnosticCode::MissingStringDelimiter]);

	let before = file.rescan_metrics();
	assert!(file.push_change(TextChange::insert(Position::new(0, 2), "\"")).unwrap());
	let after = file.rescan_metrics();
	assert_eq!(file.line(0).unwrap().end_context(), LexicalContext::NoOpenString);
	assert_eq!(after.full, before.full);
	assert_eq!(after.lines_classified, before.lines_classified + 1);
	assert!(end_of_file(&file).is_empty());
}
