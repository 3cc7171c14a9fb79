//! Sequence-level classification and indentation passes.

use crate::{LexicalContext, LineRecord};

/// Classifies consecutive lines, seeding context and indentation from `previous`.
///
/// With no previous line the scan starts in plain code at indentation zero.
pub fn classify_lines<'a>(texts: impl IntoIterator<Item = &'a str>, previous: Option<&LineRecord>) -> Vec<LineRecord> {
	let mut context = previous.map_or(LexicalContext::NoOpenString, LineRecord::end_context);
	let mut indentation = previous.map_or(0, LineRecord::final_indentation);
	texts
		.into_iter()
		.map(|text| {
			let line = LineRecord::classify(context, text).with_indentation(indentation);
			context = line.end_context();
			indentation = line.final_indentation();
			line
		})
		.collect()
}

/// Recomputes indentation and excess brackets for `lines` starting from `indentation`.
///
/// String and comment structure is kept as is; only the brace arithmetic runs again. Stops at the
/// first line already stored at the running indentation, since every line from there on is
/// unchanged; the result covers only the lines that precede it.
pub fn reindent<'a>(lines: impl IntoIterator<Item = &'a LineRecord>, mut indentation: usize) -> Vec<LineRecord> {
	let mut out = Vec::new();
	for line in lines {
		if line.indentation() == indentation {
			break;
		}
		let line = line.with_indentation(indentation);
		indentation = line.final_indentation();
		out.push(line);
	}
	out
}
