//! Lines holding header declarations.

use std::collections::BTreeSet;

use quire_primitives::LineIdx;

use crate::fragment::{DeclarationCategory, Fragment};
use crate::lines::invalidate_or_update;

/// Start lines of namespace declarations, open directives, type and callable declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
	namespaces: BTreeSet<LineIdx>,
	open_directives: BTreeSet<LineIdx>,
	types: BTreeSet<LineIdx>,
	callables: BTreeSet<LineIdx>,
}

impl HeaderIndex {
	fn set(&self, category: DeclarationCategory) -> &BTreeSet<LineIdx> {
		match category {
			DeclarationCategory::Namespace => &self.namespaces,
			DeclarationCategory::OpenDirective => &self.open_directives,
			DeclarationCategory::Type => &self.types,
			DeclarationCategory::Callable => &self.callables,
		}
	}

	fn set_mut(&mut self, category: DeclarationCategory) -> &mut BTreeSet<LineIdx> {
		match category {
			DeclarationCategory::Namespace => &mut self.namespaces,
			DeclarationCategory::OpenDirective => &mut self.open_directives,
			DeclarationCategory::Type => &mut self.types,
			DeclarationCategory::Callable => &mut self.callables,
		}
	}

	/// Records the start lines of the declarations among `fragments`.
	pub fn add(&mut self, fragments: &[Fragment]) {
		for fragment in fragments {
			if let Some((category, _)) = fragment.declaration() {
				self.set_mut(category).insert(fragment.range.start.line);
			}
		}
	}

	pub fn lines(&self, category: DeclarationCategory) -> impl Iterator<Item = LineIdx> + '_ {
		self.set(category).iter().copied()
	}

	/// Drops lines in `[start, start + count)` and shifts later ones by `delta`.
	pub fn invalidate_or_update(&mut self, start: LineIdx, count: usize, delta: isize) {
		for category in DeclarationCategory::ALL {
			invalidate_or_update(self.set_mut(category), start, count, delta);
		}
	}
}
