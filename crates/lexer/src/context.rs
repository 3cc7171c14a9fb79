//! Lexical contexts and the delimiter transition function.

/// Which string or interpolation region the scanner is inside.
///
/// The ordering is significant: every context at or above [`LexicalContext::OpenString`]
/// denotes string content, everything below it is code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LexicalContext {
	/// Plain code.
	#[default]
	NoOpenString,
	/// Code inside a `{...}` argument of an interpolated string.
	OpenInterpolatedArgument,
	/// Inside a plain `"..."` string.
	OpenString,
	/// Inside the literal part of a `$"..."` string.
	OpenInterpolatedString,
	/// Inside a plain string nested in an interpolation argument.
	OpenStringInOpenInterpolatedArgument,
}

/// Delimiters that can change the lexical context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
	/// `"`
	Quote,
	/// `{`
	OpenBrace,
	/// `}`
	CloseBrace,
	/// `$"`
	InterpolatedQuote,
}

/// Result of feeding one delimiter to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
	/// Context after the delimiter.
	pub next: LexicalContext,
	/// False if the delimiter is not allowed here; `next` is then the fallback context.
	pub valid: bool,
}

impl Transition {
	const fn ok(next: LexicalContext) -> Self {
		Self { next, valid: true }
	}

	const fn malformed(next: LexicalContext) -> Self {
		Self { next, valid: false }
	}
}

impl LexicalContext {
	/// Returns true if this context denotes string content.
	#[inline]
	pub const fn is_string(self) -> bool {
		matches!(
			self,
			Self::OpenString | Self::OpenInterpolatedString | Self::OpenStringInOpenInterpolatedArgument
		)
	}

	/// Applies `delimiter` to this context.
	///
	/// A `{` inside an interpolation argument is malformed and leaves the context unchanged.
	/// A `$"` inside an interpolation argument is malformed at the `$`; the `"` still opens
	/// a nested plain string.
	pub const fn transition(self, delimiter: Delimiter) -> Transition {
		use LexicalContext::*;
		match (delimiter, self) {
			(Delimiter::Quote, NoOpenString) => Transition::ok(OpenString),
			(Delimiter::Quote, OpenInterpolatedArgument) => Transition::ok(OpenStringInOpenInterpolatedArgument),
			(Delimiter::Quote, OpenString | OpenInterpolatedString) => Transition::ok(NoOpenString),
			(Delimiter::Quote, OpenStringInOpenInterpolatedArgument) => Transition::ok(OpenInterpolatedArgument),

			(Delimiter::InterpolatedQuote, NoOpenString) => Transition::ok(OpenInterpolatedString),
			(Delimiter::InterpolatedQuote, OpenInterpolatedArgument) => Transition::malformed(OpenStringInOpenInterpolatedArgument),
			(Delimiter::InterpolatedQuote, ctx) => ctx.transition(Delimiter::Quote),

			(Delimiter::OpenBrace, OpenInterpolatedString) => Transition::ok(OpenInterpolatedArgument),
			(Delimiter::OpenBrace, OpenInterpolatedArgument) => Transition::malformed(OpenInterpolatedArgument),
			(Delimiter::OpenBrace, ctx) => Transition::ok(ctx),

			(Delimiter::CloseBrace, OpenInterpolatedArgument) => Transition::ok(OpenInterpolatedString),
			(Delimiter::CloseBrace, ctx) => Transition::ok(ctx),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::LexicalContext::*;
	use super::*;

	#[test]
	fn test_context_ordering_marks_string_content() {
		assert!(NoOpenString < OpenInterpolatedArgument);
		assert!(OpenInterpolatedArgument < OpenString);
		assert!(OpenString < OpenInterpolatedString);
		assert!(OpenInterpolatedString < OpenStringInOpenInterpolatedArgument);
		for ctx in [NoOpenString, OpenInterpolatedArgument, OpenString, OpenInterpolatedString, OpenStringInOpenInterpolatedArgument] {
			assert_eq!(ctx.is_string(), ctx >= OpenString);
		}
	}

	#[test]
	fn test_quote_transitions() {
		assert_eq!(NoOpenString.transition(Delimiter::Quote), Transition::ok(OpenString));
		assert_eq!(OpenString.transition(Delimiter::Quote), Transition::ok(NoOpenString));
		assert_eq!(OpenInterpolatedString.transition(Delimiter::Quote), Transition::ok(NoOpenString));
		assert_eq!(
			OpenInterpolatedArgument.transition(Delimiter::Quote),
			Transition::ok(OpenStringInOpenInterpolatedArgument)
		);
		assert_eq!(
			OpenStringInOpenInterpolatedArgument.transition(Delimiter::Quote),
			Transition::ok(OpenInterpolatedArgument)
		);
	}

	#[test]
	fn test_interpolation_round_trip() {
		let mut ctx = NoOpenString;
		for delim in [Delimiter::InterpolatedQuote, Delimiter::OpenBrace, Delimiter::CloseBrace, Delimiter::Quote] {
			let step = ctx.transition(delim);
			assert!(step.valid, "{delim:?} from {ctx:?}");
			ctx = step.next;
		}
		assert_eq!(ctx, NoOpenString);
	}

	#[test]
	fn test_invalid_transitions_fall_back() {
		assert_eq!(
			OpenInterpolatedArgument.transition(Delimiter::OpenBrace),
			Transition::malformed(OpenInterpolatedArgument)
		);
		assert_eq!(
			OpenInterpolatedArgument.transition(Delimiter::InterpolatedQuote),
			Transition::malformed(OpenStringInOpenInterpolatedArgument)
		);
	}

	#[test]
	fn test_braces_outside_interpolation_keep_context() {
		for ctx in [NoOpenString, OpenString, OpenStringInOpenInterpolatedArgument] {
			assert_eq!(ctx.transition(Delimiter::OpenBrace), Transition::ok(ctx));
			assert_eq!(ctx.transition(Delimiter::CloseBrace), Transition::ok(ctx));
		}
	}
}
