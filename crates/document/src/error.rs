use quire_lexer::InvariantViolation;
use quire_primitives::TextError;
use thiserror::Error;

/// Errors raised by the document model.
///
/// Lexical problems in the source text are never errors; they surface as diagnostics.
#[derive(Debug, Error)]
pub enum Error {
	/// The caller violated an input contract (bad range, malformed replacement).
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	/// Stored state is inconsistent, e.g. a stale token locator or a broken line invariant.
	#[error("internal error: {0}")]
	Internal(String),
	/// A lock was requested in an order that can deadlock.
	#[error("lock order violation: {0}")]
	LockOrder(String),
	/// Configuration could not be parsed.
	#[error("config parse error: {0}")]
	Config(#[from] toml::de::Error),
}

impl From<TextError> for Error {
	fn from(err: TextError) -> Self {
		Self::InvalidArgument(err.to_string())
	}
}

impl From<InvariantViolation> for Error {
	fn from(err: InvariantViolation) -> Self {
		Self::Internal(err.to_string())
	}
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, Error>;
