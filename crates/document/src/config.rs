//! Document model configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::Result;

/// Tunables for edit coalescing and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentCfg {
	/// Quiet period after which queued edits are applied.
	pub debounce_ms: u64,
	/// Characters that apply queued edits immediately when typed.
	pub flush_triggers: String,
	/// Whether malformed interpolation delimiters are reported.
	pub malformed_delimiter_diagnostics: bool,
}

impl Default for DocumentCfg {
	fn default() -> Self {
		Self {
			debounce_ms: 500,
			flush_triggers: "\"{}\\".to_string(),
			malformed_delimiter_diagnostics: true,
		}
	}
}

impl DocumentCfg {
	/// Parses a configuration from TOML; missing keys keep their defaults.
	pub fn from_toml(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	pub fn debounce_delay(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	/// Returns true if `text` contains a character that flushes the edit queue.
	pub fn is_flush_trigger(&self, text: &str) -> bool {
		text.chars().any(|c| self.flush_triggers.contains(c))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_apply_to_missing_keys() {
		let cfg = DocumentCfg::from_toml("debounce_ms = 50").unwrap();
		assert_eq!(cfg.debounce_delay(), Duration::from_millis(50));
		assert_eq!(cfg.flush_triggers, DocumentCfg::default().flush_triggers);
		assert!(cfg.malformed_delimiter_diagnostics);
	}

	#[test]
	fn test_flush_triggers() {
		let cfg = DocumentCfg::default();
		for text in ["\"", "{", "}", "\\", "  {"] {
			assert!(cfg.is_flush_trigger(text), "{text:?}");
		}
		assert!(!cfg.is_flush_trigger("a"));
		assert!(!cfg.is_flush_trigger(""));
	}

	#[test]
	fn test_invalid_toml_is_reported() {
		assert!(matches!(DocumentCfg::from_toml("debounce_ms = \"soon\""), Err(crate::Error::Config(_))));
	}
}
