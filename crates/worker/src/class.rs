/// Shared execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Short timers that gate editor-visible updates.
	Timer,
	/// Long-lived threads applying queued document updates.
	Updates,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Timer => "timer",
			Self::Updates => "updates",
		}
	}
}
