//! Cancellable one-shot timers that post a message when a quiet period elapses.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::TaskClass;
use crate::token::{GenerationClock, GenerationToken};

/// Posts a message to a channel once no newer request has arrived for `delay`.
///
/// Each call to [`Debouncer::schedule`] supersedes the previous one; only the most recent
/// message is ever delivered. The timer never runs the work itself, it only enqueues.
#[derive(Debug)]
pub struct Debouncer<M> {
	delay: Duration,
	tx: mpsc::UnboundedSender<M>,
	clock: GenerationClock,
	current: Option<GenerationToken>,
}

impl<M: Send + 'static> Debouncer<M> {
	/// Creates a debouncer delivering into `tx`.
	pub fn new(delay: Duration, tx: mpsc::UnboundedSender<M>) -> Self {
		Self {
			delay,
			tx,
			clock: GenerationClock::default(),
			current: None,
		}
	}

	/// Returns the configured quiet period.
	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Restarts the timer, delivering `message` after the quiet period.
	pub fn schedule(&mut self, message: M) {
		self.cancel();
		let token = GenerationToken::new(self.clock.next());
		self.current = Some(token.clone());

		let delay = self.delay;
		let tx = self.tx.clone();
		tracing::trace!(generation = token.generation(), delay_ms = delay.as_millis() as u64, "debounce.schedule");
		crate::spawn(TaskClass::Timer, async move {
			tokio::select! {
				_ = token.cancelled() => {
					tracing::trace!(generation = token.generation(), "debounce.cancelled");
				}
				_ = tokio::time::sleep(delay) => {
					if token.is_cancelled() {
						return;
					}
					tracing::trace!(generation = token.generation(), "debounce.fire");
					if tx.send(message).is_err() {
						tracing::debug!(generation = token.generation(), "debounce.receiver_closed");
					}
				}
			}
		});
	}

	/// Stops the pending timer, if any.
	pub fn cancel(&mut self) {
		if let Some(token) = self.current.take() {
			token.cancel();
		}
	}

	/// Returns true if a message was scheduled and not cancelled since.
	pub fn is_armed(&self) -> bool {
		self.current.as_ref().is_some_and(|t| !t.is_cancelled())
	}
}

impl<M> Drop for Debouncer<M> {
	fn drop(&mut self) {
		if let Some(token) = self.current.take() {
			token.cancel();
		}
	}
}
