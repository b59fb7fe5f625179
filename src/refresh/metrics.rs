// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh cycles run by the orchestrator.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	starts: AtomicU64,
	coalesced: AtomicU64,
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of `refresh-start` signals the orchestrator received.
	pub fn starts(&self) -> u64 {
		self.starts.load(Ordering::Relaxed)
	}

	/// Returns the number of `refresh-start` signals served by a cycle that was already due.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns the total number of credential exchanges attempted.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges that persisted new credentials.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges that ended in `refresh-error`.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_starts(&self, count: u64) {
		self.starts.fetch_add(count, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self, count: u64) {
		self.coalesced.fetch_add(count, Ordering::Relaxed);
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
