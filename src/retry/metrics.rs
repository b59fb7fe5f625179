// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for interceptor decisions.
#[derive(Debug, Default)]
pub struct RetryMetrics {
	intercepted: AtomicU64,
	passthrough: AtomicU64,
	cycles: AtomicU64,
	followers: AtomicU64,
	replays: AtomicU64,
	exhausted: AtomicU64,
	timeouts: AtomicU64,
}
impl RetryMetrics {
	/// Returns the number of authorization failures that entered the retry protocol.
	pub fn intercepted(&self) -> u64 {
		self.intercepted.load(Ordering::Relaxed)
	}

	/// Returns the number of failures handed back untouched because they were not
	/// authorization failures.
	pub fn passthrough(&self) -> u64 {
		self.passthrough.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh cycles this interceptor drove as gate holder.
	pub fn cycles(&self) -> u64 {
		self.cycles.load(Ordering::Relaxed)
	}

	/// Returns the number of failures that waited on someone else's refresh cycle.
	pub fn followers(&self) -> u64 {
		self.followers.load(Ordering::Relaxed)
	}

	/// Returns the number of replays that succeeded.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that hit the retry bound.
	pub fn exhausted(&self) -> u64 {
		self.exhausted.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh waits that hit the configured timeout.
	pub fn timeouts(&self) -> u64 {
		self.timeouts.load(Ordering::Relaxed)
	}

	pub(crate) fn record_intercepted(&self) {
		self.intercepted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_passthrough(&self) {
		self.passthrough.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cycle(&self) {
		self.cycles.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_follower(&self) {
		self.followers.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replay(&self) {
		self.replays.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exhausted(&self) {
		self.exhausted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_timeout(&self) {
		self.timeouts.fetch_add(1, Ordering::Relaxed);
	}
}
