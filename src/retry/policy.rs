//! Retry bound, classification, and wait configuration.

// self
use crate::_prelude::*;

/// Configuration consumed by [`RetryInterceptor`](crate::retry::RetryInterceptor).
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Maximum authorization-triggered retries per request (defaults to 3).
	pub max_retries: u32,
	/// HTTP status that marks an authorization failure (defaults to 401).
	pub unauthorized_status: u16,
	/// Upper bound on the wait for a refresh cycle to finish; `None` waits indefinitely.
	pub refresh_timeout: Option<std::time::Duration>,
}
impl RetryPolicy {
	const DEFAULT_MAX_RETRIES: u32 = 3;
	const DEFAULT_UNAUTHORIZED_STATUS: u16 = 401;

	/// Overrides the retry bound.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the status treated as an authorization failure.
	pub fn with_unauthorized_status(mut self, status: u16) -> Self {
		self.unauthorized_status = status;

		self
	}

	/// Bounds how long the gate holder waits for the refresh cycle to finish.
	pub fn with_refresh_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Returns `true` when `status` marks an authorization failure.
	pub fn is_unauthorized(&self, status: Option<u16>) -> bool {
		status == Some(self.unauthorized_status)
	}

	/// Returns `true` when a request that already retried `retry_count` times may not retry
	/// again.
	pub fn is_exhausted(&self, retry_count: u32) -> bool {
		retry_count >= self.max_retries
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: Self::DEFAULT_MAX_RETRIES,
			unauthorized_status: Self::DEFAULT_UNAUTHORIZED_STATUS,
			refresh_timeout: None,
		}
	}
}
