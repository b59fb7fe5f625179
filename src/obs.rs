//! Optional observability helpers for the retry protocol.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `refresh_gate.retry` with the `stage`
//!   (component) and `op` (call site) fields, plus debug events for every emitted signal.
//! - Enable `metrics` to increment the `refresh_gate_retry_total` counter for every recorded
//!   outcome, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Components that report observability data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Retry interceptor handling a failed request.
	Interceptor,
	/// Refresh orchestrator running a credential exchange.
	Orchestrator,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Interceptor => "interceptor",
			Stage::Orchestrator => "orchestrator",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion (replayed request or persisted credentials).
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Failure that was not an authorization failure and was handed back untouched.
	Passthrough,
	/// Request reached its retry bound.
	Exhausted,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Passthrough => "passthrough",
			Outcome::Exhausted => "exhausted",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
