//! Refresh lifecycle signals exchanged between the retry interceptor and the orchestrator.

// std
use std::str::FromStr;
// self
use crate::{_prelude::*, event::Event};

/// Event names for the refresh lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
	/// `refresh-start`: a request needs fresh credentials.
	#[serde(rename = "refresh-start")]
	Start,
	/// `refresh-complete`: new credentials were persisted.
	#[serde(rename = "refresh-complete")]
	Complete,
	/// `refresh-error`: a refresh failed or a request exhausted its retries.
	#[serde(rename = "refresh-error")]
	Error,
}
impl SignalKind {
	/// Every signal kind, in lifecycle order.
	pub const ALL: [SignalKind; 3] = [SignalKind::Start, SignalKind::Complete, SignalKind::Error];

	/// Returns the canonical event name.
	pub const fn as_str(self) -> &'static str {
		match self {
			SignalKind::Start => "refresh-start",
			SignalKind::Complete => "refresh-complete",
			SignalKind::Error => "refresh-error",
		}
	}
}
impl Display for SignalKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SignalKind {
	type Err = UnknownSignal;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SignalKind::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| UnknownSignal { name: s.to_owned() })
	}
}

/// Raised when parsing an event name that is not part of the refresh lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown refresh signal `{name}`.")]
pub struct UnknownSignal {
	/// Name that failed to parse.
	pub name: String,
}

/// Who reported a [`RefreshFailure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
	/// The orchestrator could not obtain or persist new credentials.
	Orchestrator,
	/// A request hit its retry bound; no refresh was attempted.
	RetryExhausted,
}

/// Payload of [`RefreshSignal::Error`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshFailure {
	/// Reporter of the failure.
	pub origin: FailureOrigin,
	/// Human-readable reason.
	pub reason: String,
}
impl RefreshFailure {
	/// Failure reported by the orchestrator.
	pub fn orchestrator(reason: impl Into<String>) -> Self {
		Self { origin: FailureOrigin::Orchestrator, reason: reason.into() }
	}

	/// Failure reported by the interceptor once `request` reached `attempts` retries.
	pub fn retry_exhausted(request: impl Display, attempts: u32) -> Self {
		Self {
			origin: FailureOrigin::RetryExhausted,
			reason: format!("{request} exhausted {attempts} authorization retries"),
		}
	}
}

/// Refresh lifecycle signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshSignal {
	/// A refresh cycle starts; emitted once per cycle by the gate holder.
	Start,
	/// Fresh credentials are persisted.
	Complete,
	/// A refresh failed or a request gave up.
	Error(RefreshFailure),
}
impl RefreshSignal {
	/// Returns the canonical event name.
	pub const fn name(&self) -> &'static str {
		self.kind_of().as_str()
	}

	/// Returns `true` for signals that end a refresh cycle.
	///
	/// Retry exhaustion is informational and does not end anyone else's cycle.
	pub fn is_terminal(&self) -> bool {
		match self {
			RefreshSignal::Start => false,
			RefreshSignal::Complete => true,
			RefreshSignal::Error(failure) => failure.origin == FailureOrigin::Orchestrator,
		}
	}

	const fn kind_of(&self) -> SignalKind {
		match self {
			RefreshSignal::Start => SignalKind::Start,
			RefreshSignal::Complete => SignalKind::Complete,
			RefreshSignal::Error(_) => SignalKind::Error,
		}
	}
}
impl Event for RefreshSignal {
	type Kind = SignalKind;

	fn kind(&self) -> Self::Kind {
		self.kind_of()
	}
}
