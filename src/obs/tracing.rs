// self
use crate::{_prelude::*, event::RefreshSignal, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRetry<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRetry<F> = F;

/// A span builder used by the interceptor and the orchestrator.
#[derive(Clone, Debug)]
pub struct RetrySpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RetrySpan {
	/// Creates a new span tagged with the provided stage + operation.
	pub fn new(stage: Stage, op: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("refresh_gate.retry", stage = stage.as_str(), op);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, op);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRetry<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a signal emission and how many listeners observed it.
pub fn signal_emitted(signal: &RefreshSignal, listeners: usize) {
	#[cfg(feature = "tracing")]
	{
		match signal {
			RefreshSignal::Error(failure) => tracing::debug!(
				signal = signal.name(),
				origin = ?failure.origin,
				reason = %failure.reason,
				listeners,
				"refresh signal emitted"
			),
			_ => tracing::debug!(signal = signal.name(), listeners, "refresh signal emitted"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (signal, listeners);
	}
}

/// Logs a request that is about to be replayed.
pub fn replay_scheduled(request: &crate::http::RequestDescriptor, role: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			method = request.method.as_str(),
			url = %request.url,
			retry_count = request.retry_count,
			role,
			"replaying request after refresh"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (request, role);
	}
}
