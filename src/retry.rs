//! Single-flight retry interceptor for authorization failures.
//!
//! [`RetryInterceptor::handle_failure`] turns a failed dispatch into a replay. Failures whose
//! status is not the configured authorization status are handed back untouched. Authorization
//! failures bump the request's `retry_count`; the first one to find the [`RefreshGate`] free
//! becomes the gate holder, registers a one-shot wait for a terminal signal, emits
//! `refresh-start`, and releases the gate once the orchestrator reports back. Every other
//! failure that arrives while the gate is held only waits for the release. Both then replay the
//! request through the same client, and a replay that fails again re-enters the same decision,
//! so a request retries at most [`RetryPolicy::max_retries`] times before its original error is
//! returned.

mod metrics;
mod policy;

pub use metrics::RetryMetrics;
pub use policy::RetryPolicy;

// self
use crate::{
	_prelude::*,
	error::RequestFailure,
	event::{EventChannel, RefreshFailure, RefreshSignal, SignalKind},
	gate::RefreshGate,
	http::{HttpClient, HttpResponse, RequestDescriptor},
	obs::{self, Outcome, RetrySpan, Stage},
};

/// How the gate holder's wait for a refresh cycle ended.
#[derive(Clone, Debug, PartialEq, Eq)]
enum CycleOutcome {
	Completed,
	Failed,
	TimedOut(std::time::Duration),
	Abandoned,
}

/// Intercepts failed dispatches and coordinates single-flight refresh cycles.
#[derive(Clone, Debug)]
pub struct RetryInterceptor {
	gate: Arc<RefreshGate>,
	channel: EventChannel<RefreshSignal>,
	policy: RetryPolicy,
	metrics: Arc<RetryMetrics>,
}
impl RetryInterceptor {
	/// Creates an interceptor bound to `gate` and `channel` with the default policy.
	pub fn new(gate: Arc<RefreshGate>, channel: EventChannel<RefreshSignal>) -> Self {
		Self { gate, channel, policy: RetryPolicy::default(), metrics: Default::default() }
	}

	/// Replaces the retry policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Gate shared by every request of the owning client.
	pub fn gate(&self) -> &Arc<RefreshGate> {
		&self.gate
	}

	/// Channel the interceptor signals on.
	pub fn channel(&self) -> &EventChannel<RefreshSignal> {
		&self.channel
	}

	/// Active retry policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Counters describing past decisions.
	pub fn metrics(&self) -> &RetryMetrics {
		&self.metrics
	}

	/// Dispatches `request` through `client`, routing a failure through
	/// [`handle_failure`](Self::handle_failure).
	pub async fn send<C>(
		&self,
		client: &C,
		request: RequestDescriptor,
	) -> Result<HttpResponse, RequestFailure>
	where
		C: ?Sized + HttpClient,
	{
		match client.request(&request).await {
			Ok(response) => Ok(response),
			Err(error) => self.handle_failure(client, RequestFailure { request, error }).await,
		}
	}

	/// Resolves a failed dispatch into a replayed response or the original failure.
	///
	/// Returns the failure unchanged when it is not an authorization failure or when the
	/// request already used up its retries. Errors raised by a replay propagate unchanged once
	/// they are no longer retryable.
	pub async fn handle_failure<C>(
		&self,
		client: &C,
		failure: RequestFailure,
	) -> Result<HttpResponse, RequestFailure>
	where
		C: ?Sized + HttpClient,
	{
		let span = RetrySpan::new(Stage::Interceptor, "handle_failure");

		span.instrument(self.replay_until_settled(client, failure)).await
	}

	async fn replay_until_settled<C>(
		&self,
		client: &C,
		mut failure: RequestFailure,
	) -> Result<HttpResponse, RequestFailure>
	where
		C: ?Sized + HttpClient,
	{
		loop {
			let request = self.prepare_replay(failure).await?;

			match client.request(&request).await {
				Ok(response) => {
					self.metrics.record_replay();
					obs::record_outcome(Stage::Interceptor, Outcome::Success);

					return Ok(response);
				},
				Err(error) => failure = RequestFailure { request, error },
			}
		}
	}

	/// Classifies `failure` and, when it is retryable, waits for a refresh cycle and returns the
	/// request to replay.
	async fn prepare_replay(
		&self,
		failure: RequestFailure,
	) -> Result<RequestDescriptor, RequestFailure> {
		if !self.policy.is_unauthorized(failure.status()) {
			self.metrics.record_passthrough();
			obs::record_outcome(Stage::Interceptor, Outcome::Passthrough);

			return Err(failure);
		}

		self.metrics.record_intercepted();
		obs::record_outcome(Stage::Interceptor, Outcome::Attempt);

		let RequestFailure { mut request, error } = failure;

		if self.policy.is_exhausted(request.retry_count) {
			self.metrics.record_exhausted();
			obs::record_outcome(Stage::Interceptor, Outcome::Exhausted);
			self.emit(RefreshSignal::Error(RefreshFailure::retry_exhausted(
				format_args!("{} {}", request.method, request.url),
				request.retry_count,
			)));

			return Err(RequestFailure { request, error });
		}

		request.retry_count += 1;

		let Some(permit) = self.gate.try_acquire() else {
			self.metrics.record_follower();
			self.gate.wait_for_unlock().await;
			obs::replay_scheduled(&request, "follower");

			return Ok(request);
		};

		self.metrics.record_cycle();

		// Registered before `refresh-start` so a synchronous completion cannot slip past.
		let waiter = self
			.channel
			.once(&[SignalKind::Complete, SignalKind::Error], RefreshSignal::is_terminal);

		self.emit(RefreshSignal::Start);

		let outcome = match self.policy.refresh_timeout {
			Some(timeout) => match tokio::time::timeout(timeout, waiter).await {
				Ok(signal) => Self::classify(signal),
				Err(_) => CycleOutcome::TimedOut(timeout),
			},
			None => Self::classify(waiter.await),
		};

		permit.release();

		match outcome {
			CycleOutcome::Completed => {
				obs::replay_scheduled(&request, "acquirer");

				Ok(request)
			},
			CycleOutcome::TimedOut(timeout) => {
				self.metrics.record_timeout();
				obs::record_outcome(Stage::Interceptor, Outcome::Failure);

				Err(RequestFailure {
					request,
					error: Error::RefreshTimeout { timeout, source: Box::new(error) },
				})
			},
			CycleOutcome::Failed | CycleOutcome::Abandoned => {
				obs::record_outcome(Stage::Interceptor, Outcome::Failure);

				Err(RequestFailure { request, error })
			},
		}
	}

	fn classify(signal: Option<RefreshSignal>) -> CycleOutcome {
		match signal {
			Some(RefreshSignal::Complete) => CycleOutcome::Completed,
			Some(_) => CycleOutcome::Failed,
			None => CycleOutcome::Abandoned,
		}
	}

	fn emit(&self, signal: RefreshSignal) {
		let listeners = self.channel.emit(signal.clone());

		obs::signal_emitted(&signal, listeners);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	/// Answers every request with a fixed status, counting dispatches.
	struct FixedStatus {
		status: u16,
		calls: AtomicUsize,
	}
	impl FixedStatus {
		fn new(status: u16) -> Self {
			Self { status, calls: AtomicUsize::new(0) }
		}
	}
	impl HttpClient for FixedStatus {
		fn request<'a>(&'a self, _: &'a RequestDescriptor) -> crate::http::HttpFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let status = self.status;

			Box::pin(async move { Err(Error::Status { status, body: None }) })
		}
	}

	fn request() -> RequestDescriptor {
		RequestDescriptor::get(
			Url::parse("https://api.example.com/a").expect("Fixture URL should parse."),
		)
	}

	fn interceptor() -> RetryInterceptor {
		RetryInterceptor::new(Arc::new(RefreshGate::new()), EventChannel::new())
	}

	fn counter(
		interceptor: &RetryInterceptor,
	) -> (Arc<AtomicUsize>, Vec<crate::event::Subscription>) {
		let count = Arc::new(AtomicUsize::new(0));
		let subscriptions = SignalKind::ALL
			.into_iter()
			.map(|kind| {
				let count = count.clone();

				interceptor.channel().subscribe(kind, move |_| {
					count.fetch_add(1, Ordering::SeqCst);
				})
			})
			.collect();

		(count, subscriptions)
	}

	#[tokio::test]
	async fn non_authorization_failures_pass_through_untouched() {
		let interceptor = interceptor();
		let client = FixedStatus::new(500);
		let (signals, _subscriptions) = counter(&interceptor);
		let failure = interceptor
			.send(&client, request())
			.await
			.expect_err("Server errors should propagate to the caller.");

		assert_eq!(failure.status(), Some(500));
		assert_eq!(failure.request.retry_count, 0);
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
		assert_eq!(signals.load(Ordering::SeqCst), 0);
		assert!(!interceptor.gate().is_locked());
		assert_eq!(interceptor.metrics().passthrough(), 1);
		assert_eq!(interceptor.metrics().intercepted(), 0);
	}

	#[tokio::test]
	async fn exhausted_request_is_not_retried() {
		let interceptor = interceptor();
		let client = FixedStatus::new(401);
		let starts = Arc::new(AtomicUsize::new(0));
		let errors = Arc::new(Mutex::new(Vec::new()));
		let _start = {
			let starts = starts.clone();

			interceptor.channel().subscribe(SignalKind::Start, move |_| {
				starts.fetch_add(1, Ordering::SeqCst);
			})
		};
		let _error = {
			let errors = errors.clone();

			interceptor.channel().subscribe(SignalKind::Error, move |signal| {
				errors.lock().push(signal.clone());
			})
		};
		let mut exhausted = request();

		exhausted.retry_count = 3;

		let failure = interceptor
			.handle_failure(
				&client,
				RequestFailure::new(exhausted, Error::Status { status: 401, body: None }),
			)
			.await
			.expect_err("Exhausted requests should fail permanently.");

		assert!(matches!(failure.error, Error::Status { status: 401, .. }));
		assert_eq!(failure.request.retry_count, 3);
		assert_eq!(client.calls.load(Ordering::SeqCst), 0);
		assert_eq!(starts.load(Ordering::SeqCst), 0);
		assert!(!interceptor.gate().is_locked());

		let errors = errors.lock();

		assert_eq!(errors.len(), 1);
		assert!(matches!(
			&errors[0],
			RefreshSignal::Error(RefreshFailure {
				origin: crate::event::FailureOrigin::RetryExhausted,
				..
			})
		));
	}

	#[tokio::test]
	async fn refresh_timeout_releases_gate_and_wraps_error() {
		let policy =
			RetryPolicy::default().with_refresh_timeout(std::time::Duration::from_millis(20));
		let interceptor = interceptor().with_policy(policy);
		let client = FixedStatus::new(401);
		let failure = interceptor
			.send(&client, request())
			.await
			.expect_err("A refresh that never finishes should time out.");

		assert!(matches!(failure.error, Error::RefreshTimeout { .. }));
		assert_eq!(failure.request.retry_count, 1);
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
		assert!(!interceptor.gate().is_locked());
		assert_eq!(interceptor.metrics().timeouts(), 1);
		assert_eq!(interceptor.channel().listener_count(SignalKind::Complete), 0);
	}

	#[tokio::test]
	async fn orchestrator_failure_releases_acquirer_with_original_error() {
		let interceptor = interceptor();
		let client = FixedStatus::new(401);
		let _orchestrator = {
			let channel = interceptor.channel().clone();

			interceptor.channel().subscribe(SignalKind::Start, move |_| {
				channel.emit(RefreshSignal::Error(RefreshFailure::orchestrator("exchange failed")));
			})
		};
		let failure = interceptor
			.send(&client, request())
			.await
			.expect_err("A failed refresh should surface the original error.");

		assert!(matches!(failure.error, Error::Status { status: 401, .. }));
		assert_eq!(failure.request.retry_count, 1);
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
		assert!(!interceptor.gate().is_locked());
	}

	#[tokio::test]
	async fn synchronous_completion_is_not_missed() {
		let interceptor = interceptor();
		let client = FixedStatus::new(401);
		let _orchestrator = {
			let channel = interceptor.channel().clone();

			interceptor.channel().subscribe(SignalKind::Start, move |_| {
				channel.emit(RefreshSignal::Complete);
			})
		};
		let failure = interceptor
			.send(&client, request())
			.await
			.expect_err("A client that always answers 401 should eventually exhaust retries.");

		assert_eq!(failure.request.retry_count, 3);
		assert_eq!(client.calls.load(Ordering::SeqCst), 4);
		assert_eq!(interceptor.metrics().cycles(), 3);
		assert_eq!(interceptor.metrics().exhausted(), 1);
	}
}
