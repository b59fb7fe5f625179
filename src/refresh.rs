//! Refresh orchestrator: the single writer of credentials.
//!
//! The orchestrator listens for `refresh-start`, exchanges the stored credentials for fresh
//! ones through a [`CredentialExchange`], persists the result, and answers every cycle with
//! exactly one terminal signal: `refresh-complete` once the new credentials are visible to
//! readers, or `refresh-error` when the exchange or the store failed. Starts that queue up
//! while the orchestrator is idle are served by the same cycle.

mod config;
#[cfg(feature = "reqwest")] mod exchange;
mod metrics;

pub use config::*;
#[cfg(feature = "reqwest")] pub use exchange::RefreshTokenExchange;
pub use metrics::RefreshMetrics;

// crates.io
use tokio::{sync::mpsc, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	event::{EventChannel, RefreshFailure, RefreshSignal, SignalKind, Subscription},
	obs::{self, Outcome, RetrySpan, Stage},
	store::CredentialStore,
};

/// Boxed future returned by [`CredentialExchange::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<Credentials>> + 'a + Send>>;

/// Obtains fresh credentials from an authorization server.
pub trait CredentialExchange
where
	Self: Send + Sync,
{
	/// Exchanges the currently stored credentials (if any) for new ones.
	fn exchange<'a>(&'a self, current: Option<&'a Credentials>) -> ExchangeFuture<'a>;
}

/// Runs refresh cycles in response to `refresh-start` and reports their outcome.
pub struct RefreshOrchestrator {
	channel: EventChannel<RefreshSignal>,
	store: Arc<dyn CredentialStore>,
	exchange: Arc<dyn CredentialExchange>,
	metrics: Arc<RefreshMetrics>,
	singleflight: AsyncMutex<()>,
}
impl RefreshOrchestrator {
	/// Creates an orchestrator that signals on `channel` and writes to `store`.
	pub fn new(
		channel: EventChannel<RefreshSignal>,
		store: Arc<dyn CredentialStore>,
		exchange: Arc<dyn CredentialExchange>,
	) -> Self {
		Self {
			channel,
			store,
			exchange,
			metrics: Default::default(),
			singleflight: AsyncMutex::new(()),
		}
	}

	/// Counters describing past cycles.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Shared handle to the counters, usable after [`spawn`](Self::spawn) consumed `self`.
	pub fn metrics_handle(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Runs one refresh cycle and emits its terminal signal.
	///
	/// Concurrent calls run one after another. The terminal signal is emitted only after the
	/// store accepted the new credentials, so replays triggered by `refresh-complete` read them.
	pub async fn refresh_once(&self) -> Result<Credentials> {
		let span = RetrySpan::new(Stage::Orchestrator, "refresh_once");

		obs::record_outcome(Stage::Orchestrator, Outcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.singleflight.lock().await;

				self.metrics.record_attempt();
				self.exchange_and_persist().await
			})
			.await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_outcome(Stage::Orchestrator, Outcome::Success);
				self.emit(RefreshSignal::Complete);
			},
			Err(e) => {
				self.metrics.record_failure();
				obs::record_outcome(Stage::Orchestrator, Outcome::Failure);
				self.emit(RefreshSignal::Error(RefreshFailure::orchestrator(e.to_string())));
			},
		}

		result
	}

	/// Subscribes to `refresh-start` and runs cycles on a Tokio task until the returned handle
	/// is shut down.
	///
	/// Must be called from within a Tokio runtime.
	pub fn spawn(self) -> OrchestratorHandle {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let subscription = self.channel.subscribe(SignalKind::Start, move |_| {
			let _ = tx.send(());
		});
		let metrics = self.metrics.clone();
		let task = tokio::spawn(async move {
			while rx.recv().await.is_some() {
				let mut coalesced = 0;

				// Every caller behind these starts waits for the next terminal signal.
				while rx.try_recv().is_ok() {
					coalesced += 1;
				}

				self.metrics.record_starts(1 + coalesced);
				self.metrics.record_coalesced(coalesced);

				let _ = self.refresh_once().await;
			}
		});

		OrchestratorHandle { subscription, task, metrics }
	}

	async fn exchange_and_persist(&self) -> Result<Credentials> {
		let current = self.store.load().await?;
		let fresh = self.exchange.exchange(current.as_ref()).await?;

		self.store.save(fresh.clone()).await?;

		Ok(fresh)
	}

	fn emit(&self, signal: RefreshSignal) {
		let listeners = self.channel.emit(signal.clone());

		obs::signal_emitted(&signal, listeners);
	}
}
impl Debug for RefreshOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshOrchestrator")
			.field("channel", &self.channel)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

/// Handle to a spawned [`RefreshOrchestrator`].
///
/// Dropping the handle stops the orchestrator from receiving new `refresh-start` signals; the
/// task exits after finishing the cycle in flight.
#[derive(Debug)]
pub struct OrchestratorHandle {
	subscription: Subscription,
	task: JoinHandle<()>,
	metrics: Arc<RefreshMetrics>,
}
impl OrchestratorHandle {
	/// Counters of the spawned orchestrator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` once the background task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Stops listening and waits for the cycle in flight, if any, to finish.
	pub async fn shutdown(mut self) {
		self.subscription.unsubscribe();

		let _ = self.task.await;
	}

	/// Stops listening and aborts the background task immediately.
	pub fn abort(mut self) {
		self.subscription.unsubscribe();
		self.task.abort();
	}
}
