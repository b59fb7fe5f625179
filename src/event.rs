//! Publish/subscribe channel keyed by event kind.
//!
//! [`EventChannel`] is a cheap, cloneable handle over a shared listener registry. It is meant to
//! be created once and injected into every component that signals or observes refresh cycles,
//! rather than living in a global. Emission is synchronous: [`EventChannel::emit`] snapshots the
//! listeners registered for the event's kind and invokes them in registration order, so a
//! listener added while an emission is running never sees that emission.

pub mod signal;

pub use signal::*;

// std
use std::{
	sync::Weak,
	task::{Context, Poll},
};
// crates.io
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

/// Payload type that can travel through an [`EventChannel`].
pub trait Event
where
	Self: 'static + Clone + Send + Sync,
{
	/// Name-like key listeners subscribe to.
	type Kind: 'static + Copy + Debug + Eq + Hash + Send + Sync;

	/// Returns the kind this event is dispatched under.
	fn kind(&self) -> Self::Kind;
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E>
where
	E: Event,
{
	next_id: u64,
	listeners: HashMap<E::Kind, Vec<(u64, Listener<E>)>>,
}
impl<E> Default for Registry<E>
where
	E: Event,
{
	fn default() -> Self {
		Self { next_id: 0, listeners: HashMap::new() }
	}
}

/// Shared, injectable publish/subscribe channel.
pub struct EventChannel<E>
where
	E: Event,
{
	registry: Arc<Mutex<Registry<E>>>,
}
impl<E> EventChannel<E>
where
	E: Event,
{
	/// Creates a channel with no listeners.
	pub fn new() -> Self {
		Self { registry: Default::default() }
	}

	/// Notifies every listener currently registered for `event.kind()`.
	///
	/// Returns the number of listeners invoked.
	pub fn emit(&self, event: E) -> usize {
		let listeners = {
			let registry = self.registry.lock();

			registry
				.listeners
				.get(&event.kind())
				.map(|entries| entries.iter().map(|(_, listener)| listener.clone()).collect())
				.unwrap_or_else(Vec::new)
		};

		for listener in &listeners {
			listener(&event);
		}

		listeners.len()
	}

	/// Registers `listener` for `kind`; the listener stays registered until the returned
	/// [`Subscription`] is dropped or unsubscribed.
	pub fn subscribe<F>(&self, kind: E::Kind, listener: F) -> Subscription
	where
		F: 'static + Fn(&E) + Send + Sync,
	{
		let id = {
			let mut registry = self.registry.lock();
			let id = registry.next_id;

			registry.next_id += 1;
			registry.listeners.entry(kind).or_default().push((id, Arc::new(listener)));

			id
		};
		let registry = Arc::downgrade(&self.registry);

		Subscription::new(move || Self::detach(&registry, kind, id))
	}

	/// Registers a one-shot listener on every kind in `kinds` and returns a future resolving to
	/// the first event accepted by `accept`.
	///
	/// The listener is live as soon as this returns, so it observes emissions that happen before
	/// the waiter is first polled. All of its registrations are removed once an event is
	/// delivered or the waiter is dropped.
	pub fn once<P>(&self, kinds: &[E::Kind], accept: P) -> EventWaiter<E>
	where
		P: 'static + Fn(&E) -> bool + Send + Sync,
	{
		let (tx, rx) = oneshot::channel();
		let slot = Arc::new(Mutex::new(Some(tx)));
		let accept = Arc::new(accept);
		let subscriptions = kinds
			.iter()
			.map(|kind| {
				let slot = slot.clone();
				let accept = accept.clone();

				self.subscribe(*kind, move |event| {
					if !accept(event) {
						return;
					}
					if let Some(tx) = slot.lock().take() {
						let _ = tx.send(event.clone());
					}
				})
			})
			.collect();

		EventWaiter { rx, subscriptions }
	}

	/// Number of listeners registered for `kind`.
	pub fn listener_count(&self, kind: E::Kind) -> usize {
		self.registry.lock().listeners.get(&kind).map_or(0, Vec::len)
	}

	fn detach(registry: &Weak<Mutex<Registry<E>>>, kind: E::Kind, id: u64) {
		let Some(registry) = registry.upgrade() else {
			return;
		};
		let mut registry = registry.lock();

		if let Some(entries) = registry.listeners.get_mut(&kind) {
			entries.retain(|(entry_id, _)| *entry_id != id);

			if entries.is_empty() {
				registry.listeners.remove(&kind);
			}
		}
	}
}
impl<E> Clone for EventChannel<E>
where
	E: Event,
{
	fn clone(&self) -> Self {
		Self { registry: self.registry.clone() }
	}
}
impl<E> Default for EventChannel<E>
where
	E: Event,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<E> Debug for EventChannel<E>
where
	E: Event,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let registry = self.registry.lock();
		let kinds: Vec<_> =
			registry.listeners.iter().map(|(kind, entries)| (*kind, entries.len())).collect();

		f.debug_struct("EventChannel").field("listeners", &kinds).finish()
	}
}

/// Registration handle returned by [`EventChannel::subscribe`].
///
/// Dropping the handle deregisters the listener.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
	detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}
impl Subscription {
	fn new(detach: impl 'static + FnOnce() + Send + Sync) -> Self {
		Self { detach: Some(Box::new(detach)) }
	}

	/// Deregisters the listener. Calling this more than once is a no-op.
	pub fn unsubscribe(&mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}

	/// Returns `true` until the listener has been deregistered.
	pub fn is_active(&self) -> bool {
		self.detach.is_some()
	}
}
impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Subscription").field("active", &self.is_active()).finish()
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

/// Future returned by [`EventChannel::once`].
///
/// Resolves to `None` only when the channel's registry is gone.
pub struct EventWaiter<E> {
	rx: oneshot::Receiver<E>,
	subscriptions: Vec<Subscription>,
}
impl<E> EventWaiter<E> {
	/// Removes the underlying registrations without waiting.
	pub fn cancel(&mut self) {
		self.subscriptions.clear();
	}
}
impl<E> Future for EventWaiter<E> {
	type Output = Option<E>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.subscriptions.clear();

				Poll::Ready(result.ok())
			},
			Poll::Pending => Poll::Pending,
		}
	}
}
impl<E> Debug for EventWaiter<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EventWaiter").field("registrations", &self.subscriptions.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	fn counting_listener(counter: Arc<AtomicUsize>) -> impl Fn(&RefreshSignal) + Send + Sync {
		move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[test]
	fn unsubscribed_listener_stops_receiving() {
		let channel = EventChannel::<RefreshSignal>::new();
		let deliveries = Arc::new(AtomicUsize::new(0));
		let mut subscription =
			channel.subscribe(SignalKind::Start, counting_listener(deliveries.clone()));

		channel.emit(RefreshSignal::Start);
		channel.emit(RefreshSignal::Start);
		subscription.unsubscribe();
		subscription.unsubscribe();
		channel.emit(RefreshSignal::Start);

		assert_eq!(deliveries.load(Ordering::SeqCst), 2);
		assert!(!subscription.is_active());
		assert_eq!(channel.listener_count(SignalKind::Start), 0);
	}

	#[test]
	fn listeners_run_in_registration_order() {
		let channel = EventChannel::<RefreshSignal>::new();
		let order = Arc::new(Mutex::new(Vec::new()));
		let _subscriptions: Vec<_> = (0..3)
			.map(|id| {
				let order = order.clone();

				channel.subscribe(SignalKind::Complete, move |_| order.lock().push(id))
			})
			.collect();

		assert_eq!(channel.emit(RefreshSignal::Complete), 3);
		assert_eq!(*order.lock(), vec![0, 1, 2]);
	}

	#[test]
	fn emission_only_reaches_matching_kind() {
		let channel = EventChannel::<RefreshSignal>::new();
		let starts = Arc::new(AtomicUsize::new(0));
		let _subscription = channel.subscribe(SignalKind::Start, counting_listener(starts.clone()));

		assert_eq!(channel.emit(RefreshSignal::Complete), 0);
		assert_eq!(starts.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn listener_added_during_emission_misses_it() {
		let channel = EventChannel::<RefreshSignal>::new();
		let late = Arc::new(AtomicUsize::new(0));
		let late_subscriptions = Arc::new(Mutex::new(Vec::new()));
		let _subscription = {
			let channel = channel.clone();
			let late = late.clone();
			let late_subscriptions = late_subscriptions.clone();

			channel.clone().subscribe(SignalKind::Start, move |_| {
				let subscription =
					channel.subscribe(SignalKind::Start, counting_listener(late.clone()));

				late_subscriptions.lock().push(subscription);
			})
		};

		channel.emit(RefreshSignal::Start);

		assert_eq!(late.load(Ordering::SeqCst), 0);

		channel.emit(RefreshSignal::Start);

		assert_eq!(late.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn once_delivers_first_accepted_event_and_cleans_up() {
		let channel = EventChannel::<RefreshSignal>::new();
		let waiter = channel.once(&[SignalKind::Complete, SignalKind::Error], |signal| {
			signal.is_terminal()
		});

		assert_eq!(channel.listener_count(SignalKind::Complete), 1);

		channel.emit(RefreshSignal::Error(RefreshFailure::retry_exhausted("GET /a", 3)));
		channel.emit(RefreshSignal::Complete);

		let received = waiter.await.expect("Waiter should observe the completion signal.");

		assert_eq!(received, RefreshSignal::Complete);
		assert_eq!(channel.listener_count(SignalKind::Complete), 0);
		assert_eq!(channel.listener_count(SignalKind::Error), 0);
	}

	#[test]
	fn dropped_waiter_deregisters() {
		let channel = EventChannel::<RefreshSignal>::new();
		let waiter = channel.once(&[SignalKind::Complete], |_| true);

		assert_eq!(channel.listener_count(SignalKind::Complete), 1);

		drop(waiter);

		assert_eq!(channel.listener_count(SignalKind::Complete), 0);
	}

	#[test]
	fn subscription_outliving_channel_is_harmless() {
		let channel = EventChannel::<RefreshSignal>::new();
		let mut subscription = channel.subscribe(SignalKind::Start, |_| {});

		drop(channel);
		subscription.unsubscribe();

		assert!(!subscription.is_active());
	}
}
