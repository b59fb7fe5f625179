//! FIFO mutual-exclusion gate that serializes refresh cycles for one HTTP client.
//!
//! The gate is a tiny async lock with two kinds of waiters. Acquirers queue in arrival order
//! and receive ownership directly from the releasing holder, so a burst of contenders cannot
//! starve the oldest one. Unlock waiters only want to know that the current holder has
//! finished; every release wakes all of them without handing them ownership.

// crates.io
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

#[derive(Debug, Default)]
struct GateState {
	held: bool,
	acquirers: VecDeque<oneshot::Sender<()>>,
	unlock_waiters: Vec<oneshot::Sender<()>>,
}

/// Single-holder gate with FIFO handoff and non-acquiring unlock waits.
#[derive(Debug, Default)]
pub struct RefreshGate {
	state: Mutex<GateState>,
}
impl RefreshGate {
	/// Creates an unlocked gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while some caller holds the gate.
	pub fn is_locked(&self) -> bool {
		self.state.lock().held
	}

	/// Number of callers currently queued in [`acquire`](Self::acquire).
	pub fn queued_acquirers(&self) -> usize {
		self.state.lock().acquirers.iter().filter(|tx| !tx.is_closed()).count()
	}

	/// Acquires the gate without waiting, returning `None` when it is already held.
	pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
		let mut state = self.state.lock();

		if state.held {
			return None;
		}

		state.held = true;

		Some(GatePermit { gate: self })
	}

	/// Acquires the gate, waiting behind earlier acquirers when it is held.
	///
	/// Resolves on the first poll when the gate is free. Dropping the returned future while it
	/// waits gives up the queue slot; ownership handed to an abandoned waiter flows back to the
	/// gate.
	pub async fn acquire(&self) -> GatePermit<'_> {
		loop {
			let rx = {
				let mut state = self.state.lock();

				if !state.held {
					state.held = true;

					return GatePermit { gate: self };
				}

				let (tx, rx) = oneshot::channel();

				state.acquirers.push_back(tx);

				rx
			};

			if (PendingAcquire { gate: self, rx: Some(rx) }).granted().await {
				return GatePermit { gate: self };
			}
		}
	}

	/// Waits until the current holder releases the gate, without acquiring it.
	///
	/// Returns immediately when the gate is free.
	pub async fn wait_for_unlock(&self) {
		let rx = {
			let mut state = self.state.lock();

			if !state.held {
				return;
			}

			let (tx, rx) = oneshot::channel();

			state.unlock_waiters.push(tx);

			rx
		};

		let _ = rx.await;
	}

	fn release(&self) {
		let unlock_waiters = {
			let mut state = self.state.lock();
			let unlock_waiters = std::mem::take(&mut state.unlock_waiters);

			loop {
				match state.acquirers.pop_front() {
					// Ownership moves to the next live acquirer; `held` stays set.
					Some(tx) =>
						if tx.send(()).is_ok() {
							break;
						},
					None => {
						state.held = false;

						break;
					},
				}
			}

			unlock_waiters
		};

		for waiter in unlock_waiters {
			let _ = waiter.send(());
		}
	}
}

/// Ownership of a [`RefreshGate`]; releases the gate exactly once, on drop.
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct GatePermit<'a> {
	gate: &'a RefreshGate,
}
impl GatePermit<'_> {
	/// Releases the gate explicitly.
	pub fn release(self) {
		drop(self);
	}
}
impl Debug for GatePermit<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GatePermit(..)")
	}
}
impl Drop for GatePermit<'_> {
	fn drop(&mut self) {
		self.gate.release();
	}
}

struct PendingAcquire<'a> {
	gate: &'a RefreshGate,
	rx: Option<oneshot::Receiver<()>>,
}
impl PendingAcquire<'_> {
	async fn granted(mut self) -> bool {
		let granted = match self.rx.as_mut() {
			Some(rx) => rx.await.is_ok(),
			None => false,
		};

		self.rx = None;

		granted
	}
}
impl Drop for PendingAcquire<'_> {
	fn drop(&mut self) {
		if let Some(mut rx) = self.rx.take() {
			rx.close();

			if rx.try_recv().is_ok() {
				self.gate.release();
			}
		}
	}
}
