//! Single-flight token refresh for authenticated HTTP clients: one refresh cycle per 401 storm,
//! a FIFO refresh gate, typed refresh signals, and bounded transparent replays.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod event;
pub mod gate;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod retry;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credentials, TokenSecret},
		client::AuthenticatedClient,
		event::{EventChannel, RefreshSignal, SignalKind},
		http::ReqwestHttpClient,
		refresh::{RefreshTokenExchange, TokenEndpointConfig},
		retry::RetryPolicy,
		store::{CredentialStore, MemoryStore},
	};

	/// Authenticated client alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = AuthenticatedClient<ReqwestHttpClient>;

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a [`ReqwestHttpClient`] on top of [`test_reqwest_client`].
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_client(test_reqwest_client())
	}

	/// Builds a refresh-token exchange that talks to the provided mock token endpoint.
	pub fn test_refresh_exchange(config: TokenEndpointConfig) -> RefreshTokenExchange {
		RefreshTokenExchange::with_client(config, test_reqwest_client())
			.expect("Test token endpoint config should validate.")
	}

	/// Seeds an in-memory store with an access/refresh token pair.
	pub async fn seeded_memory_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
		let store = Arc::new(MemoryStore::default());

		store
			.save(
				Credentials::new(TokenSecret::new(access))
					.with_refresh_token(TokenSecret::new(refresh)),
			)
			.await
			.expect("Failed to seed credentials into the memory store.");

		store
	}

	/// Constructs an [`AuthenticatedClient`] backed by the reqwest transport, the provided store,
	/// and a fresh event channel.
	pub fn build_reqwest_test_client(
		store: Arc<MemoryStore>,
		policy: RetryPolicy,
	) -> (ReqwestTestClient, EventChannel<RefreshSignal>) {
		let channel = EventChannel::default();
		let store: Arc<dyn CredentialStore> = store;
		let client = AuthenticatedClient::new(test_reqwest_http_client(), channel.clone())
			.with_policy(policy)
			.with_credential_store(store);

		(client, channel)
	}

	/// Counts every emission of `kind` until the returned subscription is dropped.
	pub fn count_signals(
		channel: &EventChannel<RefreshSignal>,
		kind: SignalKind,
	) -> (Arc<std::sync::atomic::AtomicUsize>, crate::event::Subscription) {
		let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
		let sink = counter.clone();
		let subscription = channel.subscribe(kind, move |_| {
			sink.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
		});

		(counter, subscription)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
