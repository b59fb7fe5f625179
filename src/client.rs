//! HTTP client with bearer injection and the retry interceptor wired in.

// self
use crate::{
	_prelude::*,
	error::RequestFailure,
	event::{EventChannel, RefreshSignal},
	gate::RefreshGate,
	http::{HttpClient, HttpFuture, HttpResponse, RequestDescriptor},
	retry::{RetryInterceptor, RetryMetrics, RetryPolicy},
	store::CredentialStore,
};

/// Sets `Authorization: Bearer <access>` from the store on every dispatch.
///
/// The caller's descriptor stays untouched so a replay picks up whatever the orchestrator
/// persisted in the meantime.
struct BearerTransport<C> {
	inner: C,
	store: Option<Arc<dyn CredentialStore>>,
}
impl<C> HttpClient for BearerTransport<C>
where
	C: HttpClient,
{
	fn request<'a>(&'a self, request: &'a RequestDescriptor) -> HttpFuture<'a> {
		Box::pin(async move {
			let credentials = match &self.store {
				Some(store) => store.load().await?,
				None => None,
			};
			let Some(credentials) = credentials else {
				return self.inner.request(request).await;
			};
			let mut authorized = request.clone();

			authorized.set_header("authorization", credentials.bearer());

			self.inner.request(&authorized).await
		})
	}
}

/// Authenticated HTTP client that refreshes credentials at most once per burst of
/// authorization failures.
///
/// Each client owns its own [`RefreshGate`]; clients that share an [`EventChannel`] still run
/// separate refresh cycles.
pub struct AuthenticatedClient<C>
where
	C: HttpClient,
{
	transport: BearerTransport<C>,
	interceptor: RetryInterceptor,
}
impl<C> AuthenticatedClient<C>
where
	C: HttpClient,
{
	/// Wraps `http`, signaling refresh cycles on `channel`.
	pub fn new(http: C, channel: EventChannel<RefreshSignal>) -> Self {
		Self {
			transport: BearerTransport { inner: http, store: None },
			interceptor: RetryInterceptor::new(Arc::new(RefreshGate::new()), channel),
		}
	}

	/// Replaces the retry policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.interceptor = self.interceptor.with_policy(policy);

		self
	}

	/// Reads the bearer token from `store` before every dispatch, replays included.
	pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.transport.store = Some(store);

		self
	}

	/// Dispatches `request`, refreshing credentials and replaying on authorization failures.
	pub async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse, RequestFailure> {
		self.interceptor.send(&self.transport, request).await
	}

	/// Underlying transport.
	pub fn inner(&self) -> &C {
		&self.transport.inner
	}

	/// Gate serializing this client's refresh cycles.
	pub fn gate(&self) -> &Arc<RefreshGate> {
		self.interceptor.gate()
	}

	/// Channel refresh signals travel on.
	pub fn channel(&self) -> &EventChannel<RefreshSignal> {
		self.interceptor.channel()
	}

	/// Active retry policy.
	pub fn policy(&self) -> &RetryPolicy {
		self.interceptor.policy()
	}

	/// Interceptor counters.
	pub fn metrics(&self) -> &RetryMetrics {
		self.interceptor.metrics()
	}
}
impl<C> Debug for AuthenticatedClient<C>
where
	C: HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("interceptor", &self.interceptor)
			.field("credential_store", &self.transport.store.is_some())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::{Credentials, TokenSecret},
		store::MemoryStore,
	};

	/// Records the `authorization` header of every dispatch and answers 200.
	#[derive(Default)]
	struct HeaderEcho {
		seen: Mutex<Vec<Option<String>>>,
		calls: AtomicUsize,
	}
	impl HttpClient for HeaderEcho {
		fn request<'a>(&'a self, request: &'a RequestDescriptor) -> HttpFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.seen.lock().push(request.header("authorization").map(str::to_owned));

			Box::pin(async { Ok(HttpResponse::new(200, "ok")) })
		}
	}

	fn request() -> RequestDescriptor {
		RequestDescriptor::get(
			Url::parse("https://api.example.com/me").expect("Fixture URL should parse."),
		)
	}

	#[tokio::test]
	async fn bearer_is_read_from_store_per_dispatch() {
		let store = Arc::new(MemoryStore::with_credentials(Credentials::new(TokenSecret::new(
			"first",
		))));
		let client = AuthenticatedClient::new(HeaderEcho::default(), EventChannel::new())
			.with_credential_store(store.clone());
		let caller_request = request();

		client.send(caller_request.clone()).await.expect("Dispatch should succeed.");
		store.save(Credentials::new(TokenSecret::new("second"))).await.expect("Save should work.");
		client.send(caller_request.clone()).await.expect("Dispatch should succeed.");

		assert_eq!(
			*client.inner().seen.lock(),
			vec![Some("Bearer first".to_owned()), Some("Bearer second".to_owned())]
		);
		assert_eq!(caller_request.header("authorization"), None);
	}

	#[tokio::test]
	async fn clients_without_store_send_requests_unchanged() {
		let client = AuthenticatedClient::new(HeaderEcho::default(), EventChannel::new());
		let response = client.send(request()).await.expect("Dispatch should succeed.");

		assert_eq!(response.status, 200);
		assert_eq!(*client.inner().seen.lock(), vec![None]);
		assert_eq!(client.inner().calls.load(Ordering::SeqCst), 1);
		assert_eq!(client.metrics().intercepted(), 0);
		assert!(!client.gate().is_locked());
	}
}
